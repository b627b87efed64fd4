//! Viewport rendering with tiny-skia
//!
//! This module contains:
//! - The canvas surface and its logical-to-physical pixel ratio
//! - Frame composition (image, selection overlay, labels, dimming)
//! - Label text rasterization
//! - The confirmation pulse timing

pub mod animation;
pub mod geometry;
pub mod overlay;
pub mod surface;
pub mod text;

pub use animation::{AnimationStep, ConfirmAnimation};
pub use overlay::{Frame, Overlay, OverlayStyle, render_frame};
pub use surface::{DevicePixelRatio, PixelRatio, Surface};
pub use text::LabelFont;
