//! Viewport session management
//!
//! This module contains:
//! - Input event types
//! - The viewport component and its input state machine
//! - The selection finalizer
//! - An async driver for the confirmation animation

pub mod driver;
pub mod events;
pub mod finalize;
pub mod viewport;

pub use driver::{FRAME_INTERVAL, drive_animation};
pub use events::{EventStatus, InputEvent, Modifiers, PointerButton};
pub use finalize::SelectionOutput;
pub use viewport::{ImageViewport, LoadTicket, SelectCallback};
