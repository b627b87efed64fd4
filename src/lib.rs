//! Interactive image viewport: pan/zoom, region selection and snapshots
//!
//! The crate is organised bottom-up:
//! - `domain`: coordinate math and selection types
//! - `render`: tiny-skia drawing onto a DPR-aware surface
//! - `capture`: image loading and PNG snapshots
//! - `session`: the viewport component and its input state machine
//! - `enhance`: the contract for the external enhancement backend
//! - `config`: persisted viewer settings

pub mod capture;
pub mod config;
pub mod domain;
pub mod enhance;
pub mod render;
pub mod session;

pub use config::ViewerConfig;
pub use session::{ImageViewport, InputEvent, SelectionOutput};
