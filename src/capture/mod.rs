//! Image input and output module
//!
//! This module consolidates:
//! - Decoded image type backing the viewport (image.rs)
//! - Asynchronous loading from paths, bytes and data URLs (source.rs)
//! - Canvas snapshots encoded as PNG data URLs (snapshot.rs)

pub mod image;
pub mod snapshot;
pub mod source;

pub use self::image::LoadedImage;
pub use source::{ImageSource, load};
