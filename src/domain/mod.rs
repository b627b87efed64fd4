//! Pure domain types with minimal dependencies
//!
//! This module contains the coordinate math and selection types used
//! throughout the crate. Nothing here knows about pixmaps, clocks or I/O.

pub mod geometry;
pub mod selection;
pub mod transform;

pub use geometry::*;
pub use selection::*;
pub use transform::*;
