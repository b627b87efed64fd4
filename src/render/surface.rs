//! Canvas backing store and the logical-to-physical pixel conversion
//!
//! Everything outside this module speaks logical pixels. The surface owns a
//! pixmap sized in physical pixels and hands out the transform that maps one
//! to the other, so the viewport math never sees the device pixel ratio.

use tiny_skia::{Pixmap, Transform};

use crate::domain::Size;

/// Conversion from logical (CSS-like) pixels to physical device pixels
pub trait PixelRatio {
    /// Physical pixels per logical pixel
    fn ratio(&self) -> f32;

    fn to_physical(&self, logical: f32) -> f32 {
        logical * self.ratio()
    }

    /// Backing-store dimensions for a logical size, rounded up
    fn physical_size(&self, logical: Size) -> (u32, u32) {
        let r = f64::from(self.ratio());
        let w = (logical.width * r).ceil();
        let h = (logical.height * r).ceil();
        let to_u32 = |v: f64| if v.is_finite() && v > 0.0 { v as u32 } else { 0 };
        (to_u32(w), to_u32(h))
    }

    /// Drawing transform from logical to physical coordinates
    fn transform(&self) -> Transform {
        Transform::from_scale(self.ratio(), self.ratio())
    }
}

/// Device pixel ratio reported by the host display
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DevicePixelRatio(f32);

impl DevicePixelRatio {
    /// Non-positive or non-finite ratios fall back to 1
    pub fn new(ratio: f32) -> Self {
        if ratio.is_finite() && ratio > 0.0 {
            Self(ratio)
        } else {
            Self(1.0)
        }
    }
}

impl Default for DevicePixelRatio {
    fn default() -> Self {
        Self(1.0)
    }
}

impl PixelRatio for DevicePixelRatio {
    fn ratio(&self) -> f32 {
        self.0
    }
}

/// Drawing target for the viewport
#[derive(Debug)]
pub struct Surface {
    logical: Size,
    ratio: DevicePixelRatio,
    pixmap: Option<Pixmap>,
}

impl Surface {
    pub fn new(logical: Size, ratio: DevicePixelRatio) -> Self {
        let mut surface = Self {
            logical: Size::default(),
            ratio,
            pixmap: None,
        };
        surface.resize(logical, ratio);
        surface
    }

    /// Resize the backing store; returns true when anything changed
    ///
    /// Calling it again with the same values is a no-op. A zero logical size
    /// leaves the surface without a pixmap, and every draw becomes a no-op.
    pub fn resize(&mut self, logical: Size, ratio: DevicePixelRatio) -> bool {
        if self.logical == logical && self.ratio == ratio && self.pixmap.is_some() {
            return false;
        }
        let (w, h) = ratio.physical_size(logical);
        let changed = self.logical != logical || self.ratio != ratio;
        self.logical = logical;
        self.ratio = ratio;
        self.pixmap = Pixmap::new(w, h);
        if self.pixmap.is_none() {
            log::debug!("Surface has no drawable area ({}x{})", w, h);
        }
        changed
    }

    /// Canvas size in logical pixels
    pub fn logical_size(&self) -> Size {
        self.logical
    }

    pub fn ratio(&self) -> DevicePixelRatio {
        self.ratio
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    pub fn pixmap_mut(&mut self) -> Option<&mut Pixmap> {
        self.pixmap.as_mut()
    }

    /// Clear the whole content area to transparent
    pub fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
    }
}
