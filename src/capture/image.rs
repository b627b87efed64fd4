//! Decoded image type displayed by the viewport

use anyhow::anyhow;
use image::RgbaImage;
use tiny_skia::{IntSize, Pixmap};

use crate::domain::Size;

/// A decoded image with both raw RGBA data and a premultiplied draw source
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub rgba: RgbaImage,
    pub pixmap: Pixmap,
}

impl LoadedImage {
    /// Create a LoadedImage from straight-alpha RGBA pixels
    pub fn new(rgba: RgbaImage) -> anyhow::Result<Self> {
        let size = IntSize::from_wh(rgba.width(), rgba.height())
            .ok_or_else(|| anyhow!("image has zero width or height"))?;

        let mut data = rgba.as_raw().clone();
        premultiply(&mut data);
        let pixmap =
            Pixmap::from_vec(data, size).ok_or_else(|| anyhow!("image buffer had incorrect size"))?;

        log::debug!("LoadedImage decoded: {}x{} pixels", rgba.width(), rgba.height());
        Ok(Self { rgba, pixmap })
    }

    /// Get the width of the image
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    /// Get the height of the image
    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    /// Natural size in image pixels
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width()), f64::from(self.height()))
    }
}

/// Convert straight RGBA8 to premultiplied RGBA8 in place
fn premultiply(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}
