//! Overlay label text using ab_glyph
//!
//! Glyphs are rasterized straight into the surface pixmap with
//! source-over blending; there is no shaping beyond pair kerning.

use std::path::Path;

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use font_kit::family_name::FamilyName;
use font_kit::properties::Properties;
use font_kit::source::SystemSource;
use tiny_skia::{Pixmap, PremultipliedColorU8};

use super::geometry::label;

/// DejaVu Sans Mono, shipped so labels render on hosts without system fonts
const EMBEDDED_FONT: &[u8] = include_bytes!("../../fonts/DejaVuSansMono.ttf");

/// A loaded font at a fixed logical size
#[derive(Clone)]
pub struct LabelFont {
    font: FontArc,
    size: f32,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont").field("size", &self.size).finish()
    }
}

impl LabelFont {
    /// Load a TrueType/OpenType font file
    pub fn load(path: &Path, size: f32) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        Self::from_bytes(data, size).with_context(|| format!("Invalid font {}", path.display()))
    }

    /// Pick the label font: the configured file, then the system monospace
    /// family, then the embedded face
    pub fn resolve(path: Option<&Path>, size: f32) -> Option<Self> {
        if let Some(path) = path {
            match Self::load(path, size) {
                Ok(font) => return Some(font),
                Err(e) => log::warn!("Falling back to the default label font: {:#}", e),
            }
        }
        Self::system_monospace(size).or_else(|| {
            Self::embedded(size)
                .map_err(|e| log::warn!("Labels will be drawn without text: {:#}", e))
                .ok()
        })
    }

    /// Best system match for the generic monospace family
    pub fn system_monospace(size: f32) -> Option<Self> {
        let handle = SystemSource::new()
            .select_best_match(&[FamilyName::Monospace], &Properties::new())
            .ok()?;
        let data = handle.load().ok()?.copy_font_data()?;
        let font = Self::from_bytes((*data).clone(), size).ok()?;
        log::debug!("Using system monospace font for labels");
        Some(font)
    }

    pub fn embedded(size: f32) -> Result<Self> {
        let font = FontArc::try_from_slice(EMBEDDED_FONT).map_err(|e| anyhow!("{e}"))?;
        Ok(Self { font, size })
    }

    pub fn from_bytes(data: Vec<u8>, size: f32) -> Result<Self> {
        let font = FontArc::try_from_vec(data).map_err(|e| anyhow!("{e}"))?;
        Ok(Self { font, size })
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Advance width of `text` in logical pixels
    pub fn measure(&self, text: &str) -> f32 {
        let scaled = self.font.as_scaled(self.size);
        let mut width = 0.0;
        let mut last: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = last {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            last = Some(id);
        }
        width
    }

    /// Draw `text` with its baseline starting at logical (x, baseline)
    ///
    /// `ratio` is the device pixel ratio of the pixmap; glyphs are rasterized
    /// at physical size so labels stay crisp on dense displays.
    pub fn draw(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        x: f32,
        baseline: f32,
        color: [u8; 4],
        ratio: f32,
    ) {
        let px = self.size * ratio;
        let scaled = self.font.as_scaled(px);
        let mut caret = x * ratio;
        let baseline = baseline * ratio;
        let mut last: Option<GlyphId> = None;

        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = last {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(px, point(caret, baseline));
            caret += scaled.h_advance(id);
            last = Some(id);

            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            let (ox, oy) = (bounds.min.x as i32, bounds.min.y as i32);
            outlined.draw(|gx, gy, coverage| {
                blend_pixel(pixmap, ox + gx as i32, oy + gy as i32, color, coverage);
            });
        }
    }
}

/// Label width estimate when no font is available
pub fn approximate_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * label::FALLBACK_ADVANCE
}

/// Source-over blend of a straight-alpha color with partial coverage
fn blend_pixel(pixmap: &mut Pixmap, x: i32, y: i32, color: [u8; 4], coverage: f32) {
    if x < 0 || y < 0 || x >= pixmap.width() as i32 || y >= pixmap.height() as i32 {
        return;
    }
    let alpha = f32::from(color[3]) / 255.0 * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let idx = y as usize * pixmap.width() as usize + x as usize;
    let pixels = pixmap.pixels_mut();
    let dst = pixels[idx];
    let inv = 1.0 - alpha;

    let out_a = (alpha * 255.0 + f32::from(dst.alpha()) * inv).round().min(255.0);
    let channel = |src: u8, dst: u8| {
        (f32::from(src) * alpha + f32::from(dst) * inv)
            .round()
            .min(out_a)
    };
    let r = channel(color[0], dst.red());
    let g = channel(color[1], dst.green());
    let b = channel(color[2], dst.blue());

    if let Some(px) = PremultipliedColorU8::from_rgba(r as u8, g as u8, b as u8, out_a as u8) {
        pixels[idx] = px;
    }
}
