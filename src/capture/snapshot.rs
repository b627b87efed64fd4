//! Canvas snapshots as self-contained PNG data URLs

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::RgbaImage;
use tiny_skia::Pixmap;

use crate::domain::Rect;

/// MIME type of every snapshot this crate produces
pub const PNG_MIME: &str = "image/png";

/// Copy a premultiplied pixmap into a straight-alpha RGBA image
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}

fn write_png<W: io::Write>(w: W, image: &RgbaImage) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())
}

/// Encode the full pixmap as PNG bytes
pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_png(&mut buffer, &pixmap_to_rgba(pixmap))?;
    Ok(buffer)
}

/// Capture the full pixmap as a `data:image/png;base64,...` URL
pub fn to_data_url(pixmap: &Pixmap) -> Result<String> {
    Ok(encode_data_url(PNG_MIME, &encode_png(pixmap)?))
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// Split a base64 data URL into its MIME type and decoded bytes
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data URL has no payload"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("data URL is not base64 encoded"))?;
    let bytes = BASE64
        .decode(payload.trim())
        .context("data URL payload is not valid base64")?;
    Ok((mime.to_string(), bytes))
}

/// Write the decoded payload of a data URL to `path`
pub fn save_data_url(url: &str, path: &Path) -> Result<()> {
    let (_, bytes) = decode_data_url(url)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write image: {}", path.display()))
}

/// Timestamped `<prefix>_<date>_<time>.png` path inside `dir`
pub fn output_path(dir: &Path, prefix: &str) -> PathBuf {
    let name = chrono::Local::now()
        .format(&format!("{prefix}_%Y-%m-%d_%H-%M-%S%.3f.png"))
        .to_string();
    dir.join(name)
}

/// Cut an image-space rect out of `image` and encode it as a PNG data URL
///
/// The rect is expanded to whole pixels and clipped to the image.
pub fn crop_to_data_url(image: &RgbaImage, rect: Rect) -> Result<String> {
    let (w, h) = (f64::from(image.width()), f64::from(image.height()));
    let x0 = rect.x.floor().clamp(0.0, w) as u32;
    let y0 = rect.y.floor().clamp(0.0, h) as u32;
    let x1 = rect.right().ceil().clamp(0.0, w) as u32;
    let y1 = rect.bottom().ceil().clamp(0.0, h) as u32;
    if x1 <= x0 || y1 <= y0 {
        bail!("Crop {} lies outside the {}x{} image", rect.label(), w, h);
    }

    let cropped = image::imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
    let mut buffer = Vec::new();
    write_png(&mut buffer, &cropped).context("Failed to encode crop")?;
    Ok(encode_data_url(PNG_MIME, &buffer))
}
