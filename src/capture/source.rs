//! Image sources and asynchronous decoding

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::image::LoadedImage;
use super::snapshot::decode_data_url;

/// A resolvable reference to a raster image
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
    /// `data:<mime>;base64,<payload>`
    DataUrl(String),
}

impl ImageSource {
    /// Interpret a user-supplied string as a data URL or a filesystem path
    pub fn parse(s: &str) -> Self {
        if s.starts_with("data:") {
            ImageSource::DataUrl(s.to_string())
        } else {
            ImageSource::Path(PathBuf::from(s))
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes.into())
    }
}

/// Decode a source on the current thread
pub fn decode(source: &ImageSource) -> Result<LoadedImage> {
    let decoded = match source {
        ImageSource::Path(path) => image::ImageReader::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?
            .with_guessed_format()?
            .decode()
            .with_context(|| format!("Failed to decode image: {}", path.display()))?,
        ImageSource::Bytes(bytes) => {
            image::load_from_memory(bytes).context("Failed to decode image bytes")?
        }
        ImageSource::DataUrl(url) => {
            let (mime, bytes) = decode_data_url(url)?;
            image::load_from_memory(&bytes)
                .with_context(|| format!("Failed to decode {mime} data URL"))?
        }
    };
    LoadedImage::new(decoded.to_rgba8())
}

/// Decode a source on the blocking pool
pub async fn load(source: ImageSource) -> Result<LoadedImage> {
    let image = tokio::task::spawn_blocking(move || decode(&source)).await??;
    log::info!("Image loaded: {}x{}", image.width(), image.height());
    Ok(image)
}
