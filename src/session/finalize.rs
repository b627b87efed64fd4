//! Selection finalizer
//!
//! Turns a finished selection into the value handed to the host: the
//! image-space rect, the screen-space rect and a snapshot of the canvas.

use serde::Serialize;

use crate::capture::snapshot;
use crate::domain::{Rect, ViewTransform};
use crate::render::overlay::{self, OverlayStyle};
use crate::render::{PixelRatio, Surface};

/// A completed selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionOutput {
    /// Original image pixel coordinates
    pub original_rect: Rect,
    /// Canvas logical pixels
    pub screen_rect: Rect,
    /// PNG data URL of the canvas; empty when encoding failed
    #[serde(skip)]
    pub snapshot: String,
}

/// Package a screen-space selection, deriving the image-space rect
pub fn from_screen(view: &ViewTransform, screen_rect: Rect, snapshot: String) -> SelectionOutput {
    SelectionOutput {
        original_rect: view.rect_to_image(screen_rect),
        screen_rect,
        snapshot,
    }
}

/// Package an image-space selection, deriving the screen-space rect
pub fn from_original(view: &ViewTransform, original_rect: Rect, snapshot: String) -> SelectionOutput {
    SelectionOutput {
        original_rect,
        screen_rect: view.rect_to_screen(original_rect),
        snapshot,
    }
}

/// Stroke the selection outline over the current frame and capture the canvas
///
/// Never fails: a missing canvas or an encoding error is logged and yields an
/// empty snapshot so the selection is still delivered.
pub fn capture(surface: &mut Surface, screen_rect: Rect, style: &OverlayStyle) -> String {
    let transform = surface.ratio().transform();
    let Some(pixmap) = surface.pixmap_mut() else {
        log::warn!("No canvas to snapshot, emitting selection without image");
        return String::new();
    };

    overlay::stroke_rect(
        pixmap,
        screen_rect,
        style.accent,
        style.stroke_width,
        style.dash.clone(),
        transform,
    );

    match snapshot::to_data_url(pixmap) {
        Ok(url) => url,
        Err(e) => {
            log::error!("Failed to encode selection snapshot: {:#}", e);
            String::new()
        }
    }
}
