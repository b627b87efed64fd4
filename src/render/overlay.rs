//! Frame composition: image, selection overlay, label and dimming
//!
//! Overlays are given in screen space (logical pixels). The surface's pixel
//! ratio is applied here so callers never deal with physical pixels.

use tiny_skia::{
    FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, StrokeDash,
    Transform,
};

use super::geometry::{dim, label};
use super::surface::{PixelRatio, Surface};
use super::text::{self, LabelFont};
use crate::capture::LoadedImage;
use crate::config::ViewerConfig;
use crate::domain::{Rect, SelectionState, ViewTransform};

/// Label shown on the previous-crop ghost
pub const HISTORY_LABEL: &str = "PREV. CROP";

/// Label text color on the active selection
const ACTIVE_TEXT: [u8; 4] = [255, 255, 255, 255];

/// Resolved drawing parameters
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub accent: [u8; 4],
    pub history: [u8; 4],
    pub stroke_width: f32,
    pub dash: Option<StrokeDash>,
    pub font_size: f32,
}

impl OverlayStyle {
    pub fn from_config(config: &ViewerConfig) -> Self {
        let dash = if config.dash.is_empty() {
            None
        } else {
            let dash = StrokeDash::new(config.dash.clone(), 0.0);
            if dash.is_none() {
                log::warn!("Ignoring invalid dash pattern {:?}", config.dash);
            }
            dash
        };
        Self {
            accent: config.accent_color.to_rgba_u8(),
            history: config.history_color.to_rgba_u8(),
            stroke_width: config.stroke_width.max(0.0),
            dash,
            font_size: config.label_font_size,
        }
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

/// The single overlay drawn on top of the image
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlay {
    /// Drag in progress or confirmation pending, in the accent color
    Active(Rect),
    /// Previous crop converted to screen space, in the muted color
    Historical(Rect),
}

impl Overlay {
    /// Pick the overlay for the current state
    ///
    /// An active or confirmed selection always wins; the historical ghost is
    /// only shown when neither exists. `historical` is in image space.
    pub fn choose(
        selection: &SelectionState,
        historical: Option<Rect>,
        view: &ViewTransform,
    ) -> Option<Overlay> {
        if let Some(rect) = selection.active_rect() {
            return Some(Overlay::Active(rect));
        }
        historical.map(|r| Overlay::Historical(view.rect_to_screen(r)))
    }

    pub fn rect(&self) -> Rect {
        match self {
            Overlay::Active(r) | Overlay::Historical(r) => *r,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Overlay::Active(r) => r.label(),
            Overlay::Historical(_) => HISTORY_LABEL.to_string(),
        }
    }
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub image: &'a LoadedImage,
    pub view: &'a ViewTransform,
    pub overlay: Option<Overlay>,
    /// Outline opacity multiplier, 1.0 outside the confirmation pulse
    pub pulse: f32,
    pub dimmed: bool,
}

impl<'a> Frame<'a> {
    pub fn new(image: &'a LoadedImage, view: &'a ViewTransform) -> Self {
        Self {
            image,
            view,
            overlay: None,
            pulse: 1.0,
            dimmed: false,
        }
    }
}

/// Clear the surface and draw a complete frame
pub fn render_frame(
    surface: &mut Surface,
    frame: &Frame<'_>,
    style: &OverlayStyle,
    font: Option<&LabelFont>,
) {
    let ratio = surface.ratio();
    surface.clear();
    let Some(pixmap) = surface.pixmap_mut() else {
        return;
    };

    draw_image(pixmap, frame.image, frame.view, ratio.transform());

    if let Some(overlay) = frame.overlay {
        draw_overlay(pixmap, &overlay, style, font, frame.pulse, ratio.ratio());
    }

    if frame.dimmed {
        dim_pixmap(pixmap);
    }
}

/// Draw the image at the forward-mapped position and effective scale
pub fn draw_image(pixmap: &mut Pixmap, image: &LoadedImage, view: &ViewTransform, base: Transform) {
    let scale = view.effective_scale() as f32;
    if !(scale.is_finite() && scale > 0.0) {
        return;
    }
    let origin = view.origin();
    let placement = Transform::from_row(scale, 0.0, 0.0, scale, origin.x as f32, origin.y as f32);
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        image.pixmap.as_ref(),
        &paint,
        base.pre_concat(placement),
        None,
    );
}

/// Draw an overlay outline and its label box
pub fn draw_overlay(
    pixmap: &mut Pixmap,
    overlay: &Overlay,
    style: &OverlayStyle,
    font: Option<&LabelFont>,
    pulse: f32,
    ratio: f32,
) {
    let transform = Transform::from_scale(ratio, ratio);
    let rect = overlay.rect();

    let (color, dash, text_color) = match overlay {
        Overlay::Active(_) => (style.accent, style.dash.clone(), ACTIVE_TEXT),
        Overlay::Historical(_) => (style.history, None, style.history),
    };
    let alpha = (f32::from(color[3]) * pulse.clamp(0.0, 1.0)).round() as u8;
    stroke_rect(pixmap, rect, [color[0], color[1], color[2], alpha], style.stroke_width, dash, transform);

    let text = overlay.label();
    let (x, y) = (rect.x as f32, rect.y as f32);
    let text_width = match font {
        Some(font) => font.measure(&text),
        None => text::approximate_width(&text, style.font_size),
    };
    let (bx, by, bw, bh) = label::box_for(x, y, text_width);
    fill_rect(pixmap, bx, by, bw, bh, [0, 0, 0, label::BACKGROUND_ALPHA], transform);

    if let Some(font) = font {
        font.draw(
            pixmap,
            &text,
            x + label::TEXT_OFFSET_X,
            y + label::BASELINE_OFFSET_Y,
            text_color,
            ratio,
        );
    }
}

/// Build a closed rectangle path
fn rect_path(x: f32, y: f32, w: f32, h: f32) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(x, y);
    pb.line_to(x + w, y);
    pb.line_to(x + w, y + h);
    pb.line_to(x, y + h);
    pb.close();
    pb.finish()
}

/// Stroke a rect outline, dashed when `dash` is set
pub fn stroke_rect(
    pixmap: &mut Pixmap,
    rect: Rect,
    color: [u8; 4],
    width: f32,
    dash: Option<StrokeDash>,
    transform: Transform,
) {
    if width <= 0.0 {
        return;
    }
    let Some(path) = rect_path(rect.x as f32, rect.y as f32, rect.w as f32, rect.h as f32) else {
        return;
    };

    let [r, g, b, a] = color;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;

    let stroke = Stroke {
        width,
        dash,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, transform, None);
}

fn fill_rect(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, color: [u8; 4], transform: Transform) {
    let Some(path) = rect_path(x, y, w, h) else {
        return;
    };
    let [r, g, b, a] = color;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
}

/// Halve the brightness of everything drawn so far
pub fn dim_pixmap(pixmap: &mut Pixmap) {
    let (w, h) = (pixmap.width() as f32, pixmap.height() as f32);
    fill_rect(pixmap, 0.0, 0.0, w, h, [0, 0, 0, dim::VEIL_ALPHA], Transform::identity());
}
