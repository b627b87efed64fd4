//! Viewport transform engine
//!
//! Three coordinate spaces meet here: screen (canvas logical pixels), the
//! fitted canvas placement, and image (native pixel grid). The base "fit"
//! transform is recomputed from the canvas and image sizes on every use and
//! composed with the user zoom and pan held in [`ViewportState`].

use super::geometry::{Point, Rect, Size};

/// Smallest zoom factor; 1 means the image exactly fits the canvas
pub const MIN_ZOOM: f64 = 1.0;
/// Largest zoom factor on top of the fit scale
pub const MAX_ZOOM: f64 = 15.0;

/// Aspect-preserving "contain" placement of the image inside the canvas
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BaseTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub display_width: f64,
    pub display_height: f64,
}

impl BaseTransform {
    /// Identity-like result used while there is no image or no canvas area
    pub const NEUTRAL: BaseTransform = BaseTransform {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
        display_width: 0.0,
        display_height: 0.0,
    };

    /// Fit `image` inside `canvas`, centered, preserving aspect ratio
    pub fn compute(canvas: Size, image: Size) -> Self {
        if canvas.is_degenerate() || image.is_degenerate() {
            return Self::NEUTRAL;
        }

        let canvas_aspect = canvas.aspect_ratio();
        let image_aspect = image.aspect_ratio();

        let (display_width, display_height) = if canvas_aspect > image_aspect {
            // Canvas is wider than the image: match heights
            (canvas.height * image_aspect, canvas.height)
        } else {
            (canvas.width, canvas.width / image_aspect)
        };

        Self {
            scale: display_width / image.width,
            offset_x: (canvas.width - display_width) / 2.0,
            offset_y: (canvas.height - display_height) / 2.0,
            display_width,
            display_height,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.display_width <= 0.0 || self.display_height <= 0.0
    }
}

/// User-controlled zoom and pan
///
/// Fields are private so every value in circulation went through one of the
/// clamping transitions below: `zoom` stays in `[MIN_ZOOM, MAX_ZOOM]` and the
/// offset never pans past the image's own edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    zoom: f64,
    offset: Point,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: MIN_ZOOM,
            offset: Point::ORIGIN,
        }
    }
}

impl ViewportState {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Back to fit: zoom 1, no pan
    pub fn reset() -> Self {
        Self::default()
    }

    /// Zoom by `factor` keeping the image point under `pivot` fixed on screen
    ///
    /// Returns `self` unchanged when there is no usable base transform or the
    /// factor is not a positive finite number.
    pub fn zoom_at(self, base: &BaseTransform, image: Size, factor: f64, pivot: Point) -> Self {
        if base.is_neutral() || !(factor.is_finite() && factor > 0.0) {
            return self;
        }

        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if new_zoom == self.zoom {
            return self;
        }

        let old_scale = base.scale * self.zoom;
        let image_x = (pivot.x - base.offset_x - self.offset.x) / old_scale;
        let image_y = (pivot.y - base.offset_y - self.offset.y) / old_scale;

        let new_scale = base.scale * new_zoom;
        let candidate = Point::new(
            pivot.x - image_x * new_scale - base.offset_x,
            pivot.y - image_y * new_scale - base.offset_y,
        );

        Self {
            zoom: new_zoom,
            offset: clamp_offset(base, image, candidate, new_zoom),
        }
    }

    /// Move the pan offset to `candidate`, clamped for the current zoom
    pub fn panned(self, base: &BaseTransform, image: Size, candidate: Point) -> Self {
        Self {
            zoom: self.zoom,
            offset: clamp_offset(base, image, candidate, self.zoom),
        }
    }

    /// Re-clamp the offset, e.g. after the canvas changed size
    pub fn reclamped(self, base: &BaseTransform, image: Size) -> Self {
        self.panned(base, image, self.offset)
    }
}

/// Clamp a pan offset into `[-max_pan, 0]` on each axis
///
/// `max_pan` is the overscan of the zoomed image beyond its fitted size, so
/// the viewport can reveal the far edge but never empty space.
pub fn clamp_offset(base: &BaseTransform, image: Size, candidate: Point, zoom: f64) -> Point {
    let zoomed_width = image.width * base.scale * zoom;
    let zoomed_height = image.height * base.scale * zoom;

    let max_pan_x = (zoomed_width - base.display_width).max(0.0);
    let max_pan_y = (zoomed_height - base.display_height).max(0.0);

    Point::new(
        candidate.x.min(0.0).max(-max_pan_x),
        candidate.y.min(0.0).max(-max_pan_y),
    )
}

/// Effective image-to-screen mapping for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub base: BaseTransform,
    pub state: ViewportState,
    pub image: Size,
}

impl ViewTransform {
    pub fn new(canvas: Size, image: Size, state: ViewportState) -> Self {
        Self {
            base: BaseTransform::compute(canvas, image),
            state,
            image,
        }
    }

    /// Base fit scale multiplied by the user zoom
    pub fn effective_scale(&self) -> f64 {
        self.base.scale * self.state.zoom
    }

    /// Screen position of the image's top-left corner
    pub fn origin(&self) -> Point {
        Point::new(
            self.base.offset_x + self.state.offset.x,
            self.base.offset_y + self.state.offset.y,
        )
    }

    pub fn to_screen(&self, p: Point) -> Point {
        let scale = self.effective_scale();
        let origin = self.origin();
        Point::new(p.x * scale + origin.x, p.y * scale + origin.y)
    }

    pub fn to_image(&self, p: Point) -> Point {
        let scale = self.effective_scale();
        let origin = self.origin();
        Point::new((p.x - origin.x) / scale, (p.y - origin.y) / scale)
    }

    pub fn rect_to_screen(&self, r: Rect) -> Rect {
        let scale = self.effective_scale();
        let p = self.to_screen(r.origin());
        Rect::new(p.x, p.y, r.w * scale, r.h * scale)
    }

    pub fn rect_to_image(&self, r: Rect) -> Rect {
        let scale = self.effective_scale();
        let p = self.to_image(r.origin());
        Rect::new(p.x, p.y, r.w / scale, r.h / scale)
    }

    /// Screen-space rectangle covered by the drawn image
    pub fn image_bounds(&self) -> Rect {
        self.rect_to_screen(Rect::new(0.0, 0.0, self.image.width, self.image.height))
    }
}
