//! The image viewport component
//!
//! Owns the loaded image, the zoom/pan state and the selection, interprets
//! pointer and wheel input, redraws the canvas after every change and emits
//! completed selections through the registered callback.
//!
//! Everything runs on the caller's thread. Time only enters through
//! [`ImageViewport::tick`], which the host calls with a monotonic timestamp
//! while [`ImageViewport::is_animating`] is true.

use std::time::{Duration, Instant};

use tiny_skia::Pixmap;

use super::events::{EventStatus, InputEvent};
use super::finalize::{self, SelectionOutput};
use crate::capture::{ImageSource, LoadedImage};
use crate::config::ViewerConfig;
use crate::domain::{
    CursorHint, InteractionState, Point, Rect, SelectionMode, SelectionState, Size,
    ViewTransform, ViewportState, fixed_box,
};
use crate::render::{
    AnimationStep, ConfirmAnimation, DevicePixelRatio, Frame, LabelFont, Overlay, OverlayStyle,
    Surface, render_frame,
};

/// Receives each completed selection exactly once
pub type SelectCallback = Box<dyn FnMut(SelectionOutput)>;

/// Handle for one image load; only the most recent ticket is accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    source: ImageSource,
}

impl LoadTicket {
    pub fn source(&self) -> &ImageSource {
        &self.source
    }
}

/// Selection waiting for its confirmation pulse to finish
#[derive(Debug, Clone)]
struct PendingConfirmation {
    rect: Rect,
    /// Transform in effect when the selection was confirmed
    view: ViewTransform,
    animation: ConfirmAnimation,
    pulse: f32,
}

/// Confirmed selection whose pulse has run its course
#[derive(Debug, Clone)]
struct ConfirmationExpired {
    rect: Rect,
    view: ViewTransform,
}

/// Reported by each animation step and consumed by the finalizer
#[derive(Debug, Clone)]
enum AnimationEvent {
    Running,
    Expired(ConfirmationExpired),
}

pub struct ImageViewport {
    config: ViewerConfig,
    style: OverlayStyle,
    font: Option<LabelFont>,
    surface: Surface,

    image: Option<LoadedImage>,
    generation: u64,

    state: ViewportState,
    selection: SelectionState,
    /// Pan anchor: press position minus the offset at press time
    pan_anchor: Option<Point>,
    mode: SelectionMode,
    historical: Option<Rect>,
    enhancing: bool,
    confirmation: Option<PendingConfirmation>,

    on_select: Option<SelectCallback>,
    torn_down: bool,
}

impl std::fmt::Debug for ImageViewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageViewport")
            .field("canvas", &self.surface.logical_size())
            .field("has_image", &self.image.is_some())
            .field("state", &self.state)
            .field("selection", &self.selection)
            .field("mode", &self.mode)
            .field("enhancing", &self.enhancing)
            .finish_non_exhaustive()
    }
}

impl ImageViewport {
    pub fn new(config: ViewerConfig, canvas: Size) -> Self {
        let config = config.sanitized();
        let font = LabelFont::resolve(config.label_font.as_deref(), config.label_font_size);
        let surface = Surface::new(canvas, DevicePixelRatio::new(config.device_pixel_ratio));

        Self {
            style: OverlayStyle::from_config(&config),
            mode: config.selection_mode(),
            config,
            font,
            surface,
            image: None,
            generation: 0,
            state: ViewportState::reset(),
            selection: SelectionState::None,
            pan_anchor: None,
            historical: None,
            enhancing: false,
            confirmation: None,
            on_select: None,
            torn_down: false,
        }
    }

    /// Register the selection callback, replacing any previous one
    pub fn on_select(&mut self, callback: impl FnMut(SelectionOutput) + 'static) {
        self.on_select = Some(Box::new(callback));
    }

    pub fn set_label_font(&mut self, font: Option<LabelFont>) {
        self.font = font;
        self.redraw();
    }

    // ========================================================================
    // Host inputs
    // ========================================================================

    /// Start switching to a new image
    ///
    /// Drops the current image along with any gesture or pending confirmation.
    /// The returned ticket must be handed back to [`Self::image_loaded`].
    pub fn set_image_source(&mut self, source: ImageSource) -> LoadTicket {
        self.generation += 1;
        log::debug!("Image source changed (generation {})", self.generation);

        self.cancel_transient();
        self.image = None;
        self.state = ViewportState::reset();
        self.surface.clear();

        LoadTicket {
            generation: self.generation,
            source,
        }
    }

    /// Install a decoded image; returns false for a stale ticket
    pub fn image_loaded(&mut self, ticket: LoadTicket, image: LoadedImage) -> bool {
        if ticket.generation != self.generation {
            log::debug!(
                "Dropping stale image load (generation {}, current {})",
                ticket.generation,
                self.generation
            );
            return false;
        }
        log::debug!("Image ready: {}x{}", image.width(), image.height());
        self.image = Some(image);
        self.state = ViewportState::reset();
        self.redraw();
        true
    }

    /// Load `source` and install it
    pub async fn load_image(&mut self, source: ImageSource) -> anyhow::Result<bool> {
        let ticket = self.set_image_source(source);
        let image = crate::capture::load(ticket.source().clone()).await?;
        Ok(self.image_loaded(ticket, image))
    }

    /// Canvas size changed; safe to call repeatedly and before any image
    pub fn resize(&mut self, canvas: Size) {
        let ratio = self.surface.ratio();
        self.apply_surface(canvas, ratio);
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f32) {
        let canvas = self.surface.logical_size();
        self.apply_surface(canvas, DevicePixelRatio::new(ratio));
    }

    fn apply_surface(&mut self, canvas: Size, ratio: DevicePixelRatio) {
        if !self.surface.resize(canvas, ratio) {
            return;
        }
        let view = self.view();
        self.state = self.state.reclamped(&view.base, view.image);
        self.redraw();
    }

    /// Upstream enhancement in progress; disables input and dims the canvas
    pub fn set_enhancing(&mut self, enhancing: bool) {
        if self.enhancing == enhancing {
            return;
        }
        self.enhancing = enhancing;
        if enhancing {
            self.pan_anchor = None;
            if matches!(self.selection, SelectionState::Dragging { .. }) {
                self.selection = SelectionState::None;
            }
        }
        self.redraw();
    }

    /// Image-space rect of a previous crop, shown as a ghost
    pub fn set_historical_selection(&mut self, rect: Option<Rect>) {
        self.historical = rect;
        self.redraw();
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.mode = match mode {
            SelectionMode::FixedBox { percentage } => SelectionMode::from_flags(true, percentage),
            SelectionMode::FreeDrag => SelectionMode::FreeDrag,
        };
        if matches!(self.selection, SelectionState::Dragging { .. }) {
            self.selection = SelectionState::None;
            self.redraw();
        }
    }

    // ========================================================================
    // Input state machine
    // ========================================================================

    pub fn handle_event(&mut self, event: InputEvent) -> EventStatus {
        match event {
            InputEvent::PointerDown { position, .. } => {
                self.pointer_down(position, event.requests_pan())
            }
            InputEvent::PointerMove { position } => self.pointer_move(position),
            InputEvent::PointerUp | InputEvent::PointerLeave => self.pointer_up(),
            InputEvent::Wheel { position, delta_y } => {
                self.wheel(position, delta_y);
                EventStatus::Captured
            }
        }
    }

    fn pointer_down(&mut self, position: Point, wants_pan: bool) -> EventStatus {
        if self.is_disabled() || self.image.is_none() {
            return EventStatus::Ignored;
        }

        if wants_pan && self.state.zoom() > 1.0 {
            let offset = self.state.offset();
            self.pan_anchor = Some(position.sub(offset));
            log::debug!("Panning from {:?}", position);
            return EventStatus::Captured;
        }

        match self.mode {
            SelectionMode::FixedBox { percentage } => self.select_fixed_box(position, percentage),
            SelectionMode::FreeDrag => {
                self.selection = SelectionState::Dragging {
                    start: position,
                    rect: Rect::at(position),
                };
                self.redraw();
                EventStatus::Captured
            }
        }
    }

    fn pointer_move(&mut self, position: Point) -> EventStatus {
        if self.is_disabled() {
            return EventStatus::Ignored;
        }

        if let Some(anchor) = self.pan_anchor {
            let view = self.view();
            self.state = self
                .state
                .panned(&view.base, view.image, position.sub(anchor));
            self.redraw();
            return EventStatus::Captured;
        }

        if let SelectionState::Dragging { start, .. } = self.selection {
            self.selection = SelectionState::Dragging {
                start,
                rect: Rect::from_points(start, position),
            };
            self.redraw();
            return EventStatus::Captured;
        }

        EventStatus::Ignored
    }

    fn pointer_up(&mut self) -> EventStatus {
        if self.pan_anchor.take().is_some() {
            self.redraw();
            return EventStatus::Captured;
        }

        let SelectionState::Dragging { rect, .. } = self.selection else {
            return EventStatus::Ignored;
        };
        self.selection = SelectionState::None;

        if self.is_disabled() || self.image.is_none() || rect.smaller_than(self.config.min_selection_size) {
            log::debug!("Discarding selection {}", rect.label());
            self.redraw();
            return EventStatus::Captured;
        }

        log::debug!("Confirming selection {}", rect.label());
        self.selection = SelectionState::Confirmed(rect);
        self.confirmation = Some(PendingConfirmation {
            rect,
            view: self.view(),
            animation: ConfirmAnimation::new(Duration::from_millis(self.config.confirm_duration_ms)),
            pulse: 1.0,
        });
        self.redraw();
        EventStatus::Captured
    }

    /// Negative delta zooms in; zero or positive zooms out
    fn wheel(&mut self, position: Point, delta_y: f64) {
        if self.is_disabled() || !delta_y.is_finite() {
            return;
        }
        let step = self.config.wheel_zoom_step;
        let factor = if delta_y < 0.0 { step } else { 1.0 / step };
        self.zoom_at(factor, position);
    }

    /// Click-to-place box: completes immediately, no confirmation pulse
    fn select_fixed_box(&mut self, position: Point, percentage: f64) -> EventStatus {
        let view = self.view();
        if view.base.is_neutral() || !view.image_bounds().contains(position) {
            return EventStatus::Ignored;
        }

        let original = fixed_box(view.to_image(position), view.image, percentage);
        let screen = view.rect_to_screen(original);

        let overlay = self.current_overlay(&view);
        self.render(&view, overlay, 1.0, false);
        let snapshot = finalize::capture(&mut self.surface, screen, &self.style);
        let output = finalize::from_original(&view, original, snapshot);

        self.redraw();
        self.emit(output);
        EventStatus::Captured
    }

    // ========================================================================
    // Zoom controls
    // ========================================================================

    fn zoom_at(&mut self, factor: f64, pivot: Point) {
        let view = self.view();
        let next = self.state.zoom_at(&view.base, view.image, factor, pivot);
        if next != self.state {
            self.state = next;
            self.redraw();
        }
    }

    /// Zoom in one step around the canvas center
    pub fn zoom_in(&mut self) {
        let center = self.surface.logical_size().center();
        self.zoom_at(self.config.button_zoom_step, center);
    }

    /// Zoom out one step around the canvas center
    pub fn zoom_out(&mut self) {
        let center = self.surface.logical_size().center();
        self.zoom_at(1.0 / self.config.button_zoom_step, center);
    }

    /// Back to fit
    pub fn reset_zoom(&mut self) {
        self.state = ViewportState::reset();
        self.redraw();
    }

    // ========================================================================
    // Animation and finalize
    // ========================================================================

    pub fn is_animating(&self) -> bool {
        self.confirmation.is_some()
    }

    /// Advance the confirmation pulse to `now`
    ///
    /// Returns true while more ticks are needed. When the pulse expires the
    /// selection is finalized and emitted before this returns.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.advance_animation(now) {
            None => false,
            Some(AnimationEvent::Running) => true,
            Some(AnimationEvent::Expired(expired)) => {
                self.finalize_confirmation(expired);
                false
            }
        }
    }

    /// Draw one pulse frame, or report that the pulse has expired
    fn advance_animation(&mut self, now: Instant) -> Option<AnimationEvent> {
        let pending = self.confirmation.as_mut()?;
        match pending.animation.tick(now) {
            step @ AnimationStep::Frame { .. } => {
                pending.pulse = step.pulse();
                self.redraw();
                Some(AnimationEvent::Running)
            }
            AnimationStep::Complete => {
                let expired = ConfirmationExpired {
                    rect: pending.rect,
                    view: pending.view,
                };
                self.confirmation = None;
                Some(AnimationEvent::Expired(expired))
            }
        }
    }

    fn finalize_confirmation(&mut self, expired: ConfirmationExpired) {
        let ConfirmationExpired { rect, view } = expired;

        self.render(&view, Some(Overlay::Active(rect)), 1.0, false);
        let snapshot = finalize::capture(&mut self.surface, rect, &self.style);
        let output = finalize::from_screen(&view, rect, snapshot);

        self.selection = SelectionState::None;
        self.redraw();
        self.emit(output);
    }

    fn emit(&mut self, output: SelectionOutput) {
        if self.torn_down {
            return;
        }
        log::info!(
            "Selection {} (screen {})",
            output.original_rect.label(),
            output.screen_rect.label()
        );
        if let Some(callback) = self.on_select.as_mut() {
            callback(output);
        }
    }

    /// Cancel any pending animation and forget the callback
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        log::debug!("Viewport torn down");
        self.torn_down = true;
        self.cancel_transient();
        self.on_select = None;
    }

    fn cancel_transient(&mut self) {
        if self.confirmation.take().is_some() {
            log::debug!("Cancelled pending confirmation");
        }
        self.selection = SelectionState::None;
        self.pan_anchor = None;
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn current_overlay(&self, view: &ViewTransform) -> Option<Overlay> {
        Overlay::choose(&self.selection, self.historical, view)
    }

    fn redraw(&mut self) {
        let view = self.view();
        let overlay = self.current_overlay(&view);
        let pulse = self.confirmation.as_ref().map_or(1.0, |c| c.pulse);
        let dimmed = self.is_disabled();
        self.render(&view, overlay, pulse, dimmed);
    }

    fn render(&mut self, view: &ViewTransform, overlay: Option<Overlay>, pulse: f32, dimmed: bool) {
        let Some(image) = self.image.as_ref() else {
            self.surface.clear();
            return;
        };
        let frame = Frame {
            image,
            view,
            overlay,
            pulse,
            dimmed,
        };
        render_frame(&mut self.surface, &frame, &self.style, self.font.as_ref());
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    fn is_disabled(&self) -> bool {
        self.enhancing || self.confirmation.is_some()
    }

    /// Transform for the current canvas, image and zoom/pan
    pub fn view(&self) -> ViewTransform {
        let image = self.image.as_ref().map(LoadedImage::size).unwrap_or_default();
        ViewTransform::new(self.surface.logical_size(), image, self.state)
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn historical_selection(&self) -> Option<Rect> {
        self.historical
    }

    pub fn interaction(&self) -> InteractionState {
        if self.is_disabled() {
            InteractionState::Disabled
        } else if self.pan_anchor.is_some() {
            InteractionState::Panning
        } else if matches!(self.selection, SelectionState::Dragging { .. }) {
            InteractionState::Dragging
        } else {
            InteractionState::Idle
        }
    }

    pub fn cursor(&self) -> CursorHint {
        if self.is_disabled() {
            CursorHint::Wait
        } else if self.pan_anchor.is_some() {
            CursorHint::Grabbing
        } else if self.state.zoom() > 1.0 {
            CursorHint::Grab
        } else if self.mode.is_fixed_box() {
            CursorHint::ZoomIn
        } else {
            CursorHint::Crosshair
        }
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn canvas_size(&self) -> Size {
        self.surface.logical_size()
    }

    /// Current canvas content in physical pixels
    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.surface.pixmap()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
}

impl Drop for ImageViewport {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn viewport_with_image(w: u32, h: u32) -> ImageViewport {
        let mut vp = ImageViewport::new(ViewerConfig::default(), Size::new(800.0, 800.0));
        let ticket = vp.set_image_source(ImageSource::Bytes(Vec::new().into()));
        let image = LoadedImage::new(RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]))).unwrap();
        assert!(vp.image_loaded(ticket, image));
        vp
    }

    #[test]
    fn cursor_follows_state() {
        let mut vp = viewport_with_image(1000, 500);
        assert_eq!(vp.cursor(), CursorHint::Crosshair);

        vp.set_selection_mode(SelectionMode::FixedBox { percentage: 0.2 });
        assert_eq!(vp.cursor(), CursorHint::ZoomIn);

        vp.zoom_in();
        assert_eq!(vp.cursor(), CursorHint::Grab);

        vp.handle_event(InputEvent::PointerDown {
            position: Point::new(400.0, 400.0),
            button: crate::session::PointerButton::Middle,
            modifiers: Default::default(),
        });
        assert_eq!(vp.cursor(), CursorHint::Grabbing);
        assert_eq!(vp.interaction(), InteractionState::Panning);

        vp.handle_event(InputEvent::PointerUp);
        vp.set_enhancing(true);
        assert_eq!(vp.cursor(), CursorHint::Wait);
    }

    #[test]
    fn drag_tracks_bounding_box() {
        let mut vp = viewport_with_image(1000, 500);
        vp.handle_event(InputEvent::press(300.0, 400.0));
        vp.handle_event(InputEvent::move_to(250.0, 450.0));
        assert_eq!(
            vp.selection(),
            SelectionState::Dragging {
                start: Point::new(300.0, 400.0),
                rect: Rect::new(250.0, 400.0, 50.0, 50.0),
            }
        );
        assert_eq!(vp.interaction(), InteractionState::Dragging);
    }

    #[test]
    fn pan_requires_zoom() {
        let mut vp = viewport_with_image(1000, 500);
        let ctrl_press = InputEvent::PointerDown {
            position: Point::new(400.0, 400.0),
            button: Default::default(),
            modifiers: crate::session::Modifiers::CTRL,
        };
        vp.handle_event(ctrl_press);
        // at fit a ctrl-press falls through to a selection drag
        assert_eq!(vp.interaction(), InteractionState::Dragging);
    }

    #[test]
    fn resize_reclamps_offset() {
        let mut vp = viewport_with_image(1000, 1000);
        for _ in 0..5 {
            vp.zoom_in();
        }
        // pan to the far corner
        vp.handle_event(InputEvent::PointerDown {
            position: Point::new(790.0, 790.0),
            button: Default::default(),
            modifiers: crate::session::Modifiers::CTRL,
        });
        vp.handle_event(InputEvent::move_to(-5000.0, -5000.0));
        vp.handle_event(InputEvent::PointerUp);
        let before = vp.state().offset();
        assert!(before.x < 0.0);

        vp.resize(Size::new(400.0, 400.0));
        let view = vp.view();
        let max_pan = 1000.0 * view.base.scale * vp.state().zoom() - view.base.display_width;
        assert!(vp.state().offset().x >= -max_pan - 1e-9);
        assert!(vp.state().offset().x <= 0.0);
    }

    #[test]
    fn no_image_draws_nothing() {
        let mut vp = ImageViewport::new(ViewerConfig::default(), Size::new(100.0, 100.0));
        vp.resize(Size::new(100.0, 100.0));
        vp.zoom_in();
        assert_eq!(vp.state(), ViewportState::reset());
        assert_eq!(vp.handle_event(InputEvent::press(10.0, 10.0)), EventStatus::Ignored);
        assert!(vp.pixmap().unwrap().pixels().iter().all(|p| p.alpha() == 0));
    }
}
