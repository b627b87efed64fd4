//! Shared layout constants for overlay rendering
//!
//! All values are in logical pixels; the surface applies the device pixel
//! ratio when drawing.

/// Dimension label drawn above the top-left corner of an overlay rect
pub mod label {
    /// Label box left edge relative to the rect's x
    pub const BOX_OFFSET_X: f32 = -1.0;
    /// Label box top edge relative to the rect's y
    pub const BOX_OFFSET_Y: f32 = -14.0;
    /// Label box height
    pub const BOX_HEIGHT: f32 = 12.0;
    /// Extra width added around the measured text
    pub const BOX_PADDING: f32 = 4.0;
    /// Text start relative to the rect's x
    pub const TEXT_OFFSET_X: f32 = 1.0;
    /// Text baseline relative to the rect's y
    pub const BASELINE_OFFSET_Y: f32 = -4.0;
    /// Advance per character, as a fraction of the font size, when no font is loaded
    pub const FALLBACK_ADVANCE: f32 = 0.6;
    /// Label background alpha (black)
    pub const BACKGROUND_ALPHA: u8 = 178;

    /// Label box (x, y, w, h) for a rect anchored at (x, y) and text of the given width
    pub fn box_for(x: f32, y: f32, text_width: f32) -> (f32, f32, f32, f32) {
        (
            x + BOX_OFFSET_X,
            y + BOX_OFFSET_Y,
            text_width + BOX_PADDING,
            BOX_HEIGHT,
        )
    }
}

/// Darkening applied while the viewport is disabled
pub mod dim {
    /// Alpha of the black veil; 128 halves the brightness
    pub const VEIL_ALPHA: u8 = 128;
}

/// Confirmation pulse
pub mod pulse {
    use std::f32::consts::TAU;

    /// Lowest outline opacity reached mid-pulse
    pub const MIN_ALPHA: f32 = 0.35;

    /// Outline opacity multiplier for a progress in [0, 1]
    ///
    /// Starts and ends fully opaque with a single dip in the middle.
    pub fn alpha(progress: f32) -> f32 {
        let p = progress.clamp(0.0, 1.0);
        let wave = (1.0 + (TAU * p).cos()) * 0.5;
        MIN_ALPHA + (1.0 - MIN_ALPHA) * wave
    }
}
