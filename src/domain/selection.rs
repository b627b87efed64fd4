//! Selection and interaction types for the viewport

use super::geometry::{Point, Rect, Size};

/// Lifecycle of the single selection the viewport can hold
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    None,
    /// Free drag in progress: screen-space start point and current rect
    Dragging { start: Point, rect: Rect },
    /// Screen-space rect waiting for the confirmation animation to expire
    Confirmed(Rect),
}

impl SelectionState {
    /// The rect an accent overlay should show, if any
    pub fn active_rect(&self) -> Option<Rect> {
        match self {
            SelectionState::None => None,
            SelectionState::Dragging { rect, .. } => Some(*rect),
            SelectionState::Confirmed(rect) => Some(*rect),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, SelectionState::Confirmed(_))
    }
}

/// How a pointer press turns into a selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionMode {
    /// Drag out an arbitrary rectangle
    FreeDrag,
    /// Click to place a box sized as a fraction of the image, both axes
    FixedBox { percentage: f64 },
}

impl SelectionMode {
    /// Build a mode from the host's flag pair, clamping the percentage into (0, 1]
    pub fn from_flags(use_fixed_box: bool, percentage: f64) -> Self {
        if use_fixed_box {
            SelectionMode::FixedBox {
                percentage: sanitize_percentage(percentage),
            }
        } else {
            SelectionMode::FreeDrag
        }
    }

    pub fn is_fixed_box(&self) -> bool {
        matches!(self, SelectionMode::FixedBox { .. })
    }
}

/// Coerce a fixed-box percentage into (0, 1]; anything unusable becomes 1
pub fn sanitize_percentage(percentage: f64) -> f64 {
    if percentage.is_finite() && percentage > 0.0 {
        percentage.min(1.0)
    } else {
        1.0
    }
}

/// What the input state machine is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Dragging,
    Panning,
    /// Enhancing upstream or a confirmation is pending
    Disabled,
}

/// Pointer cursor the host should show over the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Crosshair,
    ZoomIn,
    Grab,
    Grabbing,
    Wait,
}

/// Image-space box of `percentage` of the image size centered on `click`
///
/// The box is shifted (never shrunk) so it lies fully inside the image.
pub fn fixed_box(click: Point, image: Size, percentage: f64) -> Rect {
    let w = image.width * percentage;
    let h = image.height * percentage;

    let mut x = click.x - w / 2.0;
    let mut y = click.y - h / 2.0;

    if x < 0.0 {
        x = 0.0;
    }
    if y < 0.0 {
        y = 0.0;
    }
    if x + w > image.width {
        x = image.width - w;
    }
    if y + h > image.height {
        y = image.height - h;
    }

    Rect::new(x, y, w, h)
}
