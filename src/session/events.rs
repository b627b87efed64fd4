//! Input event types for the viewport
//!
//! Positions are canvas-relative logical pixels. Events deserialize from a
//! tagged JSON form so scripted sessions can be replayed from a file.

use serde::{Deserialize, Serialize};

use crate::domain::Point;

// ============================================================================
// Pointer Types
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// Modifier keys held during a pointer press
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
}

// ============================================================================
// Input Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown {
        position: Point,
        #[serde(default)]
        button: PointerButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        position: Point,
    },
    PointerUp,
    PointerLeave,
    /// Scroll; negative `delta_y` zooms in
    Wheel {
        position: Point,
        delta_y: f64,
    },
}

impl InputEvent {
    /// Primary-button press without modifiers
    pub fn press(x: f64, y: f64) -> Self {
        InputEvent::PointerDown {
            position: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn move_to(x: f64, y: f64) -> Self {
        InputEvent::PointerMove {
            position: Point::new(x, y),
        }
    }

    pub fn wheel(x: f64, y: f64, delta_y: f64) -> Self {
        InputEvent::Wheel {
            position: Point::new(x, y),
            delta_y,
        }
    }

    /// Whether a press should start panning instead of selecting
    ///
    /// Panning is only entered when the image is zoomed past fit.
    pub fn requests_pan(&self) -> bool {
        match self {
            InputEvent::PointerDown {
                button, modifiers, ..
            } => modifiers.ctrl || modifiers.meta || *button == PointerButton::Middle,
            _ => false,
        }
    }
}

/// Whether the viewport consumed an event
///
/// Wheel events are always `Captured` so the host never scrolls the page
/// under the canvas, even when the viewport is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Ignored,
    Captured,
}
