//! Confirmation pulse timing
//!
//! The animation never schedules anything itself. The owner feeds it
//! monotonic timestamps and reacts to [`AnimationStep::Complete`]; dropping
//! the value cancels it.

use std::time::{Duration, Instant};

use super::geometry::pulse;

/// Result of advancing the animation to a given instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationStep {
    /// Still running; `progress` is in [0, 1)
    Frame { progress: f32 },
    /// Duration elapsed; the selection is ready to finalize
    Complete,
}

#[derive(Debug, Clone)]
pub struct ConfirmAnimation {
    duration: Duration,
    started: Option<Instant>,
}

impl ConfirmAnimation {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started: None,
        }
    }

    /// Advance to `now`; the first tick marks the start
    pub fn tick(&mut self, now: Instant) -> AnimationStep {
        let started = *self.started.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started);
        if elapsed >= self.duration {
            return AnimationStep::Complete;
        }
        AnimationStep::Frame {
            progress: elapsed.as_secs_f32() / self.duration.as_secs_f32(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }
}

impl AnimationStep {
    /// Outline opacity for this step
    pub fn pulse(&self) -> f32 {
        match self {
            AnimationStep::Frame { progress } => pulse::alpha(*progress),
            AnimationStep::Complete => 1.0,
        }
    }
}
