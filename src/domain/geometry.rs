//! Geometric types shared by every coordinate space
//!
//! A value never records which space it lives in (screen or image); the
//! caller knows from context, and the two are never mixed in one rect.

use serde::{Deserialize, Serialize};

/// A point in logical screen pixels or image pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`
    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f64 {
        let d = self.sub(other);
        (d.x * d.x + d.y * d.y).sqrt()
    }
}

/// Width and height of a canvas or an image
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either side is zero, negative or not a number
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Width over height; callers must check `is_degenerate` first
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Axis-aligned rectangle with a non-negative extent
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Create a rectangle, folding negative extents to zero
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            x,
            y,
            w: w.max(0.0),
            h: h.max(0.0),
        }
    }

    /// A zero-sized rectangle anchored at `p`
    pub fn at(p: Point) -> Self {
        Self::new(p.x, p.y, 0.0, 0.0)
    }

    /// Bounding box of two arbitrary corner points
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            w: (a.x - b.x).abs(),
            h: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Inclusive containment test, edges count as inside
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// True when either side is shorter than `min`
    pub fn smaller_than(&self, min: f64) -> bool {
        self.w < min || self.h < min
    }

    /// Rounded `x:.. y:.. w:.. h:..` description used by overlay labels
    pub fn label(&self) -> String {
        format!(
            "x:{} y:{} w:{} h:{}",
            self.x.round(),
            self.y.round(),
            self.w.round(),
            self.h.round()
        )
    }
}
