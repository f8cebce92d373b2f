//! Collision detection between axis-aligned rectangles
//!
//! Everything in the play area is a box: the player square, obstacles and
//! coins. Hit tests shrink (or grow) each box by a tolerance before testing
//! overlap, so visually tight sprites don't register grazes as hits and
//! coins are a little easier to grab.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in play-area coordinates (y-up)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Bottom-left corner
    pub min: Vec2,
    /// Width and height
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Not yet laid out, or corrupted: never collides
    pub fn is_degenerate(&self) -> bool {
        !(self.size.x > 0.0 && self.size.y > 0.0) || !self.min.is_finite() || !self.size.is_finite()
    }

    /// Scale the box about its center so each side moves in by
    /// `dim * (1 - tolerance) / 2`. Tolerance above 1 grows the box.
    pub fn with_tolerance(&self, tolerance: f32) -> Self {
        let inset = self.size * (1.0 - tolerance) / 2.0;
        Self {
            min: self.min + inset,
            size: self.size - inset * 2.0,
        }
    }
}

/// Overlap test between two boxes after applying `tolerance` to each.
///
/// Touching edges count as a hit. Degenerate boxes (non-positive or
/// non-finite dimensions) never collide.
pub fn check(a: &Rect, b: &Rect, tolerance: f32) -> bool {
    if a.is_degenerate() || b.is_degenerate() || !tolerance.is_finite() {
        return false;
    }
    let a = a.with_tolerance(tolerance);
    let b = b.with_tolerance(tolerance);
    if a.is_degenerate() || b.is_degenerate() {
        return false;
    }

    let (a_max, b_max) = (a.max(), b.max());
    !(a_max.x < b.min.x || a.min.x > b_max.x || a_max.y < b.min.y || a.min.y > b_max.y)
}
