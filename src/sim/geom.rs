//! Axis-aligned rectangles and small vector helpers

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle. `y` grows downward, as everywhere in the sim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Strict half-open overlap test: rectangles that merely touch along an
    /// edge do not intersect.
    #[inline]
    pub fn intersects(&self, r: &Rect) -> bool {
        self.x < r.x + r.w && self.x + self.w > r.x && self.y < r.y + r.h && self.y + self.h > r.y
    }

    /// Bounding rectangle covering this rect before and after a displacement.
    pub fn swept(&self, delta: DVec2) -> Rect {
        Rect {
            x: if delta.x < 0.0 { self.x + delta.x } else { self.x },
            y: if delta.y < 0.0 { self.y + delta.y } else { self.y },
            w: self.w + delta.x.abs(),
            h: self.h + delta.y.abs(),
        }
    }
}

/// Rotate a vector by `radians` (standard 2D rotation matrix). Used by
/// cosmetic collaborators (particle effects), not by collision resolution.
#[inline]
pub fn rotate(v: DVec2, radians: f64) -> DVec2 {
    let (sin, cos) = radians.sin_cos();
    DVec2::new(cos * v.x - sin * v.y, sin * v.x + cos * v.y)
}
