//! Static obstacles: blocks and ramps
//!
//! Blocks are plain rectangles, optionally passable from below (one-way
//! floors). Ramps are sloped colliders with a linear height profile across
//! their width; movement code consults them through the surface queries
//! here and lets `resolve` snap a moving body onto the slope.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

use super::body::Body;
use super::geom::Rect;
use crate::round6;

/// Stable handle to an obstacle in a `World`. Non-owning: obstacles are
/// never removed mid-tick, so a handle read from a contact slot stays valid
/// for at least the tick it was produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleRef {
    Block(usize),
    Body(usize),
    Ramp(usize),
}

/// Broad-phase view of one rectangular obstacle (a block or another body),
/// flattened out of the world before a body moves.
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub id: ObstacleRef,
    pub rect: Rect,
    pub passable: bool,
}

/// Static rectangular obstacle. Passable blocks only stop downward motion
/// onto their top surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Block {
    pub rect: Rect,
    pub passable: bool,
}

impl Block {
    pub fn new(x: f64, y: f64, w: f64, h: f64, passable: bool) -> Self {
        Self {
            rect: Rect::new(x, y, w, h),
            passable,
        }
    }
}

/// Sloped obstacle. `left` means the slope descends toward the left, with
/// the high side at the ramp's right edge; `inverted` flips it into a
/// ceiling slope. The surface runs linearly across the ramp's width.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ramp {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub left: bool,
    pub inverted: bool,
    /// Slope steepness, h/w.
    pub ratio: f64,
    /// Cosine of the slope angle, w/sqrt(w^2+h^2). Scales horizontal speed
    /// when climbing against the slope.
    pub factor: f64,
    /// Recomputed against each mover's swept bounds before resolution; a
    /// ramp only affects a body whose motion crosses its collision column.
    #[serde(skip)]
    can_collide: Cell<bool>,
}

impl Ramp {
    pub fn new(x: f64, y: f64, w: f64, h: f64, left: bool, inverted: bool) -> Self {
        Self {
            x,
            y,
            w,
            h,
            left,
            inverted,
            ratio: h / w,
            factor: w / (w * w + h * h).sqrt(),
            can_collide: Cell::new(false),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// X at which a rect of this width sits exactly on the slope at its
    /// current height. Past the high end the rect's own x is returned.
    pub fn surface_x(&self, r: &Rect) -> f64 {
        if self.left && r.x + r.w > self.x + self.w || !self.left && r.x < self.x {
            return r.x;
        }
        let rise = if self.inverted {
            r.y - self.y
        } else {
            self.y + self.h - r.y - r.h
        };
        let offset = rise * self.w / self.h;
        if self.left {
            self.x + offset - r.w
        } else {
            self.x + self.w - offset
        }
    }

    /// Y at which a rect at its current x sits exactly on the slope.
    pub fn surface_y(&self, r: &Rect) -> f64 {
        if self.left && r.x + r.w > self.x + self.w || !self.left && r.x < self.x {
            return self.y + if self.inverted { self.h } else { -r.h };
        }
        let run = if self.left {
            self.x + self.w - r.x - r.w
        } else {
            r.x - self.x
        };
        let offset = run * self.h / self.w;
        if self.inverted {
            self.y + self.h - offset
        } else {
            self.y + offset - r.h
        }
    }

    /// Exact slope contact: the rect sits precisely on the surface profile.
    /// Inverted ramps never report contact; they only push back via
    /// `intersects`.
    pub fn contact(&self, r: &Rect) -> bool {
        if self.inverted {
            return false;
        }
        r.x + r.w > self.x
            && r.x < self.x + self.w
            && round6(r.x) == round6(self.surface_x(r))
            && round6(r.y) == round6(self.surface_y(r))
    }

    /// The rect has sunk past the surface profile.
    pub fn intersects(&self, r: &Rect) -> bool {
        r.x + r.w > self.x
            && r.x < self.x + self.w
            && if self.inverted {
                r.y < self.surface_y(r) && r.y + r.h > self.y
            } else {
                r.y > self.surface_y(r) && r.y < self.y + self.h
            }
    }

    /// Recompute the transient collision flag against a mover's swept
    /// bounds. Called once per body per tick before resolution.
    pub fn check_can_collide(&self, sweep: &Rect) {
        let y = self.surface_y(sweep) + if self.inverted { 0.0 } else { sweep.h };
        self.can_collide.set(
            sweep.x + sweep.w > self.x
                && self.x + self.w > sweep.x
                && sweep.y < y
                && sweep.y + sweep.h > y,
        );
    }

    pub fn can_collide(&self) -> bool {
        self.can_collide.get()
    }

    /// Post-move slope resolution: if the body crossed the surface while
    /// traversing in the slope direction, shift it along x to preserve the
    /// contact point, attenuate horizontal speed when it was not already
    /// resting on this ramp, and snap it onto the surface.
    pub fn resolve(&self, index: usize, body: &mut Body) {
        if !self.can_collide.get() || !self.intersects(&body.bounds()) {
            return;
        }

        let counter = self.left && body.prev_speed.x > 0.0 || !self.left && body.prev_speed.x < 0.0;
        let traversing = if self.inverted {
            body.prev_speed.y < 0.0
        } else {
            body.prev_speed.y > 0.0
        };
        if counter && traversing {
            let mut dx = self.surface_x(&body.bounds()) - body.pos.x;
            let s = (body.prev_speed.y / body.prev_speed.x).abs();
            dx /= s + self.ratio;
            body.pos.x += dx;
        }
        if counter && body.contacts.bottom != Some(ObstacleRef::Ramp(index)) {
            body.speed.x *= self.factor;
        }

        body.speed.y = 0.0;
        body.pos.y = self.surface_y(&body.bounds());
    }
}

impl PartialEq for Ramp {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.w == other.w
            && self.h == other.h
            && self.left == other.left
            && self.inverted == other.inverted
    }
}
