//! Movement-capable bodies and the collision-resolution engine
//!
//! A `Body` is an axis-aligned rectangle with mass, velocity and per-side
//! contact state. `Body::step` advances it one fixed tick against a list of
//! rectangular obstacles and ramps: force accumulation, speed clamping,
//! swept broad phase, orthogonal or diagonal narrow phase (diagonal ties
//! are broken by time of impact), ramp resolution, then a full contact
//! recompute. Everything is synchronous and deterministic.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::geom::Rect;
use super::obstacle::{Obstacle, ObstacleRef, Ramp};
use crate::config::PhysicsConfig;
use crate::round6;

/// How a step is driven: accumulated forces (the normal per-tick path) or a
/// velocity written directly (scripted motion and pushing).
#[derive(Debug, Clone, Copy)]
pub enum Drive {
    Force(DVec2),
    Velocity(DVec2),
}

/// Target for `move_free`: a point to seek, or a fixed heading in degrees.
#[derive(Debug, Clone, Copy)]
pub enum Aim {
    Point(DVec2),
    Angle(f64),
}

/// The obstacle, if any, the body is exactly touching on each side this
/// tick. Recomputed from scratch at the end of every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Contacts {
    pub top: Option<ObstacleRef>,
    pub bottom: Option<ObstacleRef>,
    pub left: Option<ObstacleRef>,
    pub right: Option<ObstacleRef>,
}

/// Waypoint-patrol state for `World::cycle`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct CycleState {
    pub index: usize,
    pub timer: u32,
    pub waiting: bool,
}

/// A dynamic actor: player character, pushable mark, moving platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    /// Top-left corner; y grows downward.
    pub pos: DVec2,
    pub size: DVec2,
    pub mass: f64,
    pub speed: DVec2,
    /// Speed after force application but before collision clamping this
    /// tick; ramp resolution and contact recompute read it.
    pub prev_speed: DVec2,
    pub max_speed: DVec2,
    /// Impulse queued from outside, consumed and zeroed on the next step.
    pub stored_forces: DVec2,
    /// Whether this body acts as a one-way floor for others.
    pub passable: bool,
    /// Whether other bodies may shove this one.
    pub pushable: bool,
    pub contacts: Contacts,
    pub(crate) cycle: CycleState,
}

impl Body {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            pos: DVec2::new(x, y),
            size: DVec2::new(w, h),
            mass: 1.0,
            speed: DVec2::ZERO,
            prev_speed: DVec2::ZERO,
            max_speed: DVec2::new(15.0, 15.0),
            stored_forces: DVec2::ZERO,
            passable: false,
            pushable: false,
            contacts: Contacts::default(),
            cycle: CycleState::default(),
        }
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        assert!(mass > 0.0, "body mass must be positive");
        self.mass = mass;
        self
    }

    pub fn with_max_speed(mut self, max: DVec2) -> Self {
        self.max_speed = max;
        self
    }

    pub fn pushable(mut self) -> Self {
        self.pushable = true;
        self
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }

    /// Teleport (level reset / spawn). Clears velocity.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.pos = DVec2::new(x, y);
        self.speed = DVec2::ZERO;
    }

    /// Advance one tick. `obstacles` must not include this body's own view.
    pub fn step(
        &mut self,
        drive: Drive,
        obstacles: &[Obstacle],
        ramps: &[Ramp],
        cfg: &PhysicsConfig,
    ) {
        match drive {
            Drive::Velocity(v) => self.speed = v,
            Drive::Force(f) => {
                let mut f = f + cfg.gravity + self.stored_forces;
                self.stored_forces = DVec2::ZERO;

                // A force into an already-touching side does nothing.
                if f.x < 0.0 && self.contacts.left.is_some()
                    || f.x > 0.0 && self.contacts.right.is_some()
                {
                    f.x = 0.0;
                }
                if f.y < 0.0 && self.contacts.top.is_some()
                    || f.y > 0.0 && self.contacts.bottom.is_some()
                {
                    f.y = 0.0;
                }

                if let Some(ObstacleRef::Ramp(ri)) = self.contacts.bottom {
                    let r = &ramps[ri];
                    if r.ratio > cfg.ramp_slip_threshold {
                        // Too steep to stand on: slide downhill.
                        let dir = if r.left { -1.0 } else { 1.0 };
                        f.x += dir * (r.ratio - cfg.ramp_slip_threshold) * cfg.ramp_slip_force
                            / cfg.ramp_slip_threshold;
                    } else if f.x > 0.0 && r.left || f.x < 0.0 && !r.left {
                        // Climbing: reduced traction.
                        f.x *= r.factor;
                    }
                }

                self.speed += f / self.mass;
            }
        }

        if self.speed.x.abs() < cfg.min_speed.x {
            self.speed.x = 0.0;
        }
        if self.speed.y.abs() < cfg.min_speed.y {
            self.speed.y = 0.0;
        }
        if self.speed.x.abs() > self.max_speed.x {
            self.speed.x = self.speed.x.signum() * self.max_speed.x;
        }
        if self.speed.y.abs() > self.max_speed.y {
            self.speed.y = self.speed.y.signum() * self.max_speed.y;
        }
        self.prev_speed = self.speed;

        // Broad phase over the swept bounds.
        let sweep = self.bounds().swept(self.speed);
        let coll: Vec<Obstacle> = obstacles
            .iter()
            .filter(|o| sweep.intersects(&o.rect))
            .copied()
            .collect();
        for r in ramps {
            r.check_can_collide(&sweep);
        }

        if !coll.is_empty() {
            let up = self.speed.y < 0.0;
            let rt = self.speed.x > 0.0;
            let dn = self.speed.y > 0.0;
            let lf = self.speed.x < 0.0;

            if self.speed.x == 0.0 || self.speed.y == 0.0 {
                self.resolve_orthogonal(&coll, up, rt, dn, lf);
            } else {
                self.resolve_diagonal(&coll, up, rt, dn, lf);
            }
        }

        self.pos += self.speed;

        for (i, r) in ramps.iter().enumerate() {
            r.resolve(i, self);
        }
        self.check_contact(obstacles, ramps, cfg);
    }

    /// Straight-line motion toward a point (snapping exactly onto it per
    /// axis) or along a fixed angle. Not obstacle-aware.
    pub fn move_free(&mut self, aim: Aim, speed: f64) {
        match aim {
            Aim::Point(p) => {
                let d = p - self.pos;
                let distance = d.length();
                if distance == 0.0 {
                    self.speed = DVec2::ZERO;
                    return;
                }
                self.speed = d * speed / distance;

                if self.speed.x < 0.0 && self.pos.x + self.speed.x <= p.x
                    || self.speed.x >= 0.0 && self.pos.x + self.speed.x >= p.x
                {
                    self.pos.x = p.x;
                    self.speed.x = 0.0;
                } else {
                    self.pos.x += self.speed.x;
                }

                if self.speed.y < 0.0 && self.pos.y + self.speed.y <= p.y
                    || self.speed.y >= 0.0 && self.pos.y + self.speed.y >= p.y
                {
                    self.pos.y = p.y;
                    self.speed.y = 0.0;
                } else {
                    self.pos.y += self.speed.y;
                }
            }
            Aim::Angle(degrees) => {
                let rads = degrees.to_radians();
                self.speed = DVec2::new(speed * rads.cos(), speed * rads.sin());
                self.pos += self.speed;
            }
        }
    }

    fn resolve_orthogonal(&mut self, coll: &[Obstacle], up: bool, rt: bool, dn: bool, lf: bool) {
        if rt {
            let lim = self.find_right_limit(coll);
            if self.pos.x + self.size.x + self.speed.x > lim {
                self.pos.x = lim - self.size.x;
                self.speed.x = 0.0;
            }
        } else if lf {
            let lim = self.find_left_limit(coll);
            if self.pos.x + self.speed.x < lim {
                self.pos.x = lim;
                self.speed.x = 0.0;
            }
        } else if dn {
            let lim = self.find_down_limit(coll);
            if self.pos.y + self.size.y + self.speed.y > lim {
                self.pos.y = lim - self.size.y;
                self.speed.y = 0.0;
            }
        } else if up {
            let lim = self.find_up_limit(coll);
            if self.pos.y + self.speed.y < lim {
                self.pos.y = lim;
                self.speed.y = 0.0;
            }
        }
    }

    fn resolve_diagonal(&mut self, coll: &[Obstacle], up: bool, rt: bool, dn: bool, lf: bool) {
        let x_aim = self.pos.x + self.speed.x + if rt { self.size.x } else { 0.0 };
        let y_aim = self.pos.y + self.speed.y + if dn { self.size.y } else { 0.0 };
        let mut x_def: (f64, Option<Rect>) = (x_aim, None);
        let mut y_def: (f64, Option<Rect>) = (y_aim, None);
        for c in coll {
            self.find_limits(c, x_aim, y_aim, &mut x_def, &mut y_def, up, rt, dn, lf);
        }

        if x_def.0 != x_aim && y_def.0 != y_aim {
            // Both axes constrained: stop on the axis hit first, move fully
            // along the other unless stopping still overlaps its limiter.
            let x_time =
                (x_def.0 - self.pos.x - if lf { 0.0 } else { self.size.x }) / self.speed.x;
            let y_time =
                (y_def.0 - self.pos.y - if up { 0.0 } else { self.size.y }) / self.speed.y;
            if x_time < y_time {
                self.stop_at_x(x_def.0, lf);
                let sweep = Rect::new(
                    self.pos.x,
                    if up { self.pos.y + self.speed.y } else { self.pos.y },
                    self.size.x,
                    self.size.y + self.speed.y.abs(),
                );
                if let Some(r) = y_def.1 {
                    if sweep.intersects(&r) {
                        self.stop_at_y(y_def.0, up);
                    }
                }
            } else {
                self.stop_at_y(y_def.0, up);
                let sweep = Rect::new(
                    if lf { self.pos.x + self.speed.x } else { self.pos.x },
                    self.pos.y,
                    self.size.x + self.speed.x.abs(),
                    self.size.y,
                );
                if let Some(r) = x_def.1 {
                    if sweep.intersects(&r) {
                        self.stop_at_x(x_def.0, lf);
                    }
                }
            }
        } else if x_def.0 != x_aim {
            self.stop_at_x(x_def.0, lf);
        } else if y_def.0 != y_aim {
            self.stop_at_y(y_def.0, up);
        }
    }

    /// Per-obstacle limit candidates for diagonal motion. A passable
    /// obstacle can only constrain downward motion, and only if the mover's
    /// bottom edge is not already past its top; a definite limit on one
    /// axis rules the obstacle out on the other.
    #[allow(clippy::too_many_arguments)]
    fn find_limits(
        &self,
        c: &Obstacle,
        x_aim: f64,
        y_aim: f64,
        x_def: &mut (f64, Option<Rect>),
        y_def: &mut (f64, Option<Rect>),
        up: bool,
        rt: bool,
        dn: bool,
        lf: bool,
    ) {
        let r = c.rect;
        let x_lim = if c.passable {
            x_aim
        } else if rt {
            r.x
        } else {
            r.x + r.w
        };
        let y_lim = if dn {
            r.y
        } else if c.passable {
            y_aim
        } else {
            r.y + r.h
        };

        let x_v = x_def.0;
        let y_v = y_def.0;
        if c.passable {
            if dn && self.pos.y + self.size.y <= y_lim && y_lim < y_v {
                *y_def = (y_lim, Some(r));
            }
        } else if rt && self.pos.x + self.size.x > x_lim || lf && self.pos.x < x_lim {
            // Already past its x edge; it can only limit y.
            if dn && y_lim < y_v || up && y_lim > y_v {
                *y_def = (y_lim, Some(r));
            }
        } else if dn && self.pos.y + self.size.y > y_lim || up && self.pos.y < y_lim {
            // Already past its y edge; it can only limit x.
            if rt && x_lim < x_v || lf && x_lim > x_v {
                *x_def = (x_lim, Some(r));
            }
        } else {
            // Reachable on both axes: the later-reached edge decides.
            let x_time = (x_lim - self.pos.x - if lf { 0.0 } else { self.size.x }) / self.speed.x;
            let y_time = (y_lim - self.pos.y - if up { 0.0 } else { self.size.y }) / self.speed.y;
            if x_time > y_time {
                if rt && x_lim < x_v || lf && x_lim > x_v {
                    *x_def = (x_lim, Some(r));
                }
            } else if dn && y_lim < y_v || up && y_lim > y_v {
                *y_def = (y_lim, Some(r));
            }
        }
    }

    fn stop_at_x(&mut self, x: f64, moving_left: bool) {
        self.speed.x = 0.0;
        self.pos.x = if moving_left { x } else { x - self.size.x };
    }

    fn stop_at_y(&mut self, y: f64, moving_up: bool) {
        self.speed.y = 0.0;
        self.pos.y = if moving_up { y } else { y - self.size.y };
    }

    fn find_right_limit(&self, coll: &[Obstacle]) -> f64 {
        let mut limit = self.pos.x + self.size.x + self.speed.x;
        for c in coll {
            if !c.passable && c.rect.x < limit {
                limit = c.rect.x;
            }
        }
        limit
    }

    fn find_left_limit(&self, coll: &[Obstacle]) -> f64 {
        let mut limit = self.pos.x + self.speed.x;
        for c in coll {
            if !c.passable && c.rect.x + c.rect.w > limit {
                limit = c.rect.x + c.rect.w;
            }
        }
        limit
    }

    fn find_down_limit(&self, coll: &[Obstacle]) -> f64 {
        let mut limit = self.pos.y + self.size.y + self.speed.y;
        for c in coll {
            // A passable top edge only blocks if approached from above.
            if c.rect.y < limit && (!c.passable || c.rect.y >= self.pos.y + self.size.y) {
                limit = c.rect.y;
            }
        }
        limit
    }

    fn find_up_limit(&self, coll: &[Obstacle]) -> f64 {
        let mut limit = self.pos.y + self.speed.y;
        for c in coll {
            if !c.passable && c.rect.y + c.rect.h > limit {
                limit = c.rect.y + c.rect.h;
            }
        }
        limit
    }

    /// Re-derive the four contact slots from exact edge adjacency, then
    /// fall back to ramps: exact slope contact first, else a snap back onto
    /// the ramp the body rested on last tick (only when moving slowly and
    /// not upward, to avoid flicker near a slope peak).
    fn check_contact(&mut self, obstacles: &[Obstacle], ramps: &[Ramp], cfg: &PhysicsConfig) {
        let prev_bottom = self.contacts.bottom;
        self.contacts = Contacts::default();

        let x2 = self.pos.x + self.size.x;
        let y2 = self.pos.y + self.size.y;
        for o in obstacles {
            let r = o.rect;
            let x2o = r.x + r.w;
            let y2o = r.y + r.h;
            if !o.passable && round6(x2) == round6(r.x) && y2 > r.y && self.pos.y < y2o {
                self.contacts.right = Some(o.id);
            }
            if !o.passable && round6(self.pos.x) == round6(x2o) && y2 > r.y && self.pos.y < y2o {
                self.contacts.left = Some(o.id);
            }
            if round6(y2) == round6(r.y) && x2 > r.x && self.pos.x < x2o {
                self.contacts.bottom = Some(o.id);
            }
            if !o.passable && round6(self.pos.y) == round6(y2o) && x2 > r.x && self.pos.x < x2o {
                self.contacts.top = Some(o.id);
            }
        }

        if self.contacts.bottom.is_none() {
            for (i, r) in ramps.iter().enumerate() {
                if r.contact(&self.bounds()) {
                    self.contacts.bottom = Some(ObstacleRef::Ramp(i));
                    break;
                }
            }
        }
        if self.contacts.bottom.is_none() {
            for (i, r) in ramps.iter().enumerate() {
                if prev_bottom == Some(ObstacleRef::Ramp(i))
                    && self.pos.x + self.size.x > r.x
                    && r.x + r.w > self.pos.x
                    && self.prev_speed.x.abs() <= cfg.ramp_contact_threshold
                    && self.prev_speed.y >= 0.0
                {
                    self.pos.y = r.surface_y(&self.bounds());
                    self.contacts.bottom = Some(ObstacleRef::Ramp(i));
                    break;
                }
            }
        }
    }
}
