//! World arena and cross-body interactions
//!
//! Owns the static geometry and every dynamic body, handing out index
//! handles. Anything that involves more than one body lives here: the
//! pusher extension, platform carrying, waypoint patrol. Per spec'd tick
//! order, callers update one body at a time; obstacle views are flattened
//! fresh for each move so a body never collides with itself.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::body::{Aim, Body, Drive};
use super::geom::Rect;
use super::obstacle::{Block, Obstacle, ObstacleRef, Ramp};
use crate::config::{PhysicsConfig, PushPolicy};
use crate::round6;

/// How a carrying platform is driven for one tick.
#[derive(Debug, Clone, Copy)]
pub enum CarryMotion {
    /// Constant-speed straight line toward a point, snapping on arrival.
    Toward { point: DVec2, speed: f64 },
    /// Force-driven through the normal collision-aware step.
    Forces(DVec2),
}

/// Level geometry plus all dynamic bodies and loose carried props.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    pub blocks: Vec<Block>,
    pub ramps: Vec<Ramp>,
    pub bodies: Vec<Body>,
    /// Plain carried rectangles (decor riding platforms); not obstacles.
    pub props: Vec<Rect>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, block: Block) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    pub fn add_ramp(&mut self, ramp: Ramp) -> usize {
        self.ramps.push(ramp);
        self.ramps.len() - 1
    }

    pub fn add_body(&mut self, body: Body) -> usize {
        self.bodies.push(body);
        self.bodies.len() - 1
    }

    /// Flatten blocks and bodies into broad-phase views, excluding the
    /// moving body itself.
    pub fn obstacle_views(&self, exclude: Option<usize>) -> Vec<Obstacle> {
        let mut views = Vec::with_capacity(self.blocks.len() + self.bodies.len());
        for (k, b) in self.blocks.iter().enumerate() {
            views.push(Obstacle {
                id: ObstacleRef::Block(k),
                rect: b.rect,
                passable: b.passable,
            });
        }
        for (j, b) in self.bodies.iter().enumerate() {
            if Some(j) != exclude {
                views.push(Obstacle {
                    id: ObstacleRef::Body(j),
                    rect: b.bounds(),
                    passable: b.passable,
                });
            }
        }
        views
    }

    /// One collision-aware step for body `i` against the whole world.
    pub fn move_body(&mut self, i: usize, drive: Drive, cfg: &PhysicsConfig) {
        let obstacles = self.obstacle_views(Some(i));
        self.bodies[i].step(drive, &obstacles, &self.ramps, cfg);
    }

    /// Step body `i`, shoving adjacent pushable bodies out of the way when
    /// blocked horizontally. Resolves against blocks and bodies only.
    pub fn move_pushing(&mut self, i: usize, drive: Drive, cfg: &PhysicsConfig) {
        match cfg.push_policy {
            PushPolicy::SingleHop => self.move_pushing_single(i, drive, cfg),
            PushPolicy::Chain => {
                let mut visited = vec![i];
                self.move_pushing_chain(i, drive, cfg, &mut visited);
            }
        }
    }

    /// Displace body `j` horizontally by up to `delta_x`, returning the
    /// x-speed it reached. Only its position is kept; its speed is restored
    /// so the shove does not fling it.
    pub fn push(&mut self, j: usize, delta_x: f64, cfg: &PhysicsConfig) -> f64 {
        let prev_speed = self.bodies[j].speed;
        self.move_pushing(j, Drive::Velocity(DVec2::new(delta_x, 0.0)), cfg);
        let reached = self.bodies[j].speed.x;
        self.bodies[j].speed = prev_speed;
        reached
    }

    /// The horizontal speed the drive asks for, before any collision clamp.
    fn push_delta(&self, i: usize, drive: Drive) -> f64 {
        match drive {
            Drive::Velocity(v) => v.x,
            Drive::Force(f) => self.bodies[i].speed.x + f.x / self.bodies[i].mass,
        }
    }

    fn move_pushing_single(&mut self, i: usize, drive: Drive, cfg: &PhysicsConfig) {
        let delta_x = self.push_delta(i, drive);
        let obstacles = self.obstacle_views(Some(i));
        self.bodies[i].step(drive, &obstacles, &[], cfg);

        if delta_x > 0.0 {
            if let Some(ObstacleRef::Body(j)) = self.bodies[i].contacts.right {
                if self.bodies[j].pushable {
                    let reach = self.bodies[i].pos.x + self.bodies[i].size.x + delta_x;
                    let reached = self.push(j, reach - self.bodies[j].pos.x, cfg);
                    self.bodies[i].pos.x = self.bodies[j].pos.x - self.bodies[i].size.x;
                    if reached > 0.0 {
                        self.bodies[i].speed.x = delta_x;
                    }
                }
            }
        } else if delta_x < 0.0 {
            if let Some(ObstacleRef::Body(j)) = self.bodies[i].contacts.left {
                if self.bodies[j].pushable {
                    let reach = self.bodies[i].pos.x + delta_x;
                    let far = self.bodies[j].pos.x + self.bodies[j].size.x;
                    let reached = self.push(j, reach - far, cfg);
                    self.bodies[i].pos.x = self.bodies[j].pos.x + self.bodies[j].size.x;
                    if reached < 0.0 {
                        self.bodies[i].speed.x = delta_x;
                    }
                }
            }
        }
    }

    fn move_pushing_chain(
        &mut self,
        i: usize,
        drive: Drive,
        cfg: &PhysicsConfig,
        visited: &mut Vec<usize>,
    ) {
        let max = self.bodies[i].max_speed.x;
        let delta_x = self.push_delta(i, drive).clamp(-max, max);

        let obstacles = self.obstacle_views(Some(i));
        self.bodies[i].step(drive, &obstacles, &[], cfg);
        if delta_x == 0.0 {
            return;
        }

        let to_right = delta_x > 0.0;
        let flush = self.flush_neighbors(i, to_right);
        // A static block, or a body that cannot be shoved, anywhere flush
        // in the chain refuses the whole push.
        let blocked = flush.iter().any(|r| match *r {
            ObstacleRef::Block(_) => true,
            ObstacleRef::Body(j) => !self.bodies[j].pushable,
            ObstacleRef::Ramp(_) => true,
        });
        if blocked {
            log::debug!("push refused for body {i}: immovable obstacle flush in chain");
            return;
        }
        let neighbors: Vec<usize> = flush
            .iter()
            .filter_map(|r| match *r {
                ObstacleRef::Body(j) => Some(j),
                _ => None,
            })
            .collect();
        if neighbors.is_empty() {
            return;
        }

        let x = self.bodies[i].pos.x;
        let w = self.bodies[i].size.x;
        let mut new_x = x + delta_x;
        for j in neighbors {
            if !visited.contains(&j) {
                visited.push(j);
                let asked = if to_right {
                    x + w + delta_x - self.bodies[j].pos.x
                } else {
                    x + delta_x - self.bodies[j].pos.x - self.bodies[j].size.x
                };
                let prev_speed = self.bodies[j].speed;
                self.move_pushing_chain(j, Drive::Velocity(DVec2::new(asked, 0.0)), cfg, visited);
                self.bodies[j].speed = prev_speed;
            }
            let clamp = if to_right {
                self.bodies[j].pos.x - w
            } else {
                self.bodies[j].pos.x + self.bodies[j].size.x
            };
            if to_right && clamp < new_x || !to_right && clamp > new_x {
                new_x = clamp;
            }
        }
        if to_right && new_x > x || !to_right && new_x < x {
            self.bodies[i].pos.x = new_x;
            self.bodies[i].speed.x = delta_x;
        }
    }

    /// Everything exactly flush against body `i`'s leading edge with
    /// vertical overlap.
    fn flush_neighbors(&self, i: usize, to_right: bool) -> Vec<ObstacleRef> {
        let b = &self.bodies[i];
        let edge = if to_right {
            b.pos.x + b.size.x
        } else {
            b.pos.x
        };
        self.obstacle_views(Some(i))
            .into_iter()
            .filter(|o| {
                let flush = if to_right {
                    round6(o.rect.x) == round6(edge)
                } else {
                    round6(o.rect.x + o.rect.w) == round6(edge)
                };
                flush && b.pos.y + b.size.y > o.rect.y && o.rect.y + o.rect.h > b.pos.y
            })
            .map(|o| o.id)
            .collect()
    }

    /// Move platform body `i` and rigidly carry whatever rides on its top
    /// surface. Body passengers are re-collided at their new location with
    /// gravity suppressed; plain props are translated directly.
    pub fn move_carrying(
        &mut self,
        i: usize,
        motion: CarryMotion,
        passengers: &[usize],
        props: &[usize],
        ignore_collision: bool,
        cfg: &PhysicsConfig,
    ) {
        let plat = &self.bodies[i];
        let (x_aim, y_aim, toward) = match motion {
            CarryMotion::Toward { point, speed } => {
                let d = point - plat.pos;
                let distance = d.length();
                if distance == 0.0 {
                    self.bodies[i].speed = DVec2::ZERO;
                    return;
                }
                let v = d * speed / distance;
                (plat.pos.x + v.x, plat.pos.y + v.y, Some((point, v)))
            }
            CarryMotion::Forces(f) => (
                plat.pos.x + plat.speed.x + cfg.gravity.x + f.x,
                plat.pos.y + plat.speed.y + cfg.gravity.y + f.y,
                None,
            ),
        };

        // Who is riding: anything whose feet rest exactly on the platform
        // top, or about to land on it while the platform rises.
        let plat_rect = self.bodies[i].bounds();
        let plat_vy = match toward {
            Some((_, v)) => v.y,
            None => self.bodies[i].speed.y,
        };
        let rides = |foot: f64, x0: f64, x1: f64| {
            x1 > plat_rect.x
                && plat_rect.x + plat_rect.w > x0
                && (round6(foot) == round6(plat_rect.y)
                    || plat_vy < 0.0 && foot < plat_rect.y && foot > y_aim)
        };
        let riders: Vec<usize> = passengers
            .iter()
            .copied()
            .filter(|&p| {
                let b = &self.bodies[p];
                rides(b.pos.y + b.size.y, b.pos.x, b.pos.x + b.size.x)
            })
            .collect();
        let prop_riders: Vec<usize> = props
            .iter()
            .copied()
            .filter(|&k| {
                let r = self.props[k];
                rides(r.y + r.h, r.x, r.x + r.w)
            })
            .collect();

        let prev = self.bodies[i].pos;
        match toward {
            Some((point, v)) => {
                self.bodies[i].speed = v;
                let b = &mut self.bodies[i];
                if v.x > 0.0 && x_aim >= point.x || v.x < 0.0 && x_aim <= point.x {
                    b.pos.x = point.x;
                    b.speed.x = 0.0;
                } else {
                    b.pos.x = x_aim;
                }
                if v.y > 0.0 && y_aim >= point.y || v.y < 0.0 && y_aim <= point.y {
                    b.pos.y = point.y;
                    b.speed.y = 0.0;
                } else {
                    b.pos.y = y_aim;
                }
            }
            None => {
                let f = match motion {
                    CarryMotion::Forces(f) => f,
                    CarryMotion::Toward { .. } => unreachable!(),
                };
                if ignore_collision {
                    self.bodies[i].step(Drive::Force(f), &[], &[], cfg);
                } else {
                    let mut obstacles = self.obstacle_views(Some(i));
                    obstacles.retain(|o| match o.id {
                        ObstacleRef::Body(j) => !passengers.contains(&j),
                        _ => true,
                    });
                    self.bodies[i].step(Drive::Force(f), &obstacles, &self.ramps, cfg);
                }
            }
        }
        let delta = self.bodies[i].pos - prev;

        // Passengers re-collide with the world at the platform's pace;
        // their own dynamics are parked and restored around the ride.
        let no_gravity = cfg.without_gravity();
        for p in riders {
            let saved_speed = self.bodies[p].speed;
            let saved_stored = self.bodies[p].stored_forces;
            let saved_bottom = self.bodies[p].contacts.bottom;
            self.bodies[p].speed = DVec2::ZERO;
            self.bodies[p].stored_forces = DVec2::ZERO;
            self.bodies[p].contacts.bottom = None;

            let mut obstacles = self.obstacle_views(Some(p));
            obstacles.retain(|o| match o.id {
                ObstacleRef::Body(j) => j != i && !passengers.contains(&j),
                _ => true,
            });
            let mass = self.bodies[p].mass;
            self.bodies[p].step(
                Drive::Force(delta * mass),
                &obstacles,
                &self.ramps,
                &no_gravity,
            );

            self.bodies[p].speed = saved_speed;
            self.bodies[p].stored_forces = saved_stored;
            self.bodies[p].contacts.bottom = saved_bottom;
        }
        for k in prop_riders {
            self.props[k].x += delta.x;
            self.props[k].y += delta.y;
        }
    }

    /// Patrol body `i` between waypoints, pausing `stop_time` ticks at
    /// each. With `carry` the motion is obstacle-aware and carries
    /// passengers; otherwise it is free point-seeking.
    #[allow(clippy::too_many_arguments)]
    pub fn cycle(
        &mut self,
        i: usize,
        points: &[DVec2],
        speed: f64,
        passengers: &[usize],
        props: &[usize],
        carry: bool,
        stop_time: u32,
        cfg: &PhysicsConfig,
    ) {
        if !self.bodies[i].cycle.waiting {
            let target = points[self.bodies[i].cycle.index];
            if carry {
                self.move_carrying(
                    i,
                    CarryMotion::Toward {
                        point: target,
                        speed,
                    },
                    passengers,
                    props,
                    false,
                    cfg,
                );
            } else {
                self.bodies[i].move_free(Aim::Point(target), speed);
            }
        }
        if self.bodies[i].speed == DVec2::ZERO {
            let st = &mut self.bodies[i].cycle;
            if !st.waiting {
                st.timer = 0;
                st.waiting = true;
            }
            if st.timer >= stop_time {
                st.index = if st.index == points.len() - 1 {
                    0
                } else {
                    st.index + 1
                };
                st.waiting = false;
            } else {
                st.timer += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PhysicsConfig {
        PhysicsConfig::default()
    }

    /// Floor at y=50 spanning the whole test range, pusher at x=0 and a
    /// mark flush against its right side, both 16x16 resting on the floor.
    fn push_setup() -> World {
        let mut w = World::new();
        w.add_block(Block::new(-100.0, 50.0, 400.0, 10.0, false));
        w.add_body(Body::new(0.0, 34.0, 16.0, 16.0)); // 0: pusher
        w.add_body(Body::new(16.0, 34.0, 16.0, 16.0).pushable()); // 1: mark
        w
    }

    fn settle(w: &mut World, cfg: &PhysicsConfig) {
        for _ in 0..3 {
            for i in 0..w.bodies.len() {
                w.move_body(i, Drive::Force(DVec2::ZERO), cfg);
            }
        }
    }

    #[test]
    fn test_push_right_moves_both_flush() {
        let cfg = cfg();
        let mut w = push_setup();
        settle(&mut w, &cfg);
        assert_eq!(w.bodies[0].contacts.right, Some(ObstacleRef::Body(1)));

        w.move_pushing(0, Drive::Force(DVec2::new(2.0, 0.0)), &cfg);
        assert_eq!(w.bodies[1].pos.x, 18.0);
        assert_eq!(w.bodies[0].pos.x, 2.0);
        // Flush, same delta, pusher keeps its speed.
        assert_eq!(w.bodies[0].pos.x + 16.0, w.bodies[1].pos.x);
        assert_eq!(w.bodies[0].speed.x, 2.0);
        // The mark's own speed was restored, not kept.
        assert_eq!(w.bodies[1].speed.x, 0.0);
    }

    #[test]
    fn test_push_against_wall_refused() {
        let cfg = cfg();
        let mut w = push_setup();
        w.add_block(Block::new(32.0, 0.0, 10.0, 60.0, false)); // wall past the mark
        settle(&mut w, &cfg);

        w.move_pushing(0, Drive::Force(DVec2::new(2.0, 0.0)), &cfg);
        assert_eq!(w.bodies[0].pos.x, 0.0);
        assert_eq!(w.bodies[1].pos.x, 16.0);
        assert_eq!(w.bodies[0].speed.x, 0.0);
        assert_eq!(w.bodies[1].speed.x, 0.0);
    }

    #[test]
    fn test_push_left_mirrors() {
        let cfg = cfg();
        let mut w = World::new();
        w.add_block(Block::new(-100.0, 50.0, 400.0, 10.0, false));
        w.add_body(Body::new(16.0, 34.0, 16.0, 16.0)); // 0: pusher
        w.add_body(Body::new(0.0, 34.0, 16.0, 16.0).pushable()); // 1: mark on its left
        settle(&mut w, &cfg);
        assert_eq!(w.bodies[0].contacts.left, Some(ObstacleRef::Body(1)));

        w.move_pushing(0, Drive::Force(DVec2::new(-2.0, 0.0)), &cfg);
        assert_eq!(w.bodies[1].pos.x, -2.0);
        assert_eq!(w.bodies[0].pos.x, 14.0);
        assert_eq!(w.bodies[0].speed.x, -2.0);
    }

    #[test]
    fn test_single_hop_chains_through_marks() {
        let cfg = cfg();
        let mut w = push_setup();
        w.add_body(Body::new(32.0, 34.0, 16.0, 16.0).pushable()); // 2: second mark
        settle(&mut w, &cfg);

        w.move_pushing(0, Drive::Force(DVec2::new(2.0, 0.0)), &cfg);
        // The shove propagates mark-to-mark through contact slots.
        assert_eq!(w.bodies[2].pos.x, 34.0);
        assert_eq!(w.bodies[1].pos.x, 18.0);
        assert_eq!(w.bodies[0].pos.x, 2.0);
    }

    #[test]
    fn test_chain_policy_pushes_row() {
        let cfg = PhysicsConfig {
            push_policy: PushPolicy::Chain,
            ..Default::default()
        };
        let mut w = push_setup();
        w.add_body(Body::new(32.0, 34.0, 16.0, 16.0).pushable()); // 2
        settle(&mut w, &cfg);

        w.move_pushing(0, Drive::Force(DVec2::new(2.0, 0.0)), &cfg);
        assert_eq!(w.bodies[0].pos.x, 2.0);
        assert_eq!(w.bodies[1].pos.x, 18.0);
        assert_eq!(w.bodies[2].pos.x, 34.0);
        assert_eq!(w.bodies[0].speed.x, 2.0);
    }

    #[test]
    fn test_chain_policy_refuses_on_flush_block() {
        let cfg = PhysicsConfig {
            push_policy: PushPolicy::Chain,
            ..Default::default()
        };
        let mut w = push_setup();
        w.add_body(Body::new(32.0, 34.0, 16.0, 16.0).pushable()); // 2
        w.add_block(Block::new(48.0, 0.0, 10.0, 60.0, false)); // wall flush after mark 2
        settle(&mut w, &cfg);

        w.move_pushing(0, Drive::Force(DVec2::new(2.0, 0.0)), &cfg);
        assert_eq!(w.bodies[0].pos.x, 0.0);
        assert_eq!(w.bodies[1].pos.x, 16.0);
        assert_eq!(w.bodies[2].pos.x, 32.0);
        assert_eq!(w.bodies[0].speed.x, 0.0);
    }

    #[test]
    fn test_move_carrying_takes_passenger_along() {
        let cfg = cfg();
        let mut w = World::new();
        let plat = w.add_body(Body::new(0.0, 50.0, 32.0, 8.0));
        let rider = w.add_body(Body::new(8.0, 34.0, 16.0, 16.0));

        let target = DVec2::new(40.0, 50.0);
        for _ in 0..20 {
            w.move_carrying(
                plat,
                CarryMotion::Toward {
                    point: target,
                    speed: 4.0,
                },
                &[rider],
                &[],
                false,
                &cfg,
            );
        }
        assert_eq!(w.bodies[plat].pos, target);
        // Rider stayed planted on the platform top through the whole move.
        assert_eq!(w.bodies[rider].pos.x, 8.0 + 40.0);
        assert_eq!(w.bodies[rider].pos.y + 16.0, w.bodies[plat].pos.y);
    }

    #[test]
    fn test_move_carrying_passenger_recollides() {
        let cfg = cfg();
        let mut w = World::new();
        w.add_block(Block::new(40.0, 0.0, 10.0, 44.0, false)); // wall above floor level
        let plat = w.add_body(Body::new(0.0, 50.0, 32.0, 8.0));
        let rider = w.add_body(Body::new(8.0, 34.0, 16.0, 16.0));

        // Carry rightward; the rider hits the wall and is left behind flush.
        for _ in 0..20 {
            w.move_carrying(
                plat,
                CarryMotion::Toward {
                    point: DVec2::new(60.0, 50.0),
                    speed: 4.0,
                },
                &[rider],
                &[],
                false,
                &cfg,
            );
        }
        assert_eq!(w.bodies[rider].pos.x, 40.0 - 16.0);
    }

    #[test]
    fn test_move_carrying_zero_distance_noop() {
        let cfg = cfg();
        let mut w = World::new();
        let plat = w.add_body(Body::new(10.0, 20.0, 32.0, 8.0));
        w.bodies[plat].speed = DVec2::new(3.0, 0.0);
        w.move_carrying(
            plat,
            CarryMotion::Toward {
                point: DVec2::new(10.0, 20.0),
                speed: 4.0,
            },
            &[],
            &[],
            false,
            &cfg,
        );
        assert_eq!(w.bodies[plat].pos, DVec2::new(10.0, 20.0));
        assert_eq!(w.bodies[plat].speed, DVec2::ZERO);
    }

    #[test]
    fn test_move_carrying_translates_props() {
        let cfg = cfg();
        let mut w = World::new();
        let plat = w.add_body(Body::new(0.0, 50.0, 32.0, 8.0));
        w.props.push(Rect::new(4.0, 42.0, 8.0, 8.0)); // resting on the platform
        w.props.push(Rect::new(200.0, 42.0, 8.0, 8.0)); // elsewhere

        w.move_carrying(
            plat,
            CarryMotion::Toward {
                point: DVec2::new(10.0, 50.0),
                speed: 4.0,
            },
            &[],
            &[0, 1],
            false,
            &cfg,
        );
        assert_eq!(w.props[0].x, 8.0);
        assert_eq!(w.props[1].x, 200.0);
    }

    #[test]
    fn test_cycle_patrols_waypoints() {
        let cfg = cfg();
        let mut w = World::new();
        let i = w.add_body(Body::new(0.0, 0.0, 8.0, 8.0));
        let points = [DVec2::new(10.0, 0.0), DVec2::new(0.0, 0.0)];

        // Out: 2 ticks; wait: 2 ticks (stop_time); advance; back: 2 ticks.
        let mut reached_out = false;
        for _ in 0..16 {
            w.cycle(i, &points, 5.0, &[], &[], false, 2, &cfg);
            if w.bodies[i].pos == points[0] {
                reached_out = true;
            }
        }
        assert!(reached_out);
        assert_eq!(w.bodies[i].pos, DVec2::new(0.0, 0.0));
    }

    #[test]
    fn test_cycle_waits_stop_time() {
        let cfg = cfg();
        let mut w = World::new();
        let i = w.add_body(Body::new(0.0, 0.0, 8.0, 8.0));
        let points = [DVec2::new(10.0, 0.0), DVec2::new(20.0, 0.0)];

        // Arrival on tick 2; with stop_time 3, the body must still be at
        // the first waypoint three ticks later.
        for _ in 0..5 {
            w.cycle(i, &points, 5.0, &[], &[], false, 3, &cfg);
        }
        assert_eq!(w.bodies[i].pos, points[0]);
    }
}
