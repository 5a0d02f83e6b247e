//! Headless demo driver
//!
//! Builds a small stage (floor, walls, a ramp, a one-way ledge, a patrol
//! platform and a pushable mark), then runs the simulation for a fixed
//! number of ticks, steering the character through a scripted walk so every
//! interaction fires at least once. State is logged periodically; run with
//! `RUST_LOG=debug` for per-tick detail.

use glam::DVec2;
use tilepush::{Block, Body, Drive, PhysicsConfig, Ramp, World};

const TICKS: u32 = 600;
const WALK_FORCE: f64 = 0.6;
const JUMP_FORCE: f64 = -12.0;

fn build_stage() -> World {
    let mut world = World::new();

    // Bounds: floor, ceiling, side walls.
    world.add_block(Block::new(0.0, 368.0, 640.0, 32.0, false));
    world.add_block(Block::new(0.0, 0.0, 640.0, 16.0, false));
    world.add_block(Block::new(0.0, 16.0, 16.0, 352.0, false));
    world.add_block(Block::new(624.0, 16.0, 16.0, 352.0, false));

    // One-way ledge, landable from above, jump-through from below.
    world.add_block(Block::new(96.0, 288.0, 96.0, 8.0, true));

    // Ramp up to a landing on the right side.
    world.add_ramp(Ramp::new(400.0, 304.0, 64.0, 64.0, true, false));
    world.add_block(Block::new(464.0, 304.0, 160.0, 64.0, false));

    // 0: character, 1: pushable mark, 2: patrol platform.
    world.add_body(Body::new(48.0, 336.0, 24.0, 32.0).with_max_speed(DVec2::new(6.0, 15.0)));
    world.add_body(Body::new(240.0, 336.0, 32.0, 32.0).with_mass(2.0).pushable());
    world.add_body(Body::new(200.0, 240.0, 64.0, 8.0));
    world
}

/// Scripted input for one tick: walk right, hop at the ledge, ride the
/// ramp, turn around.
fn steer(tick: u32, character: &Body) -> DVec2 {
    let mut f = DVec2::ZERO;
    if tick < 420 {
        f.x = WALK_FORCE;
    } else {
        f.x = -WALK_FORCE;
    }
    let grounded = character.contacts.bottom.is_some();
    if grounded && (tick == 60 || tick == 300) {
        f.y = JUMP_FORCE;
    }
    f
}

fn main() {
    env_logger::init();
    let cfg = PhysicsConfig::load("physics.json");
    let mut world = build_stage();
    let patrol = [DVec2::new(200.0, 240.0), DVec2::new(200.0, 120.0)];

    log::info!(
        "stage ready: {} blocks, {} ramps, {} bodies",
        world.blocks.len(),
        world.ramps.len(),
        world.bodies.len()
    );

    for tick in 0..TICKS {
        let forces = steer(tick, &world.bodies[0]);
        world.move_pushing(0, Drive::Force(forces), &cfg);
        world.move_body(1, Drive::Force(DVec2::ZERO), &cfg);
        world.cycle(2, &patrol, 2.0, &[0, 1], &[], true, 30, &cfg);

        log::debug!(
            "tick {tick}: character {:?} speed {:?}",
            world.bodies[0].pos,
            world.bodies[0].speed
        );
        if tick % 60 == 0 {
            log::info!(
                "tick {tick}: character at {:.1},{:.1}  mark at {:.1},{:.1}  platform at {:.1},{:.1}",
                world.bodies[0].pos.x,
                world.bodies[0].pos.y,
                world.bodies[1].pos.x,
                world.bodies[1].pos.y,
                world.bodies[2].pos.x,
                world.bodies[2].pos.y
            );
        }
    }

    log::info!(
        "done after {TICKS} ticks: character rests at {:.1},{:.1}",
        world.bodies[0].pos.x,
        world.bodies[0].pos.y
    );
}
