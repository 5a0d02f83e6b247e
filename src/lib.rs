//! Tilepush - movement and collision core for a tile-based puzzle-platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (bodies, obstacles, ramps, pushing)
//! - `config`: Physics constants, constructed once and passed by reference
//!
//! Rendering, input polling, audio and level parsing are external
//! collaborators: they feed forces in and read positions and contact
//! flags back out. Nothing in here does I/O and every step is a fixed
//! synchronous tick.

pub mod config;
pub mod sim;

pub use config::{PhysicsConfig, PushPolicy};
pub use sim::{Aim, Block, Body, CarryMotion, Drive, Obstacle, ObstacleRef, Ramp, Rect, World};

/// Round to 6 decimal places, the tolerance used for every edge-adjacency
/// comparison in the collision code.
#[inline]
pub fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// Equality within the 6-decimal collision tolerance.
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    round6(a) == round6(b)
}
