//! Deterministic simulation module
//!
//! All movement logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only (one `step`/`move_*` call per entity per tick)
//! - Stable iteration order (obstacle and body vectors, index handles)
//! - No rendering or platform dependencies

pub mod body;
pub mod geom;
pub mod obstacle;
pub mod world;

pub use body::{Aim, Body, Drive};
pub use geom::{rotate, Rect};
pub use obstacle::{Block, Obstacle, ObstacleRef, Ramp};
pub use world::{CarryMotion, World};
