//! Physics constants and tuning
//!
//! One `PhysicsConfig` is built at startup and passed by reference into
//! every movement call. There is no global state.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// How a body resolves pushing an adjacent pushable body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PushPolicy {
    /// Push only the body currently in the left/right contact slot.
    /// The pushed body may in turn push its own neighbor.
    #[default]
    SingleHop,
    /// Scan for every body flush against the leading edge and push each,
    /// refusing entirely if a static block is flush in the chain.
    Chain,
}

/// Physics constants consumed by the movement engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Constant acceleration applied to every force-driven step (y points down).
    pub gravity: DVec2,
    /// Speed components below these magnitudes snap to exactly 0.
    pub min_speed: DVec2,
    /// Max |horizontal speed| at which a body that was resting on a ramp
    /// last tick is snapped back onto its surface instead of going airborne.
    pub ramp_contact_threshold: f64,
    /// Slope ratio (h/w) above which a body slides down a ramp.
    pub ramp_slip_threshold: f64,
    /// Magnitude scale of the slide force on over-threshold ramps.
    pub ramp_slip_force: f64,
    /// Pushing resolution policy.
    pub push_policy: PushPolicy,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: DVec2::new(0.0, 1.0),
            min_speed: DVec2::new(0.01, 0.01),
            ramp_contact_threshold: 4.0,
            ramp_slip_threshold: 1.0,
            ramp_slip_force: 1.0,
            push_policy: PushPolicy::SingleHop,
        }
    }
}

impl PhysicsConfig {
    /// Load from a JSON file, falling back to defaults if the file is
    /// missing or malformed.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(cfg) => {
                    log::info!("Loaded physics config from {path}");
                    cfg
                }
                Err(e) => {
                    log::warn!("Bad physics config in {path}: {e}; using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No physics config at {path}; using defaults");
                Self::default()
            }
        }
    }

    /// Copy with gravity zeroed, used while re-colliding carried passengers.
    pub fn without_gravity(&self) -> Self {
        Self {
            gravity: DVec2::ZERO,
            ..self.clone()
        }
    }
}
