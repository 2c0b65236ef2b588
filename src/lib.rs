//! mapstep - tick-based simulation for tile-grid 2D worlds
//!
//! Core modules:
//! - `sim`: Deterministic map simulation (geometry, collision, object model,
//!   map container, mechanic dispatcher)
//! - `mechanics`: Built-in movement mechanics and the push resolver
//! - `settings`: Runtime configuration
//! - `error`: Typed errors surfaced to the owning simulation

pub mod error;
pub mod mechanics;
pub mod settings;
pub mod sim;

pub use error::{SimError, SimResult};
pub use settings::{Settings, StepPolicy};

use glam::Vec2;

/// Simulation tuning constants
pub mod consts {
    /// Default ticks per second
    pub const DEFAULT_TICKS_PER_SECOND: u32 = 30;

    /// Handler priority when none is given (lower runs first)
    pub const DEFAULT_PRIORITY: i32 = 50;

    /// A linear mover closer than this to its destination has arrived (pixels)
    pub const ARRIVAL_EPSILON: f32 = 0.01;
    /// Smallest step a blocked linear mover keeps retrying with (pixels)
    pub const MIN_STEP: f32 = 0.01;
    /// Step shrink factor applied after each blocked linear attempt
    pub const STEP_SHRINK: f32 = 0.9;

    /// Movers displaced further than this in one check are teleporting, not walking
    pub const PUSH_MAX_DISTANCE: f32 = 50.0;
    /// Clearance left between a mover and the pushable it shoved
    pub const PUSH_GAP: f32 = 0.0001;

    /// Object type consulted by the player-move-check toggle
    pub const PLAYER_TYPE: &str = "player";
    /// Object type handled by the push resolver
    pub const PUSHABLE_TYPE: &str = "pushable";
}

/// Normalize angle to [0, 2π)
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::TAU;
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if a >= TAU { 0.0 } else { a }
}

/// Point at `dist` from `origin` along heading `angle`
#[inline]
pub fn project(origin: Vec2, angle: f32, dist: f32) -> Vec2 {
    origin + Vec2::new(angle.cos(), angle.sin()) * dist
}
