//! Breakshot - a pool break simulator
//!
//! Core modules:
//! - `sim`: Deterministic simulation (body logs, contacts, integrator, shot driver)
//! - `settings`: Tunable physics and numerics
//! - `error`: Error taxonomy for shot setup and log invariants
//!
//! Table geometry, rack layouts, rendering and sweep drivers live outside this
//! crate; they feed walls, pockets and seeded bodies in and read trajectory
//! logs back out.

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{SetupFault, SimError, SimResult};
pub use settings::{Precision, Settings};

use glam::DVec2;

/// Physical constants and table defaults (meters, kilograms, seconds)
pub mod consts {
    /// Regulation ball diameter
    pub const BALL_DIAMETER: f64 = 0.05715;
    pub const BALL_RADIUS: f64 = BALL_DIAMETER / 2.0;
    /// Cue ball is slightly heavier than the object balls
    pub const PRIMARY_MASS: f64 = 0.17;
    pub const OBJECT_MASS: f64 = 0.16;

    pub const GRAVITY: f64 = 9.8;
    pub const MU_SLIDING: f64 = 0.2;
    pub const MU_ROLLING: f64 = 0.03;
    /// Above this speed a ball slides rather than rolls
    pub const SLIDING_SPEED: f64 = 2.0;

    pub const BALL_RESTITUTION: f64 = 0.95;
    pub const WALL_RESTITUTION: f64 = 0.6;
    /// Contact band width; smaller is more accurate but recurses deeper
    pub const MAX_OVERLAP: f64 = 0.000005715;
    /// Applied to a pair's separation each time a contact there is resolved
    pub const THRESHOLD_SHRINK: f64 = 0.999;
    /// Added to the ball radius to get a pocket's capture radius
    pub const POCKET_SIZE: f64 = 0.5;

    /// Step length is a quarter of a diameter for the fastest ball
    pub const STEP_DIVISOR: f64 = 4.0;
    pub const MAX_LOOPS: u32 = 150;
    pub const MAX_DEPTH: u32 = 20;

    /// Cue ball starts on the kitchen line
    pub const KITCHEN_LINE_Y: f64 = 0.635;
    /// Head ball of a nine-ball rack
    pub const HEAD_SPOT: (f64, f64) = (0.0, 1.98);
}

/// Angle of a vector from the +x axis, in [0, 2π)
///
/// The zero vector has no direction; it maps to 1 radian. Callers only use
/// the angle multiplied by the vector's magnitude, so the value is immaterial.
pub fn calc_theta(v: DVec2) -> f64 {
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    if v.x == 0.0 && v.y == 0.0 {
        1.0
    } else if v.x > 0.0 {
        let theta = (v.y / v.x).atan();
        if theta < 0.0 { theta + TAU } else { theta }
    } else if v.x < 0.0 {
        (v.y / v.x).atan() + PI
    } else if v.y > 0.0 {
        FRAC_PI_2
    } else {
        FRAC_PI_2 + PI
    }
}

/// Unit direction for an angle in radians
#[inline]
pub fn direction(theta: f64) -> DVec2 {
    DVec2::new(theta.cos(), theta.sin())
}
