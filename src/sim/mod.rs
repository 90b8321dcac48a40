//! Deterministic simulation module
//!
//! Everything that moves balls lives here. The module is pure and
//! deterministic:
//! - No randomness
//! - Stable iteration order (by body ID)
//! - Single-threaded; one table per shot, never shared

pub mod collision;
pub mod geometry;
pub mod integrator;
pub mod shot;
pub mod state;

pub use collision::{ContactOutcome, ContactResolver, ContactThresholds, ball_response, wall_response};
pub use geometry::{Pocket, TableGeometry, WallOrientation, WallPolygon, WallSegment};
pub use integrator::{Advance, Integrator, friction_accel};
pub use shot::{CuePlacement, Shot, ShotPhase, ShotReport, Table};
pub use state::{Body, BodyId, BodySet, BodyStateLog, Sample};
