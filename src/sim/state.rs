//! Body state and trajectory logs
//!
//! Every body owns an append-only log of `(t, position, velocity)` samples.
//! The log is both the live simulation state (the latest sample) and the
//! output of a shot (the whole sequence).

use std::ops::{Index, IndexMut};

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{SimError, SimResult};

/// One recorded state of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    /// `None` once the body has been captured by a pocket
    pub pos: Option<DVec2>,
    pub vel: DVec2,
}

impl Sample {
    pub fn at_rest(pos: DVec2) -> Self {
        Self {
            t: 0.0,
            pos: Some(pos),
            vel: DVec2::ZERO,
        }
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.vel.length()
    }
}

/// Append-only trajectory of a single body
///
/// Never empty: the first sample is the seed placed by the rack provider.
/// Times are non-decreasing; several samples may share a time when a contact
/// is resolved in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyStateLog {
    samples: Vec<Sample>,
}

impl BodyStateLog {
    pub fn new(seed: Sample) -> Self {
        Self {
            samples: vec![seed],
        }
    }

    /// Append a sample; time must not run backwards
    pub fn append(&mut self, sample: Sample) -> SimResult<()> {
        let last = self.current().t;
        if sample.t < last {
            return Err(SimError::InvariantViolation { t: sample.t, last });
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Drop the most recent sample
    ///
    /// Only meaningful for a sample that has not been resolved against yet;
    /// the integrator uses this to back off an overshooting step.
    pub fn rollback(&mut self) -> SimResult<Sample> {
        if self.samples.len() <= 1 {
            return Err(SimError::EmptyLog);
        }
        self.samples.pop().ok_or(SimError::EmptyLog)
    }

    /// Latest sample
    #[inline]
    pub fn current(&self) -> &Sample {
        // Constructor guarantees one sample and rollback never removes it
        &self.samples[self.samples.len() - 1]
    }

    #[inline]
    pub fn current_speed(&self) -> f64 {
        self.current().speed()
    }

    /// Record a new position/velocity at the current time (contact response)
    pub(crate) fn record_in_place(&mut self, pos: Option<DVec2>, vel: DVec2) {
        let t = self.current().t;
        self.samples.push(Sample { t, pos, vel });
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn seed(&self) -> &Sample {
        &self.samples[0]
    }

    /// Replace the seed's position and velocity (shot setup)
    pub(crate) fn overwrite_seed(&mut self, pos: DVec2, vel: DVec2) {
        let seed = &mut self.samples[0];
        seed.pos = Some(pos);
        seed.vel = vel;
    }

    /// Forget everything after the seed
    pub fn reset_to_seed(&mut self) {
        self.samples.truncate(1);
    }
}

/// Stable handle of a body inside a [`BodySet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl BodyId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A ball on the table
#[derive(Debug, Clone, Serialize)]
pub struct Body {
    pub id: BodyId,
    pub radius: f64,
    pub mass: f64,
    /// The cue ball: its state is set directly by a shot
    pub primary: bool,
    pub log: BodyStateLog,
}

impl Body {
    pub fn new(id: BodyId, radius: f64, mass: f64, primary: bool, pos: DVec2) -> Self {
        Self {
            id,
            radius,
            mass,
            primary,
            log: BodyStateLog::new(Sample::at_rest(pos)),
        }
    }

    #[inline]
    pub fn diameter(&self) -> f64 {
        self.radius * 2.0
    }

    #[inline]
    pub fn current(&self) -> &Sample {
        self.log.current()
    }

    #[inline]
    pub fn position(&self) -> Option<DVec2> {
        self.log.current().pos
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.log.current_speed()
    }

    /// Not yet captured by a pocket
    #[inline]
    pub fn is_active(&self) -> bool {
        self.log.current().pos.is_some()
    }

    /// Terminal sample: no position, no velocity
    pub(crate) fn capture(&mut self) {
        self.log.record_in_place(None, DVec2::ZERO);
    }
}

/// Arena owning every body of a table, indexed by [`BodyId`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct BodySet {
    bodies: Vec<Body>,
}

impl BodySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regulation cue ball at rest
    pub fn add_primary(&mut self, pos: DVec2) -> BodyId {
        self.add(BALL_RADIUS, PRIMARY_MASS, true, pos)
    }

    /// Add a regulation object ball at rest
    pub fn add_object(&mut self, pos: DVec2) -> BodyId {
        self.add(BALL_RADIUS, OBJECT_MASS, false, pos)
    }

    pub fn add(&mut self, radius: f64, mass: f64, primary: bool, pos: DVec2) -> BodyId {
        let id = BodyId(self.bodies.len() as u32);
        self.bodies.push(Body::new(id, radius, mass, primary, pos));
        id
    }

    pub fn get(&self, id: BodyId) -> SimResult<&Body> {
        self.bodies.get(id.index()).ok_or(SimError::UnknownBody(id))
    }

    pub fn get_mut(&mut self, id: BodyId) -> SimResult<&mut Body> {
        self.bodies.get_mut(id.index()).ok_or(SimError::UnknownBody(id))
    }

    /// Two distinct bodies mutably; `a != b`
    pub(crate) fn pair_mut(&mut self, a: BodyId, b: BodyId) -> (&mut Body, &mut Body) {
        let (i, j) = (a.index(), b.index());
        if i < j {
            let (lo, hi) = self.bodies.split_at_mut(j);
            (&mut lo[i], &mut hi[0])
        } else {
            let (lo, hi) = self.bodies.split_at_mut(i);
            (&mut hi[0], &mut lo[j])
        }
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.bodies.iter_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies.iter().map(|b| b.id)
    }
}

impl Index<BodyId> for BodySet {
    type Output = Body;

    fn index(&self, id: BodyId) -> &Body {
        &self.bodies[id.index()]
    }
}

impl IndexMut<BodyId> for BodySet {
    fn index_mut(&mut self, id: BodyId) -> &mut Body {
        &mut self.bodies[id.index()]
    }
}
