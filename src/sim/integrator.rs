//! Adaptive-step integrator
//!
//! Advances every active ball with explicit Euler under sliding/rolling
//! friction. The nominal step moves the fastest ball a fraction of its
//! diameter. When a step overshoots into a contact, the step is rolled back
//! and retried at half size, recursively, until the contact lands inside the
//! tolerance band.

use glam::DVec2;

use super::collision::{ContactOutcome, ContactResolver};
use super::geometry::TableGeometry;
use super::state::{Body, BodyId, BodySet, Sample};
use crate::error::SimResult;
use crate::settings::Settings;

/// How an integrator call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Nothing moves, or the refinement depth limit was hit
    AllStationary,
    /// A contact was resolved or a ball was captured
    ImpactResolved,
    /// Step budget ran out without an event; re-derive the step and go again
    Timeout,
}

/// Friction deceleration for a ball moving at `vel`
pub fn friction_accel(vel: DVec2, settings: &Settings) -> DVec2 {
    let speed = vel.length();
    if speed == 0.0 {
        return DVec2::ZERO;
    }
    let mu = settings.friction_for(speed);
    -vel / speed * (mu * settings.gravity)
}

#[inline]
fn crosses_zero(before: f64, after: f64) -> bool {
    (before > 0.0 && after < 0.0) || (before < 0.0 && after > 0.0)
}

/// One explicit Euler step, appended to the body's log
fn step_body(body: &mut Body, dt: f64, settings: &Settings) -> SimResult<()> {
    let sample = *body.current();
    let Some(pos) = sample.pos else {
        return Ok(());
    };

    let mut vel = sample.vel + friction_accel(sample.vel, settings) * dt;
    // Friction only decelerates; a component past zero is Euler overshoot
    if crosses_zero(sample.vel.x, vel.x) {
        vel.x = 0.0;
    }
    if crosses_zero(sample.vel.y, vel.y) {
        vel.y = 0.0;
    }

    body.log.append(Sample {
        t: sample.t + dt,
        pos: Some(pos + sample.vel * dt),
        vel,
    })
}

/// Adaptive integrator with recursive contact refinement
#[derive(Debug, Clone)]
pub struct Integrator {
    settings: Settings,
}

impl Integrator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Step size that moves the fastest ball `diameter / step_divisor`
    ///
    /// `None` when nothing moves.
    pub fn nominal_step(&self, bodies: &BodySet, active: &[BodyId]) -> Option<f64> {
        let mut fastest: Option<&Body> = None;
        for &id in active {
            let body = &bodies[id];
            if fastest.is_none_or(|f| body.speed() >= f.speed()) {
                fastest = Some(body);
            }
        }
        let fastest = fastest?;
        let speed = fastest.speed();
        if speed == 0.0 {
            return None;
        }
        Some(fastest.diameter() / (self.settings.step_divisor * speed))
    }

    /// Integrate until a contact is resolved, everything stops, or the step
    /// budget runs out
    pub fn advance_until_event(
        &self,
        bodies: &mut BodySet,
        active: &[BodyId],
        resolver: &mut ContactResolver,
        geometry: &TableGeometry,
    ) -> SimResult<Advance> {
        let active: Vec<BodyId> = active
            .iter()
            .copied()
            .filter(|&id| bodies[id].is_active())
            .collect();
        self.advance(bodies, &active, resolver, geometry, None, 0)
    }

    fn advance(
        &self,
        bodies: &mut BodySet,
        active: &[BodyId],
        resolver: &mut ContactResolver,
        geometry: &TableGeometry,
        step_override: Option<f64>,
        depth: u32,
    ) -> SimResult<Advance> {
        if active.is_empty() {
            return Ok(Advance::AllStationary);
        }

        let step = match step_override {
            Some(step) => step,
            None => match self.nominal_step(bodies, active) {
                Some(step) => step,
                // Last moving ball was just captured
                None => return Ok(Advance::AllStationary),
            },
        };
        log::trace!("advance: step={step:.3e} depth={depth}");

        let mut loops = 0u32;
        loop {
            for &id in active {
                step_body(&mut bodies[id], step, &self.settings)?;
            }

            match resolver.classify_and_resolve(bodies, active, geometry) {
                ContactOutcome::BodyCaptured | ContactOutcome::ExactContact => {
                    return Ok(Advance::ImpactResolved);
                }
                ContactOutcome::ExcessiveOverlap => {
                    for &id in active {
                        bodies[id].log.rollback()?;
                    }
                    if depth > self.settings.max_depth {
                        log::warn!(
                            "Step refinement exceeded depth {} at step {step:.3e}; stopping shot",
                            self.settings.max_depth
                        );
                        return Ok(Advance::AllStationary);
                    }
                    let refined =
                        self.advance(bodies, active, resolver, geometry, Some(step / 2.0), depth + 1)?;
                    if refined == Advance::AllStationary {
                        return Ok(Advance::AllStationary);
                    }
                    return Ok(Advance::ImpactResolved);
                }
                ContactOutcome::NoContact => {
                    if active.iter().all(|&id| bodies[id].speed() == 0.0) {
                        return Ok(Advance::AllStationary);
                    }
                    if loops > self.settings.max_loops {
                        return Ok(Advance::Timeout);
                    }
                }
            }
            loops += 1;
        }
    }
}
