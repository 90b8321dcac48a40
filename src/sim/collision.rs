//! Contact detection and response
//!
//! Contacts are located by distance bands rather than by moving bodies apart.
//! Each ball pair and each (ball, cushion) pair carries an acceptable
//! separation. A separation within `max_overlap` below it is an exact contact
//! and gets resolved; anything deeper means the last step overshot and the
//! integrator must back off. Resolving a contact shrinks that pair's
//! separation to just under the resolved distance, so the pair reads as
//! untouched immediately afterwards without any position correction.

use glam::DVec2;

use super::geometry::{Pocket, TableGeometry, WallOrientation};
use super::state::{BodyId, BodySet};
use crate::calc_theta;
use crate::settings::Settings;

/// Result of one contact pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    NoContact,
    /// Contacts within tolerance were found and resolved
    ExactContact,
    /// Some pair overlaps too deeply; nothing was resolved
    ExcessiveOverlap,
    /// At least one ball dropped; nothing else was resolved
    BodyCaptured,
}

/// Three-way comparison of a separation against its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Clear,
    Exact,
    Excessive,
}

fn band(distance: f64, threshold: f64, tolerance: f64) -> Band {
    if distance > threshold {
        Band::Clear
    } else if distance > threshold - tolerance {
        Band::Exact
    } else {
        Band::Excessive
    }
}

/// Per-pair acceptable separations for one shot
///
/// Initialized to the sum of radii for ball pairs and to the ball radius for
/// (ball, cushion) pairs. Values only ever shrink.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactThresholds {
    body_count: usize,
    wall_count: usize,
    /// Upper triangle of the body pair matrix, row-major
    pairs: Vec<f64>,
    /// `body_count * wall_count`, row per body
    walls: Vec<f64>,
}

impl ContactThresholds {
    pub fn new(bodies: &BodySet, wall_count: usize) -> Self {
        let body_count = bodies.len();
        let mut pairs = Vec::with_capacity(body_count * body_count.saturating_sub(1) / 2);
        let mut walls = Vec::with_capacity(body_count * wall_count);
        for a in bodies.iter() {
            for b in bodies.iter().skip(a.id.index() + 1) {
                pairs.push(a.radius + b.radius);
            }
            walls.extend(std::iter::repeat_n(a.radius, wall_count));
        }
        Self {
            body_count,
            wall_count,
            pairs,
            walls,
        }
    }

    fn pair_index(&self, a: BodyId, b: BodyId) -> usize {
        let (i, j) = if a < b {
            (a.index(), b.index())
        } else {
            (b.index(), a.index())
        };
        debug_assert!(i != j && j < self.body_count);
        i * self.body_count - i * (i + 1) / 2 + (j - i - 1)
    }

    fn wall_index(&self, body: BodyId, wall: usize) -> usize {
        body.index() * self.wall_count + wall
    }

    pub fn pair(&self, a: BodyId, b: BodyId) -> f64 {
        self.pairs[self.pair_index(a, b)]
    }

    pub fn wall(&self, body: BodyId, wall: usize) -> f64 {
        self.walls[self.wall_index(body, wall)]
    }

    fn shrink_pair(&mut self, a: BodyId, b: BodyId, value: f64) {
        let i = self.pair_index(a, b);
        self.pairs[i] = self.pairs[i].min(value);
    }

    fn shrink_wall(&mut self, body: BodyId, wall: usize, value: f64) {
        let i = self.wall_index(body, wall);
        self.walls[i] = self.walls[i].min(value);
    }
}

/// Cushion bounce. Position is untouched; only velocity changes.
pub fn wall_response(vel: DVec2, orientation: WallOrientation, restitution: f64) -> DVec2 {
    use std::f64::consts::FRAC_PI_4;

    let bounced = match orientation {
        WallOrientation::Horizontal => DVec2::new(vel.x, -vel.y),
        WallOrientation::Vertical => DVec2::new(-vel.x, vel.y),
        WallOrientation::Rising => {
            // Arriving from above or below the diagonal swaps the components
            // the same way.
            let theta = calc_theta(vel);
            let from_above = theta > FRAC_PI_4 && theta < 5.0 * FRAC_PI_4;
            log::trace!("rising cushion hit from {}", if from_above { "above" } else { "below" });
            DVec2::new(vel.y, vel.x)
        }
        WallOrientation::Falling => DVec2::new(-vel.y, -vel.x),
    };
    bounced * restitution
}

/// Ball-ball collision in the frame of the line of centers
///
/// Along-line components exchange as a 1D elastic collision weighted by mass;
/// perpendicular components carry through. Both results are then scaled by
/// `restitution`.
pub fn ball_response(
    (p1, v1, m1): (DVec2, DVec2, f64),
    (p2, v2, m2): (DVec2, DVec2, f64),
    restitution: f64,
) -> (DVec2, DVec2) {
    use std::f64::consts::FRAC_PI_2;

    let (u1, u2) = (v1.length(), v2.length());
    let (theta1, theta2) = (calc_theta(v1), calc_theta(v2));
    let phi = calc_theta(p2 - p1);
    let total = m1 + m2;

    let along = DVec2::new(phi.cos(), phi.sin());
    let across = DVec2::new((phi + FRAC_PI_2).cos(), (phi + FRAC_PI_2).sin());

    let n1 = u1 * (theta1 - phi).cos();
    let n2 = u2 * (theta2 - phi).cos();
    let t1 = u1 * (theta1 - phi).sin();
    let t2 = u2 * (theta2 - phi).sin();

    let n1_after = (n1 * (m1 - m2) + 2.0 * m2 * n2) / total;
    let n2_after = (n2 * (m2 - m1) + 2.0 * m1 * n1) / total;

    let v1_after = along * n1_after + across * t1;
    let v2_after = along * n2_after + across * t2;
    (v1_after * restitution, v2_after * restitution)
}

#[derive(Debug, Clone, Copy)]
struct PairHit {
    a: BodyId,
    b: BodyId,
    distance: f64,
}

#[derive(Debug, Clone, Copy)]
struct WallHit {
    body: BodyId,
    wall: usize,
    distance: f64,
}

/// Contact detector and resolver for one shot
///
/// Owns the threshold state; build a fresh one (or [`reset`](Self::reset))
/// per shot so shrinkage never leaks between shots.
#[derive(Debug, Clone)]
pub struct ContactResolver {
    thresholds: ContactThresholds,
    settings: Settings,
}

impl ContactResolver {
    pub fn new(bodies: &BodySet, geometry: &TableGeometry, settings: &Settings) -> Self {
        Self {
            thresholds: ContactThresholds::new(bodies, geometry.walls.len()),
            settings: settings.clone(),
        }
    }

    /// Re-initialize every threshold to its contact distance
    pub fn reset(&mut self, bodies: &BodySet, geometry: &TableGeometry) {
        self.thresholds = ContactThresholds::new(bodies, geometry.walls.len());
    }

    pub fn thresholds(&self) -> &ContactThresholds {
        &self.thresholds
    }

    /// Classify every contact among `active` bodies and resolve exact ones
    ///
    /// Captures win over everything: if any ball drops, no other contact is
    /// touched this pass. Excessive overlap anywhere defers all resolution to
    /// the caller.
    pub fn classify_and_resolve(
        &mut self,
        bodies: &mut BodySet,
        active: &[BodyId],
        geometry: &TableGeometry,
    ) -> ContactOutcome {
        let live: Vec<(BodyId, DVec2)> = active
            .iter()
            .filter_map(|&id| bodies[id].position().map(|pos| (id, pos)))
            .collect();

        if self.capture_pocketed(bodies, &live, geometry) {
            return ContactOutcome::BodyCaptured;
        }

        let tolerance = self.settings.max_overlap;
        let mut overlap = false;
        let mut pair_hits = Vec::new();
        let mut wall_hits = Vec::new();

        for (k, &(a, pa)) in live.iter().enumerate() {
            for &(b, pb) in &live[k + 1..] {
                let distance = pa.distance(pb);
                match band(distance, self.thresholds.pair(a, b), tolerance) {
                    Band::Clear => {}
                    Band::Exact => pair_hits.push(PairHit { a, b, distance }),
                    Band::Excessive => overlap = true,
                }
            }
        }

        for &(body, pos) in &live {
            for (wall, segment) in geometry.walls.segments().enumerate() {
                let distance = segment.distance_to(pos);
                match band(distance, self.thresholds.wall(body, wall), tolerance) {
                    Band::Clear => {}
                    Band::Exact => wall_hits.push(WallHit { body, wall, distance }),
                    Band::Excessive => overlap = true,
                }
            }
        }

        if overlap {
            return ContactOutcome::ExcessiveOverlap;
        }
        if pair_hits.is_empty() && wall_hits.is_empty() {
            return ContactOutcome::NoContact;
        }

        while let Some(hit) = wall_hits.pop() {
            self.resolve_wall(bodies, geometry, hit);
        }
        while let Some(hit) = pair_hits.pop() {
            self.resolve_pair(bodies, hit);
        }
        ContactOutcome::ExactContact
    }

    fn capture_pocketed(
        &self,
        bodies: &mut BodySet,
        live: &[(BodyId, DVec2)],
        geometry: &TableGeometry,
    ) -> bool {
        let mut captured = false;
        for &(id, pos) in live {
            let capture_radius = Pocket::capture_radius(bodies[id].radius, self.settings.pocket_size);
            if geometry
                .pockets
                .iter()
                .any(|pocket| pos.distance(pocket.center) <= capture_radius)
            {
                log::debug!("Body {id} captured at t={:.6}", bodies[id].current().t);
                bodies[id].capture();
                captured = true;
            }
        }
        captured
    }

    fn resolve_wall(&mut self, bodies: &mut BodySet, geometry: &TableGeometry, hit: WallHit) {
        let segment = geometry.walls.segment(hit.wall);
        let body = &mut bodies[hit.body];
        let sample = *body.current();
        let vel = wall_response(sample.vel, segment.orientation(), self.settings.wall_restitution);
        log::trace!(
            "Body {} off cushion {} ({:?}) at d={:.9}: {:?} -> {:?}",
            hit.body,
            hit.wall,
            segment.orientation(),
            hit.distance,
            sample.vel,
            vel
        );
        body.log.record_in_place(sample.pos, vel);
        self.thresholds
            .shrink_wall(hit.body, hit.wall, hit.distance * self.settings.threshold_shrink);
    }

    fn resolve_pair(&mut self, bodies: &mut BodySet, hit: PairHit) {
        let (a, b) = bodies.pair_mut(hit.a, hit.b);
        let (sa, sb) = (*a.current(), *b.current());
        let (Some(pa), Some(pb)) = (sa.pos, sb.pos) else {
            return;
        };
        let (va, vb) = ball_response(
            (pa, sa.vel, a.mass),
            (pb, sb.vel, b.mass),
            self.settings.ball_restitution,
        );
        log::trace!(
            "Bodies {} and {} collide at d={:.9}: {:?}, {:?} -> {:?}, {:?}",
            hit.a,
            hit.b,
            hit.distance,
            sa.vel,
            sb.vel,
            va,
            vb
        );
        a.log.record_in_place(sa.pos, va);
        b.log.record_in_place(sb.pos, vb);
        self.thresholds
            .shrink_pair(hit.a, hit.b, hit.distance * self.settings.threshold_shrink);
    }
}
