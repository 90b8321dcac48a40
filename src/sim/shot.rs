//! Shot driver
//!
//! A [`Table`] owns the bodies, the static geometry and the settings. Taking a
//! shot places and launches the cue ball, then runs the integrator until
//! nothing moves, dropping captured balls from the active set between rounds.
//! Captured balls stay in the body arena so their trajectories can still be
//! replayed.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::collision::ContactResolver;
use super::geometry::TableGeometry;
use super::integrator::{Advance, Integrator};
use super::state::{BodyId, BodySet};
use crate::consts::{HEAD_SPOT, KITCHEN_LINE_Y};
use crate::direction;
use crate::error::{SetupFault, SimError, SimResult};
use crate::settings::Settings;

/// Where a table is in its shot cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShotPhase {
    #[default]
    Idle,
    Integrating,
}

/// How the cue ball is positioned before it is struck
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CuePlacement {
    /// On the line `y = baseline_y`, where the shot line passes through `target`
    AimAt { target: DVec2, baseline_y: f64 },
    Fixed(DVec2),
    /// Leave the seed position as racked
    KeepSeed,
}

impl Default for CuePlacement {
    fn default() -> Self {
        CuePlacement::AimAt {
            target: DVec2::new(HEAD_SPOT.0, HEAD_SPOT.1),
            baseline_y: KITCHEN_LINE_Y,
        }
    }
}

impl CuePlacement {
    /// Cue position for a shot along `angle` (radians)
    pub fn position(&self, seed: DVec2, angle: f64) -> SimResult<DVec2> {
        match *self {
            CuePlacement::AimAt { target, baseline_y } => {
                let (sin, cos) = angle.sin_cos();
                if sin.abs() < 1e-12 {
                    return Err(SimError::InvalidShotSetup(SetupFault::UnreachableAim { angle }));
                }
                let x = target.x - (target.y - baseline_y) * cos / sin;
                Ok(DVec2::new(x, baseline_y))
            }
            CuePlacement::Fixed(pos) => Ok(pos),
            CuePlacement::KeepSeed => Ok(seed),
        }
    }
}

/// Cue ball strike: speed, direction and placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub speed: f64,
    /// Radians from +x
    pub angle: f64,
    pub placement: CuePlacement,
}

impl Shot {
    pub fn new(speed: f64, angle: f64) -> Self {
        Self {
            speed,
            angle,
            placement: CuePlacement::default(),
        }
    }

    pub fn from_degrees(speed: f64, angle_deg: f64) -> Self {
        Self::new(speed, angle_deg.to_radians())
    }

    pub fn with_placement(mut self, placement: CuePlacement) -> Self {
        self.placement = placement;
        self
    }

    #[inline]
    pub fn velocity(&self) -> DVec2 {
        direction(self.angle) * self.speed
    }
}

/// Summary of a completed shot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotReport {
    pub integrator_calls: usize,
    /// Resolved contacts and captures
    pub events: usize,
    /// In capture order
    pub captured: Vec<BodyId>,
    /// Latest sample time over all bodies
    pub end_time: f64,
}

/// A pool table: bodies, geometry and the active set
#[derive(Debug, Clone)]
pub struct Table {
    bodies: BodySet,
    active: Vec<BodyId>,
    geometry: TableGeometry,
    settings: Settings,
    phase: ShotPhase,
}

impl Table {
    /// Every body that currently has a position starts active
    pub fn new(geometry: TableGeometry, bodies: BodySet, settings: Settings) -> Self {
        let active = bodies.iter().filter(|b| b.is_active()).map(|b| b.id).collect();
        Self {
            bodies,
            active,
            geometry,
            settings,
            phase: ShotPhase::Idle,
        }
    }

    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    pub fn active(&self) -> &[BodyId] {
        &self.active
    }

    pub fn geometry(&self) -> &TableGeometry {
        &self.geometry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn phase(&self) -> ShotPhase {
        self.phase
    }

    /// Object balls still on the table
    pub fn remaining_active_count(&self) -> usize {
        self.active
            .iter()
            .filter(|&&id| !self.bodies[id].primary)
            .count()
    }

    /// Put every ball back on its seed and reactivate all of them
    pub fn rerack(&mut self) {
        for body in self.bodies.iter_mut() {
            body.log.reset_to_seed();
        }
        self.active = self.bodies.ids().collect();
        self.phase = ShotPhase::Idle;
    }

    /// Strike the cue ball and simulate until everything is at rest
    ///
    /// Contact thresholds are rebuilt for every shot. Every active ball must
    /// hold only its seed sample; use [`rerack`](Self::rerack) between shots.
    pub fn take_shot(&mut self, shot: &Shot) -> SimResult<ShotReport> {
        let primaries: Vec<BodyId> = self
            .active
            .iter()
            .copied()
            .filter(|&id| self.bodies[id].primary)
            .collect();
        let &[cue] = primaries.as_slice() else {
            return Err(SimError::InvalidShotSetup(SetupFault::PrimaryCount(primaries.len())));
        };
        if let Some(&stale) = self.active.iter().find(|&&id| self.bodies[id].log.len() != 1) {
            return Err(SimError::InvalidShotSetup(SetupFault::StaleHistory(stale)));
        }

        let seed = self.bodies[cue].log.seed().pos.unwrap_or_default();
        let pos = shot.placement.position(seed, shot.angle)?;
        self.bodies[cue].log.overwrite_seed(pos, shot.velocity());

        log::info!(
            "Shot: speed={:.3} angle={:.3}rad from {:?}, {} balls active",
            shot.speed,
            shot.angle,
            pos,
            self.active.len()
        );

        let mut resolver = ContactResolver::new(&self.bodies, &self.geometry, &self.settings);
        let integrator = Integrator::new(&self.settings);
        let mut report = ShotReport::default();

        self.phase = ShotPhase::Integrating;
        let outcome = self.run(&integrator, &mut resolver, &mut report);
        self.phase = ShotPhase::Idle;
        outcome?;

        report.end_time = self
            .bodies
            .iter()
            .map(|b| b.current().t)
            .fold(0.0, f64::max);
        log::info!(
            "Shot settled at t={:.3}s: {} events, {} captured, {} object balls left",
            report.end_time,
            report.events,
            report.captured.len(),
            self.remaining_active_count()
        );
        Ok(report)
    }

    fn run(
        &mut self,
        integrator: &Integrator,
        resolver: &mut ContactResolver,
        report: &mut ShotReport,
    ) -> SimResult<()> {
        loop {
            let advance =
                integrator.advance_until_event(&mut self.bodies, &self.active, resolver, &self.geometry)?;
            report.integrator_calls += 1;
            log::debug!("Integrator call {}: {:?}", report.integrator_calls, advance);

            if advance == Advance::ImpactResolved {
                report.events += 1;
            }
            report.captured.extend(self.prune_captured());

            if advance == Advance::AllStationary {
                return Ok(());
            }
        }
    }

    /// Swap in an active set without captured bodies; returns the dropped ones
    fn prune_captured(&mut self) -> Vec<BodyId> {
        let (kept, captured): (Vec<BodyId>, Vec<BodyId>) = self
            .active
            .iter()
            .copied()
            .partition(|&id| self.bodies[id].is_active());
        self.active = kept;
        captured
    }

    /// Every body's trajectory as JSON, for renderers and analysis tools
    pub fn trajectories_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(&self.bodies)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::BALL_RADIUS;
    use crate::sim::geometry::{Pocket, WallPolygon};

    const R: f64 = BALL_RADIUS;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn boxed(half: f64, pockets: Vec<Pocket>) -> TableGeometry {
        TableGeometry::new(
            WallPolygon::rectangle(DVec2::splat(-half), DVec2::splat(half)),
            pockets,
        )
    }

    #[test]
    fn test_resting_shot_returns_immediately() {
        init_logging();
        let mut bodies = BodySet::new();
        let cue = bodies.add_primary(DVec2::new(0.1, 0.2));
        let mut table = Table::new(boxed(1.0, Vec::new()), bodies, Settings::default());

        let shot = Shot::new(0.0, 0.0).with_placement(CuePlacement::KeepSeed);
        let report = table.take_shot(&shot).unwrap();
        assert_eq!(report.integrator_calls, 1);
        assert_eq!(report.events, 0);
        assert_eq!(table.bodies()[cue].log.len(), 1);
        assert_eq!(table.bodies()[cue].position(), Some(DVec2::new(0.1, 0.2)));
        assert_eq!(table.phase(), ShotPhase::Idle);
    }

    #[test]
    fn test_primary_count_is_checked() {
        let mut bodies = BodySet::new();
        bodies.add_object(DVec2::ZERO);
        let mut table = Table::new(boxed(1.0, Vec::new()), bodies, Settings::default());
        let err = table.take_shot(&Shot::new(1.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidShotSetup(SetupFault::PrimaryCount(0))
        ));

        let mut bodies = BodySet::new();
        bodies.add_primary(DVec2::new(-0.5, 0.0));
        bodies.add_primary(DVec2::new(0.5, 0.0));
        let mut table = Table::new(boxed(1.0, Vec::new()), bodies, Settings::default());
        let err = table.take_shot(&Shot::new(1.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidShotSetup(SetupFault::PrimaryCount(2))
        ));
        assert!(table.bodies().iter().all(|b| b.log.len() == 1));
    }

    #[test]
    fn test_default_placement_aims_at_head_spot() {
        let pos = CuePlacement::default()
            .position(DVec2::ZERO, 90f64.to_radians())
            .unwrap();
        assert!(pos.x.abs() < 1e-12);
        assert_eq!(pos.y, KITCHEN_LINE_Y);

        let angle = 60f64.to_radians();
        let pos = CuePlacement::default().position(DVec2::ZERO, angle).unwrap();
        let to_target = DVec2::new(HEAD_SPOT.0, HEAD_SPOT.1) - pos;
        assert!(to_target.perp_dot(direction(angle)).abs() < 1e-12);

        let err = CuePlacement::default().position(DVec2::ZERO, 0.0).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidShotSetup(SetupFault::UnreachableAim { .. })
        ));
    }

    #[test]
    fn test_head_on_shot_stops_cue_ball() {
        init_logging();
        let mut bodies = BodySet::new();
        let cue = bodies.add(R, 0.16, true, DVec2::ZERO);
        let ball = bodies.add(R, 0.16, false, DVec2::new(0.2, 0.0));
        let settings = Settings::default();
        let e = settings.ball_restitution;
        let mut table = Table::new(boxed(3.0, Vec::new()), bodies, settings);

        let shot = Shot::new(1.0, 0.0).with_placement(CuePlacement::Fixed(DVec2::ZERO));
        let report = table.take_shot(&shot).unwrap();
        assert!(report.events >= 1);

        let bodies = table.bodies();
        let first_move = bodies[ball]
            .log
            .samples()
            .iter()
            .find(|s| s.speed() > 0.0)
            .copied()
            .unwrap();
        assert!(first_move.speed() <= e);
        assert!(first_move.speed() > 0.9 * e);

        let cue_after = bodies[cue]
            .log
            .samples()
            .iter()
            .rev()
            .find(|s| s.t == first_move.t)
            .unwrap();
        assert!(cue_after.speed() < 1e-12);

        assert_eq!(bodies[cue].speed(), 0.0);
        assert_eq!(bodies[ball].speed(), 0.0);
        let cue_x = bodies[cue].position().unwrap().x;
        let ball_x = bodies[ball].position().unwrap().x;
        assert!(ball_x > cue_x + 1.0);
    }

    #[test]
    fn test_pocketed_ball_leaves_active_set() {
        init_logging();
        let mut bodies = BodySet::new();
        let cue = bodies.add_primary(DVec2::new(-0.5, 0.0));
        let ball = bodies.add_object(DVec2::ZERO);
        bodies[ball].log.overwrite_seed(DVec2::ZERO, DVec2::new(1.0, 0.0));
        let mut table = Table::new(
            boxed(1.0, vec![Pocket::new(0.6, 0.0)]),
            bodies,
            Settings::default(),
        );
        assert_eq!(table.remaining_active_count(), 1);

        let shot = Shot::new(0.0, 0.0).with_placement(CuePlacement::Fixed(DVec2::new(-0.5, 0.0)));
        let report = table.take_shot(&shot).unwrap();

        assert_eq!(report.captured, vec![ball]);
        assert_eq!(table.remaining_active_count(), 0);
        assert_eq!(table.active(), &[cue]);

        let last = table.bodies()[ball].current();
        assert_eq!(last.pos, None);
        assert_eq!(last.vel, DVec2::ZERO);
        // Captured when it first came within the capture radius
        let before = table.bodies()[ball].log.samples();
        let approach = before[before.len() - 2].pos.unwrap();
        let capture_radius = Pocket::capture_radius(R, table.settings().pocket_size);
        assert!(approach.distance(DVec2::new(0.6, 0.0)) <= capture_radius);
    }

    #[test]
    fn test_rerack_allows_repeat_and_is_deterministic() {
        let mut bodies = BodySet::new();
        bodies.add_primary(DVec2::new(0.0, KITCHEN_LINE_Y));
        bodies.add_object(DVec2::new(0.0, 1.98));
        bodies.add_object(DVec2::new(-0.028829, 2.029933));
        bodies.add_object(DVec2::new(0.028829, 2.029933));
        let geometry = TableGeometry::new(
            WallPolygon::rectangle(DVec2::new(-0.685, 0.0), DVec2::new(0.685, 2.74)),
            vec![Pocket::new(-0.9, -0.2), Pocket::new(0.9, 2.94)],
        );
        let mut table = Table::new(geometry, bodies, Settings::default());
        let shot = Shot::from_degrees(4.0, 88.0);

        table.take_shot(&shot).unwrap();
        let first = table.trajectories_json().unwrap();

        let err = table.take_shot(&shot).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidShotSetup(SetupFault::StaleHistory(_))
        ));

        table.rerack();
        assert!(table.bodies().iter().all(|b| b.log.len() == 1));
        table.take_shot(&shot).unwrap();
        assert_eq!(table.trajectories_json().unwrap(), first);
    }

    #[test]
    fn test_trajectories_json_lists_every_body() {
        let mut bodies = BodySet::new();
        bodies.add_primary(DVec2::ZERO);
        bodies.add_object(DVec2::new(0.5, 0.5));
        let table = Table::new(boxed(1.0, Vec::new()), bodies, Settings::default());
        let json: serde_json::Value = serde_json::from_str(&table.trajectories_json().unwrap()).unwrap();
        let list = json["bodies"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1]["log"]["samples"][0]["t"], 0.0);
    }
}
