//! Simulation settings
//!
//! Physical coefficients and numerical knobs for a shot. Persisted as JSON so
//! a sweep driver can pin the exact configuration a result was produced with.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimResult;

/// Numerical precision presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Precision {
    Coarse,
    #[default]
    Standard,
    Fine,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Coarse => "Coarse",
            Precision::Standard => "Standard",
            Precision::Fine => "Fine",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "coarse" | "fast" => Some(Precision::Coarse),
            "standard" | "std" => Some(Precision::Standard),
            "fine" => Some(Precision::Fine),
            _ => None,
        }
    }

    /// Width of the exact-contact band
    pub fn max_overlap(&self) -> f64 {
        match self {
            Precision::Coarse => MAX_OVERLAP * 10.0,
            Precision::Standard => MAX_OVERLAP,
            Precision::Fine => MAX_OVERLAP / 10.0,
        }
    }

    /// Nominal steps per ball diameter for the fastest ball
    pub fn step_divisor(&self) -> f64 {
        match self {
            Precision::Coarse => 2.0,
            Precision::Standard => STEP_DIVISOR,
            Precision::Fine => 8.0,
        }
    }
}

/// Physics and solver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Numerical preset the contact/step fields were derived from
    pub precision: Precision,

    // === Friction ===
    pub mu_sliding: f64,
    pub mu_rolling: f64,
    pub gravity: f64,
    /// Speed above which the sliding coefficient applies
    pub sliding_speed: f64,

    // === Contacts ===
    /// Exact-contact band below each pair threshold
    pub max_overlap: f64,
    pub ball_restitution: f64,
    pub wall_restitution: f64,
    /// Capture radius is ball radius plus this
    pub pocket_size: f64,
    /// Factor applied to the resolved separation of a pair
    pub threshold_shrink: f64,

    // === Integrator ===
    /// Step = diameter / (step_divisor * fastest speed)
    pub step_divisor: f64,
    /// Steps without an event before the step size is re-derived
    pub max_loops: u32,
    /// Deepest allowed step halving
    pub max_depth: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            precision: Precision::Standard,

            mu_sliding: MU_SLIDING,
            mu_rolling: MU_ROLLING,
            gravity: GRAVITY,
            sliding_speed: SLIDING_SPEED,

            max_overlap: MAX_OVERLAP,
            ball_restitution: BALL_RESTITUTION,
            wall_restitution: WALL_RESTITUTION,
            pocket_size: POCKET_SIZE,
            threshold_shrink: THRESHOLD_SHRINK,

            step_divisor: STEP_DIVISOR,
            max_loops: MAX_LOOPS,
            max_depth: MAX_DEPTH,
        }
    }
}

impl Settings {
    /// Create settings from a precision preset (applies preset defaults)
    pub fn from_preset(preset: Precision) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a precision preset (updates the precision-dependent fields)
    pub fn apply_preset(&mut self, preset: Precision) {
        self.precision = preset;
        self.max_overlap = preset.max_overlap();
        self.step_divisor = preset.step_divisor();
    }

    /// Friction coefficient for a ball moving at `speed`
    #[inline]
    pub fn friction_for(&self, speed: f64) -> f64 {
        if speed > self.sliding_speed {
            self.mu_sliding
        } else {
            self.mu_rolling
        }
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> SimResult<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_model() {
        let s = Settings::default();
        assert_eq!(s.mu_sliding, 0.2);
        assert_eq!(s.mu_rolling, 0.03);
        assert_eq!(s.max_loops, 150);
        assert_eq!(s.max_depth, 20);
        assert!(s.ball_restitution < 1.0);
        assert!(s.wall_restitution < 1.0);
    }

    #[test]
    fn test_friction_switches_at_sliding_speed() {
        let s = Settings::default();
        assert_eq!(s.friction_for(2.5), s.mu_sliding);
        assert_eq!(s.friction_for(2.0), s.mu_rolling);
        assert_eq!(s.friction_for(0.0), s.mu_rolling);
    }

    #[test]
    fn test_preset_round_trip() {
        for name in ["coarse", "std", "Fine"] {
            let preset = Precision::from_str(name).unwrap();
            assert_eq!(Precision::from_str(preset.as_str()), Some(preset));
        }
        assert_eq!(Precision::from_str("ultra"), None);
    }

    #[test]
    fn test_fine_preset_tightens_band() {
        let fine = Settings::from_preset(Precision::Fine);
        let std = Settings::default();
        assert!(fine.max_overlap < std.max_overlap);
        assert!(fine.step_divisor > std.step_divisor);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s = Settings::from_json(r#"{ "wall_restitution": 0.5, "max_depth": 12 }"#).unwrap();
        assert_eq!(s.wall_restitution, 0.5);
        assert_eq!(s.max_depth, 12);
        assert_eq!(s.mu_rolling, MU_ROLLING);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(Settings::from_json("{ not json").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("breakshot-settings-{}.json", std::process::id()));
        let mut s = Settings::from_preset(Precision::Coarse);
        s.pocket_size = 0.25;
        s.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, s);
    }
}
