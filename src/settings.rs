//! Capture settings and global fallbacks
//!
//! Loaded once at startup from JSON. Missing fields take their defaults;
//! out-of-range values are clamped rather than rejected.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{BASE_TARGET_SIZE, PLANE_HEIGHT, PLANE_WIDTH};
use crate::sim::ScoreCurve;

/// Errors from loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed JSON or wrong field types
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed but unusable configuration
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Multi-target rain round settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainSettings {
    /// Chance (0-1) that an eligible aim phase runs as rain
    pub chance: f32,
    /// Targets per rain round (independent of the tier's aim count)
    pub target_count: u32,
    /// Spare ammunition on top of one bullet per target
    pub extra_bullets: u32,
    /// Fall speed (plane units/s)
    pub fall_speed: f32,
    /// Seconds between spawns
    pub spawn_interval_secs: f32,
    /// Targets allowed to reach the bottom before the round fails
    pub allowed_escapes: u32,
}

impl Default for RainSettings {
    fn default() -> Self {
        Self {
            chance: 0.35,
            target_count: 5,
            extra_bullets: 2,
            fall_speed: 110.0,
            spawn_interval_secs: 0.6,
            allowed_escapes: 1,
        }
    }
}

/// Reaction-bar commit prompt settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitSettings {
    /// Marker sweep speed (bar lengths/s)
    pub marker_speed: f32,
    /// Center of the valid zone (0-1)
    pub zone_center: f32,
    /// Width of the valid zone for the lowest tier (0-1)
    pub zone_width: f32,
    /// Fraction of the zone width lost per tier step
    pub zone_shrink_per_tier: f32,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            marker_speed: 0.8,
            zone_center: 0.7,
            zone_width: 0.24,
            zone_shrink_per_tier: 0.12,
        }
    }
}

/// Global capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Aim scoring curve
    pub score: ScoreCurve,
    /// Aim threshold when neither tuning nor target overrides one
    pub fallback_threshold: f32,

    // === Timing ===
    /// Default cue delay range (seconds)
    pub timing_delay_min: f32,
    pub timing_delay_max: f32,
    /// Default reaction window (seconds)
    pub timing_window_secs: f32,

    // === Aim ===
    /// Seconds per single-target round before it times out
    pub aim_duration_secs: f32,
    /// Target edge length before tier scaling
    pub base_target_size: f32,
    /// Aim plane size (plane units)
    pub plane_width: f32,
    pub plane_height: f32,
    /// Clicks outside the target rectangle score 0
    pub require_hit_inside: bool,
    /// Hit feedback auto-advance (seconds)
    pub feedback_secs: f32,
    /// Hit feedback minimum display before a press may skip it (seconds)
    pub feedback_min_secs: f32,

    // === Input ===
    /// Ticks of ignored input after each phase transition (at least 1)
    pub input_ignore_ticks: u32,

    pub rain: RainSettings,
    pub commit: CommitSettings,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            score: ScoreCurve::default(),
            fallback_threshold: 60.0,

            timing_delay_min: 1.0,
            timing_delay_max: 3.0,
            timing_window_secs: 0.6,

            aim_duration_secs: 2.5,
            base_target_size: BASE_TARGET_SIZE,
            plane_width: PLANE_WIDTH,
            plane_height: PLANE_HEIGHT,
            require_hit_inside: true,
            feedback_secs: 0.9,
            feedback_min_secs: 0.25,

            input_ignore_ticks: 1,

            rain: RainSettings::default(),
            commit: CommitSettings::default(),
        }
    }
}

impl CaptureSettings {
    /// Parse from JSON and sanitize
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        if settings.plane_width <= 0.0 || settings.plane_height <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "aim plane must have positive size, got {}x{}",
                settings.plane_width, settings.plane_height
            )));
        }
        Ok(settings.sanitized())
    }

    /// Parse from JSON, falling back to defaults on any error
    pub fn load_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(settings) => {
                log::info!("Loaded capture settings");
                settings
            }
            Err(e) => {
                log::warn!("{}, using default capture settings", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamp values into usable ranges
    pub fn sanitized(mut self) -> Self {
        let non_neg = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };

        if !(self.score.exponent.is_finite() && self.score.exponent > 0.0) {
            log::warn!("Score exponent {} invalid, using 1.0", self.score.exponent);
            self.score.exponent = 1.0;
        }
        self.fallback_threshold = non_neg(self.fallback_threshold);

        self.timing_delay_min = non_neg(self.timing_delay_min);
        self.timing_delay_max = non_neg(self.timing_delay_max);
        if self.timing_delay_min > self.timing_delay_max {
            std::mem::swap(&mut self.timing_delay_min, &mut self.timing_delay_max);
        }
        self.timing_window_secs = non_neg(self.timing_window_secs);

        self.aim_duration_secs = non_neg(self.aim_duration_secs);
        self.base_target_size = non_neg(self.base_target_size);
        self.plane_width = non_neg(self.plane_width);
        self.plane_height = non_neg(self.plane_height);
        self.feedback_secs = non_neg(self.feedback_secs);
        self.feedback_min_secs = non_neg(self.feedback_min_secs).min(self.feedback_secs);

        self.input_ignore_ticks = self.input_ignore_ticks.max(1);

        self.rain.chance = if self.rain.chance.is_finite() {
            self.rain.chance.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.rain.target_count = self.rain.target_count.max(1);
        self.rain.fall_speed = non_neg(self.rain.fall_speed);
        self.rain.spawn_interval_secs = non_neg(self.rain.spawn_interval_secs);

        self.commit.marker_speed = non_neg(self.commit.marker_speed);
        self.commit.zone_center = crate::clamp01(self.commit.zone_center);
        self.commit.zone_width = crate::clamp01(self.commit.zone_width);
        self.commit.zone_shrink_per_tier = crate::clamp01(self.commit.zone_shrink_per_tier);

        self
    }

    pub fn plane_size(&self) -> Vec2 {
        Vec2::new(self.plane_width, self.plane_height)
    }
}
