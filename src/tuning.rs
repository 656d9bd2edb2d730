//! Data-driven per-tier balance
//!
//! Each rarity tier maps to a round composition (which mechanics run and how
//! many rounds), optional window/threshold overrides, and the aim target's
//! size, spawn band and movement profile.

use serde::{Deserialize, Serialize};

use crate::settings::{CaptureSettings, ConfigError};
use crate::sim::movement::{MovementMode, MovementProfile};
use crate::sim::state::{TargetOverrides, Tier};

/// Which mechanics a tier runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CatchMode {
    /// Capture succeeds as soon as the commit lands
    #[default]
    None,
    TimingOnly,
    AimOnly,
    /// Aim then timing (top tier only; lower tiers keep one)
    Both,
}

/// Normalized radius-from-center range for the initial target position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnBand {
    pub min: f32,
    pub max: f32,
}

impl Default for SpawnBand {
    fn default() -> Self {
        Self { min: 0.0, max: 0.6 }
    }
}

impl SpawnBand {
    /// Clamp into [0, 1] with min <= max
    pub fn sanitized(self) -> Self {
        let a = crate::clamp01(self.min);
        let b = crate::clamp01(self.max);
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }
}

/// Tuning for one rarity tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierTuning {
    pub mode: CatchMode,
    pub timing_count: u32,
    /// Reaction window; falls back to the target's own window
    pub timing_window_override: Option<f32>,
    pub aim_target_count: u32,
    /// Required aim total; falls back to the target's field, then the global constant
    pub aim_threshold_override: Option<f32>,
    /// Scales the base aim target size
    pub size_multiplier: f32,
    pub spawn_band: SpawnBand,
    pub movement: MovementProfile,
    /// Aim phase may run as a rain round
    pub rain_eligible: bool,
}

impl Default for TierTuning {
    fn default() -> Self {
        Self {
            mode: CatchMode::None,
            timing_count: 0,
            timing_window_override: None,
            aim_target_count: 0,
            aim_threshold_override: None,
            size_multiplier: 1.0,
            spawn_band: SpawnBand::default(),
            movement: MovementProfile::still(),
            rain_eligible: false,
        }
    }
}

impl TierTuning {
    pub fn timing_only(count: u32) -> Self {
        Self {
            mode: CatchMode::TimingOnly,
            timing_count: count,
            ..Default::default()
        }
    }

    pub fn aim_only(count: u32) -> Self {
        Self {
            mode: CatchMode::AimOnly,
            aim_target_count: count,
            ..Default::default()
        }
    }

    pub fn sanitized(mut self) -> Self {
        let positive = |v: Option<f32>| v.filter(|x| x.is_finite()).map(|x| x.max(0.0));
        self.timing_window_override = positive(self.timing_window_override);
        self.aim_threshold_override = positive(self.aim_threshold_override);
        if !(self.size_multiplier.is_finite() && self.size_multiplier > 0.0) {
            log::warn!("Size multiplier {} invalid, using 1.0", self.size_multiplier);
            self.size_multiplier = 1.0;
        }
        self.spawn_band = self.spawn_band.sanitized();
        self.movement = self.movement.sanitized();
        self
    }
}

/// Rounds planned for one session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundPlan {
    pub aim_rounds: u32,
    pub timing_rounds: u32,
    pub aim_threshold: f32,
    pub timing_window_secs: f32,
    pub timing_delay: (f32, f32),
}

/// Plan a session's rounds from tier tuning, target overrides and globals
pub fn plan_rounds(
    tuning: &TierTuning,
    tier: Tier,
    target: &TargetOverrides,
    settings: &CaptureSettings,
) -> RoundPlan {
    let aim_count = target.aim_target_count.unwrap_or(tuning.aim_target_count);

    let (aim_rounds, mut timing_rounds) = match tuning.mode {
        CatchMode::None => (0, 0),
        CatchMode::TimingOnly => (0, tuning.timing_count),
        CatchMode::AimOnly => (aim_count, 0),
        CatchMode::Both => (aim_count, tuning.timing_count),
    };

    // Only the top tier mixes mechanics; everyone else keeps aim
    if aim_rounds > 0 && timing_rounds > 0 && !tier.is_top() {
        timing_rounds = 0;
    }

    // Host-supplied values that are not finite fall through to the next source
    let finite = |v: Option<f32>| v.filter(|x| x.is_finite());

    let aim_threshold = finite(tuning.aim_threshold_override)
        .or(finite(target.aim_threshold))
        .unwrap_or(settings.fallback_threshold)
        .max(0.0);

    let timing_window_secs = finite(tuning.timing_window_override)
        .or(finite(target.timing_window))
        .unwrap_or(settings.timing_window_secs)
        .max(0.0);

    let lo = finite(target.timing_delay_min)
        .unwrap_or(settings.timing_delay_min)
        .max(0.0);
    let hi = finite(target.timing_delay_max)
        .unwrap_or(settings.timing_delay_max)
        .max(0.0);

    RoundPlan {
        aim_rounds,
        timing_rounds,
        aim_threshold,
        timing_window_secs,
        timing_delay: (lo.min(hi), lo.max(hi)),
    }
}

/// Static tier → tuning table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningTable {
    pub common: TierTuning,
    pub uncommon: TierTuning,
    pub rare: TierTuning,
    pub epic: TierTuning,
    pub legendary: TierTuning,
}

impl Default for TuningTable {
    fn default() -> Self {
        Self {
            common: TierTuning {
                size_multiplier: 1.3,
                ..TierTuning::timing_only(1)
            },
            uncommon: TierTuning {
                size_multiplier: 1.15,
                spawn_band: SpawnBand { min: 0.0, max: 0.5 },
                movement: MovementProfile {
                    mode: MovementMode::DriftTimed,
                    drift_speed: 80.0,
                    drift_secs: 1.2,
                    ..Default::default()
                },
                ..TierTuning::aim_only(1)
            },
            rare: TierTuning {
                mode: CatchMode::Both,
                timing_count: 1,
                aim_target_count: 2,
                size_multiplier: 1.0,
                spawn_band: SpawnBand { min: 0.2, max: 0.7 },
                movement: MovementProfile {
                    mode: MovementMode::Wander,
                    wander_min_speed: 60.0,
                    wander_max_speed: 120.0,
                    change_every_secs: 0.9,
                    ..Default::default()
                },
                rain_eligible: true,
                ..Default::default()
            },
            epic: TierTuning {
                aim_threshold_override: Some(180.0),
                size_multiplier: 0.85,
                spawn_band: SpawnBand { min: 0.3, max: 0.8 },
                movement: MovementProfile {
                    mode: MovementMode::RandomPick,
                    drop_speed: 140.0,
                    end_round_at_bottom: true,
                    bounce_at_edges: true,
                    pick_from: vec![
                        MovementMode::Drop,
                        MovementMode::DriftTimed,
                        MovementMode::Wander,
                    ],
                    ..Default::default()
                },
                rain_eligible: true,
                ..TierTuning::aim_only(3)
            },
            legendary: TierTuning {
                mode: CatchMode::Both,
                timing_count: 2,
                timing_window_override: Some(0.45),
                aim_target_count: 3,
                aim_threshold_override: Some(210.0),
                size_multiplier: 0.7,
                spawn_band: SpawnBand { min: 0.4, max: 0.9 },
                movement: MovementProfile {
                    mode: MovementMode::Wander,
                    wander_min_speed: 120.0,
                    wander_max_speed: 220.0,
                    change_every_secs: 0.5,
                    ..Default::default()
                },
                rain_eligible: true,
            },
        }
    }
}

impl TuningTable {
    pub fn get(&self, tier: Tier) -> &TierTuning {
        match tier {
            Tier::Common => &self.common,
            Tier::Uncommon => &self.uncommon,
            Tier::Rare => &self.rare,
            Tier::Epic => &self.epic,
            Tier::Legendary => &self.legendary,
        }
    }

    pub fn get_mut(&mut self, tier: Tier) -> &mut TierTuning {
        match tier {
            Tier::Common => &mut self.common,
            Tier::Uncommon => &mut self.uncommon,
            Tier::Rare => &mut self.rare,
            Tier::Epic => &mut self.epic,
            Tier::Legendary => &mut self.legendary,
        }
    }

    /// Same table with one tier replaced
    pub fn with_tier(mut self, tier: Tier, tuning: TierTuning) -> Self {
        *self.get_mut(tier) = tuning.sanitized();
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let table: Self = serde_json::from_str(json)?;
        Ok(table.sanitized())
    }

    /// Parse from JSON, falling back to the built-in table on any error
    pub fn load_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(table) => {
                log::info!("Loaded tier tuning table");
                table
            }
            Err(e) => {
                log::warn!("{}, using built-in tuning table", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn sanitized(mut self) -> Self {
        for tier in Tier::ALL {
            let tuning = self.get(tier).clone().sanitized();
            *self.get_mut(tier) = tuning;
        }
        self
    }
}
