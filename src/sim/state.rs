//! Capture session state and core simulation types
//!
//! A `CaptureSession` exists exactly while the machine is not idle. It is
//! created when a target is selected and destroyed synchronously when the
//! capture resolves.

use serde::{Deserialize, Serialize};

use super::aim::AimRound;
use super::rain::RainRound;
use super::timing::TimingRound;
use crate::clock::PauseToken;

/// Rarity tier of a capture target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Tier {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    /// Top tier: may mix aim and timing rounds
    Legendary,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Common,
        Tier::Uncommon,
        Tier::Rare,
        Tier::Epic,
        Tier::Legendary,
    ];

    /// 0-based rank (Common = 0)
    pub fn index(self) -> usize {
        match self {
            Tier::Common => 0,
            Tier::Uncommon => 1,
            Tier::Rare => 2,
            Tier::Epic => 3,
            Tier::Legendary => 4,
        }
    }

    pub fn is_top(self) -> bool {
        self == Tier::Legendary
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Common => "Common",
            Tier::Uncommon => "Uncommon",
            Tier::Rare => "Rare",
            Tier::Epic => "Epic",
            Tier::Legendary => "Legendary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "common" => Some(Tier::Common),
            "uncommon" => Some(Tier::Uncommon),
            "rare" => Some(Tier::Rare),
            "epic" => Some(Tier::Epic),
            "legendary" => Some(Tier::Legendary),
            _ => None,
        }
    }
}

/// Optional per-target tuning, filled in when the target is constructed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetOverrides {
    /// Shortest wait before a timing cue (seconds)
    pub timing_delay_min: Option<f32>,
    /// Longest wait before a timing cue (seconds)
    pub timing_delay_max: Option<f32>,
    /// Reaction window after the cue (seconds)
    pub timing_window: Option<f32>,
    /// Number of aim rounds
    pub aim_target_count: Option<u32>,
    /// Required aim score total
    pub aim_threshold: Option<f32>,
}

/// Handle to the entity being captured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchTarget {
    pub id: u64,
    pub name: String,
    /// Missing tier resolves to `Tier::Common`
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub overrides: TargetOverrides,
}

impl CatchTarget {
    pub fn new(id: u64, name: impl Into<String>, tier: Tier) -> Self {
        Self {
            id,
            name: name.into(),
            tier: Some(tier),
            overrides: TargetOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: TargetOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn resolved_tier(&self) -> Tier {
        self.tier.unwrap_or_default()
    }
}

/// Why a capture failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailReason {
    /// Reaction bar pressed before the valid zone
    TooEarly,
    /// Reaction bar pressed after the valid zone (or never)
    TooLate,
    /// Timing press before the cue
    TooSoon,
    /// Timing window closed without a press
    TooSlow,
    /// Aim total below threshold
    LowTotal,
    /// Rain mode ran out of ammunition
    OutOfBullets,
    /// Rain mode escape budget exceeded
    EscapedTooMany,
    /// Session cancelled by the host
    Cancelled,
}

impl FailReason {
    /// Short tag for display/logging
    pub fn as_str(&self) -> &'static str {
        match self {
            FailReason::TooEarly => "too early",
            FailReason::TooLate => "too late",
            FailReason::TooSoon => "too soon",
            FailReason::TooSlow => "too slow",
            FailReason::LowTotal => "bullseye total too low",
            FailReason::OutOfBullets => "out of bullets",
            FailReason::EscapedTooMany => "escaped too many",
            FailReason::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureOutcome {
    Success,
    Failure(FailReason),
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureOutcome::Success)
    }

    pub fn reason(&self) -> Option<FailReason> {
        match self {
            CaptureOutcome::Success => None,
            CaptureOutcome::Failure(r) => Some(*r),
        }
    }
}

/// Externally visible phase of the capture machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapturePhase {
    /// No session
    Idle,
    /// Reaction-bar commit prompt
    Committing,
    /// Commit landed, rounds being planned
    PhasePlanning,
    /// Single-target aim round
    Aiming,
    /// Multi-target rain round
    Raining,
    /// Cue-reaction round
    Timing,
}

impl CapturePhase {
    /// Running an aim or timing mechanic
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            CapturePhase::Aiming | CapturePhase::Raining | CapturePhase::Timing
        )
    }
}

/// Live sub-phase of a session. Replacing it drops the previous phase's
/// timers, so nothing from a superseded phase can fire.
#[derive(Debug, Clone)]
pub enum Stage {
    Commit,
    Planning,
    Aim(AimRound),
    Rain(RainRound),
    Timing(TimingRound),
}

impl Stage {
    pub fn phase(&self) -> CapturePhase {
        match self {
            Stage::Commit => CapturePhase::Committing,
            Stage::Planning => CapturePhase::PhasePlanning,
            Stage::Aim(_) => CapturePhase::Aiming,
            Stage::Rain(_) => CapturePhase::Raining,
            Stage::Timing(_) => CapturePhase::Timing,
        }
    }
}

/// One in-progress capture attempt
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub target: CatchTarget,
    /// Resolved once at session start
    pub tier: Tier,
    pub stage: Stage,
    pub aim_remaining: u32,
    pub timing_remaining: u32,
    /// Sum of `round_scores`
    pub aim_score_total: u32,
    /// Per-round aim scores, in order (timeouts record 0)
    pub round_scores: Vec<u32>,
    pub aim_threshold_total: f32,
    pub last_reaction_secs: Option<f32>,
    /// Aim phase is running the multi-target variant
    pub rain_mode: bool,
    /// Resolved timing window for this session (seconds)
    pub timing_window_secs: f32,
    /// Resolved cue delay range (seconds)
    pub timing_delay: (f32, f32),
    /// Session time the target was selected
    pub started_at: f64,
    pub(crate) pause: Option<PauseToken>,
}

impl CaptureSession {
    pub fn new(target: CatchTarget, started_at: f64, pause: PauseToken) -> Self {
        let tier = target.resolved_tier();
        Self {
            target,
            tier,
            stage: Stage::Commit,
            aim_remaining: 0,
            timing_remaining: 0,
            aim_score_total: 0,
            round_scores: Vec::new(),
            aim_threshold_total: 0.0,
            last_reaction_secs: None,
            rain_mode: false,
            timing_window_secs: 0.0,
            timing_delay: (0.0, 0.0),
            started_at,
            pause: Some(pause),
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.stage.phase()
    }

    /// Add one aim round's score to the running total
    pub fn record_aim_score(&mut self, score: u32) {
        self.round_scores.push(score);
        self.aim_score_total = self.aim_score_total.saturating_add(score);
    }

    pub fn aim_threshold_met(&self) -> bool {
        self.aim_score_total as f32 >= self.aim_threshold_total
    }

    /// Points still missing to reach the threshold
    pub fn points_needed(&self) -> u32 {
        let missing = self.aim_threshold_total - self.aim_score_total as f32;
        if missing > 0.0 { missing.ceil() as u32 } else { 0 }
    }
}

/// Summary of a resolved capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub target: CatchTarget,
    pub tier: Tier,
    pub outcome: CaptureOutcome,
    pub aim_score_total: u32,
    pub round_scores: Vec<u32>,
    pub aim_threshold_total: f32,
    pub last_reaction_secs: Option<f32>,
    pub rain_mode: bool,
    /// Session seconds from selection to resolution
    pub duration_secs: f64,
}

impl CaptureRecord {
    pub fn from_session(session: CaptureSession, outcome: CaptureOutcome, now: f64) -> Self {
        Self {
            tier: session.tier,
            outcome,
            aim_score_total: session.aim_score_total,
            round_scores: session.round_scores,
            aim_threshold_total: session.aim_threshold_total,
            last_reaction_secs: session.last_reaction_secs,
            rain_mode: session.rain_mode,
            duration_secs: (now - session.started_at).max(0.0),
            target: session.target,
        }
    }
}
