//! Single-target precision rounds
//!
//! ```text
//! Preparing ──arm(now)──▶ Armed ──press──▶ Feedback ──press/auto──▶ Done (Advance)
//!                           │ now > deadline
//!                           ▼
//!                         Done (TimedOut, scores 0)
//! ```
//!
//! A timeout is not a failure: the round simply scores nothing. Whether the
//! aim phase as a whole passes is decided by the owner against the total.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::movement::{self, Bounds, MovementMode, MovementProfile, Motion};
use super::rect::TargetRect;
use crate::settings::CaptureSettings;
use crate::tuning::{SpawnBand, TierTuning};
use crate::unit_from_angle;

/// Stage of a single aim round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AimStage {
    /// Spawned but not counting (waiting for the owner to arm)
    Preparing,
    /// Target live, deadline running
    Armed,
    /// Hit feedback on screen since `shown_at`
    Feedback { shown_at: f64 },
    /// Round over
    Done,
}

/// What happened this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AimEvent {
    None,
    /// Player clicked; `local` is relative to the target center
    Scored { score: u32, local: Vec2, inside: bool },
    /// Deadline passed (or a dropping target hit bottom) with no click
    TimedOut,
    /// Feedback dismissed, ready for the next round
    Advance,
}

/// One single-target aim round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AimRound {
    pub stage: AimStage,
    pub rect: TargetRect,
    pub bounds: Bounds,
    /// Profile with `RandomPick` already resolved
    pub profile: MovementProfile,
    pub motion: Motion,
    pub duration_secs: f32,
    /// Session time the round times out (set on arm)
    pub deadline: f64,
}

impl AimRound {
    /// Build a round for a tier: size, spawn position and movement mode
    pub fn spawn(tuning: &TierTuning, settings: &CaptureSettings, rng: &mut impl Rng) -> Self {
        let edge = settings.base_target_size * tuning.size_multiplier;
        let half = Vec2::splat(edge * 0.5);
        let bounds = Bounds::for_target(settings.plane_size(), half);

        let mut profile = tuning.movement.clone();
        profile.mode = movement::resolve_mode(&tuning.movement, rng);

        let center = if bounds.is_degenerate() {
            bounds.center()
        } else if profile.mode == MovementMode::Drop {
            Vec2::new(bounds.center().x, bounds.max.y)
        } else {
            spawn_position(tuning.spawn_band, &bounds, rng)
        };

        Self {
            stage: AimStage::Preparing,
            rect: TargetRect::square(center, edge),
            bounds,
            profile,
            motion: Motion::stationary(center),
            duration_secs: settings.aim_duration_secs,
            deadline: 0.0,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.stage != AimStage::Preparing
    }

    /// Start movement and the deadline from `now`
    pub fn arm(&mut self, now: f64, rng: &mut impl Rng) {
        if self.is_armed() {
            return;
        }
        self.motion = Motion::start(&self.profile, self.rect.center, &self.bounds, rng);
        self.deadline = now + self.duration_secs as f64;
        self.stage = AimStage::Armed;
    }

    /// Advance the round. `press` must already be filtered by the owner's
    /// input-ignore window.
    pub fn update(
        &mut self,
        now: f64,
        dt: f32,
        press: Option<Vec2>,
        settings: &CaptureSettings,
        rng: &mut impl Rng,
    ) -> AimEvent {
        match self.stage {
            AimStage::Preparing | AimStage::Done => AimEvent::None,

            AimStage::Armed => {
                if now > self.deadline {
                    self.motion.stop();
                    self.stage = AimStage::Done;
                    return AimEvent::TimedOut;
                }

                // Judge against where the target was drawn, then move it
                if let Some(click) = press {
                    self.motion.stop();
                    let inside = self.rect.contains_point(click);
                    let score = if settings.require_hit_inside && !inside {
                        0
                    } else {
                        settings.score.score(click, &self.rect)
                    };
                    self.stage = AimStage::Feedback { shown_at: now };
                    return AimEvent::Scored {
                        score,
                        local: self.rect.to_local(click),
                        inside,
                    };
                }

                self.motion = movement::step(&self.profile, self.motion, &self.bounds, dt, rng);
                self.rect.center = self.motion.pos;

                if self.profile.end_round_at_bottom && self.motion.reached_bottom {
                    self.motion.stop();
                    self.stage = AimStage::Done;
                    return AimEvent::TimedOut;
                }
                AimEvent::None
            }

            AimStage::Feedback { shown_at } => {
                let shown = now - shown_at;
                let skip = press.is_some() && shown >= settings.feedback_min_secs as f64;
                if skip || shown >= settings.feedback_secs as f64 {
                    self.stage = AimStage::Done;
                    return AimEvent::Advance;
                }
                AimEvent::None
            }
        }
    }
}

/// Random position inside the normalized spawn band around the bounds center
pub fn spawn_position(band: SpawnBand, bounds: &Bounds, rng: &mut impl Rng) -> Vec2 {
    let band = band.sanitized();
    let r = if band.max > band.min {
        rng.random_range(band.min..=band.max)
    } else {
        band.min
    };
    let dir = unit_from_angle(rng.random_range(0.0..std::f32::consts::TAU));
    let reach = bounds.travel() * 0.5;
    bounds.clamp(bounds.center() + dir * reach * r)
}
