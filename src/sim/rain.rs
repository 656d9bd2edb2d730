//! Multi-target "rain" rounds with limited ammunition
//!
//! Targets fall from the top edge; every press costs one bullet whether it
//! hits or not. The round ends when the spawner reports it finished (success
//! or too many escapes), or fails outright when bullets run out while
//! targets remain. A cleared rain round does not check the score threshold.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::rect::TargetRect;
use super::scoring::ScoreCurve;
use crate::settings::RainSettings;

/// Shortest allowed spawn interval
const MIN_SPAWN_INTERVAL: f32 = 0.05;

/// Parameters handed to the spawner when a rain round starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainPlan {
    pub total_targets: u32,
    pub fall_speed: f32,
    pub spawn_interval_secs: f32,
    pub allowed_escapes: u32,
    /// Seed for the spawner's own placement RNG
    pub seed: u64,
}

impl RainPlan {
    pub fn from_settings(settings: &RainSettings, seed: u64) -> Self {
        Self {
            total_targets: settings.target_count.max(1),
            fall_speed: settings.fall_speed,
            spawn_interval_secs: settings.spawn_interval_secs,
            allowed_escapes: settings.allowed_escapes,
            seed,
        }
    }
}

/// A click that landed on a live falling target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainHit {
    /// The target as it was when hit (plane coordinates)
    pub rect: TargetRect,
    /// Click relative to the target center
    pub local: Vec2,
}

/// Collaborator that owns the falling targets
pub trait RainSpawner {
    /// Start a new round (discarding any previous one)
    fn begin(&mut self, plan: &RainPlan);
    /// Advance spawning and falling by `dt` unscaled seconds
    fn update(&mut self, dt: f32);
    /// Resolve a click against live targets, removing the one hit
    fn try_hit(&mut self, pos: Vec2) -> Option<RainHit>;
    /// Targets not yet hit or escaped (including those still to spawn)
    fn targets_left(&self) -> u32;
    /// Live targets, for drawing
    fn live_targets(&self) -> Vec<TargetRect>;
    /// `Some(success)` once the round has finished
    fn poll_finished(&mut self) -> Option<bool>;
    /// Round superseded; drop any live targets
    fn end(&mut self) {}
}

/// Result of a single shot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RainShot {
    Hit { score: u32, local: Vec2 },
    Miss,
}

/// Terminal result of a rain round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RainVerdict {
    /// Spawner finished within the escape budget
    Cleared,
    /// Spawner finished with too many escapes
    Escaped,
    /// Ammunition exhausted with targets remaining
    OutOfBullets,
}

/// Everything that happened in one rain tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RainTick {
    pub shot: Option<RainShot>,
    pub verdict: Option<RainVerdict>,
}

/// Ammunition bookkeeping for one rain round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RainRound {
    pub plan: RainPlan,
    pub armed: bool,
    pub bullets_total: u32,
    pub bullets_left: u32,
    pub hits: u32,
    pub misses: u32,
}

impl RainRound {
    pub fn new(plan: RainPlan, extra_bullets: u32) -> Self {
        let bullets = plan.total_targets.saturating_add(extra_bullets);
        Self {
            plan,
            armed: false,
            bullets_total: bullets,
            bullets_left: bullets,
            hits: 0,
            misses: 0,
        }
    }

    pub fn bullets_fired(&self) -> u32 {
        self.bullets_total - self.bullets_left
    }

    /// Hand the plan to the spawner and start accepting shots
    pub fn arm(&mut self, spawner: &mut dyn RainSpawner) {
        if self.armed {
            return;
        }
        spawner.begin(&self.plan);
        self.armed = true;
    }

    /// Advance the round. `press` must already be filtered by the owner's
    /// input-ignore window.
    pub fn update(
        &mut self,
        dt: f32,
        press: Option<Vec2>,
        spawner: &mut dyn RainSpawner,
        curve: &ScoreCurve,
    ) -> RainTick {
        let mut tick = RainTick::default();
        if !self.armed {
            return tick;
        }

        // Shots resolve against the targets as they were drawn
        if let Some(pos) = press
            && self.bullets_left > 0
        {
            self.bullets_left -= 1;
            tick.shot = Some(match spawner.try_hit(pos) {
                Some(hit) => {
                    self.hits += 1;
                    RainShot::Hit {
                        score: curve.score(pos, &hit.rect),
                        local: hit.local,
                    }
                }
                None => {
                    self.misses += 1;
                    RainShot::Miss
                }
            });
        }

        spawner.update(dt);

        tick.verdict = match spawner.poll_finished() {
            Some(true) => Some(RainVerdict::Cleared),
            Some(false) => Some(RainVerdict::Escaped),
            None if self.bullets_left == 0 && spawner.targets_left() > 0 => {
                Some(RainVerdict::OutOfBullets)
            }
            None => None,
        };
        tick
    }
}

/// A live falling target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainDrop {
    pub id: u32,
    pub rect: TargetRect,
}

/// Built-in spawner: one target per interval at a random x along the top
/// edge, falling straight down
#[derive(Debug, Clone)]
pub struct FallingRain {
    plane_size: Vec2,
    target_size: f32,
    plan: Option<RainPlan>,
    rng: Pcg32,
    drops: Vec<RainDrop>,
    spawned: u32,
    hit: u32,
    escaped: u32,
    next_spawn_in: f32,
    finished: Option<bool>,
}

impl FallingRain {
    pub fn new(plane_size: Vec2, target_size: f32) -> Self {
        Self {
            plane_size,
            target_size: target_size.max(0.0),
            plan: None,
            rng: Pcg32::seed_from_u64(0),
            drops: Vec::new(),
            spawned: 0,
            hit: 0,
            escaped: 0,
            next_spawn_in: 0.0,
            finished: None,
        }
    }

    /// Live targets, oldest first
    pub fn drops(&self) -> &[RainDrop] {
        &self.drops
    }

    pub fn escaped(&self) -> u32 {
        self.escaped
    }

    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    fn spawn_drop(&mut self) {
        let half = self.target_size * 0.5;
        let reach = self.plane_size.x * 0.5 - half;
        let x = if reach > 0.0 {
            self.rng.random_range(-reach..=reach)
        } else {
            0.0
        };
        let y = self.plane_size.y * 0.5 - half;
        self.spawned += 1;
        self.drops.push(RainDrop {
            id: self.spawned,
            rect: TargetRect::square(Vec2::new(x, y), self.target_size),
        });
    }

    fn check_finished(&mut self, plan: &RainPlan) {
        if self.finished.is_some() {
            return;
        }
        if self.escaped > plan.allowed_escapes {
            log::debug!("Rain: {} escaped (budget {})", self.escaped, plan.allowed_escapes);
            self.finished = Some(false);
        } else if self.spawned >= plan.total_targets && self.drops.is_empty() {
            self.finished = Some(true);
        }
    }
}

impl RainSpawner for FallingRain {
    fn begin(&mut self, plan: &RainPlan) {
        self.plan = Some(*plan);
        self.rng = Pcg32::seed_from_u64(plan.seed);
        self.drops.clear();
        self.spawned = 0;
        self.hit = 0;
        self.escaped = 0;
        self.next_spawn_in = 0.0;
        self.finished = None;
        self.spawn_drop();
        self.next_spawn_in = plan.spawn_interval_secs.max(MIN_SPAWN_INTERVAL);
    }

    fn update(&mut self, dt: f32) {
        let Some(plan) = self.plan else {
            return;
        };
        if self.finished.is_some() {
            return;
        }

        self.next_spawn_in -= dt;
        while self.next_spawn_in <= 0.0 && self.spawned < plan.total_targets {
            self.spawn_drop();
            self.next_spawn_in += plan.spawn_interval_secs.max(MIN_SPAWN_INTERVAL);
        }

        let bottom = -self.plane_size.y * 0.5;
        let fall = plan.fall_speed * dt;
        let before = self.drops.len();
        for drop in &mut self.drops {
            drop.rect.center.y -= fall;
        }
        self.drops.retain(|d| d.rect.min().y > bottom);
        self.escaped += (before - self.drops.len()) as u32;

        self.check_finished(&plan);
    }

    fn try_hit(&mut self, pos: Vec2) -> Option<RainHit> {
        let plan = self.plan?;
        if self.finished.is_some() {
            return None;
        }
        // Newest target is drawn on top
        let idx = self.drops.iter().rposition(|d| d.rect.contains_point(pos))?;
        let drop = self.drops.remove(idx);
        self.hit += 1;
        self.check_finished(&plan);
        Some(RainHit {
            rect: drop.rect,
            local: drop.rect.to_local(pos),
        })
    }

    fn targets_left(&self) -> u32 {
        match self.plan {
            Some(plan) => plan.total_targets.saturating_sub(self.hit + self.escaped),
            None => 0,
        }
    }

    fn live_targets(&self) -> Vec<TargetRect> {
        self.drops.iter().map(|d| d.rect).collect()
    }

    fn poll_finished(&mut self) -> Option<bool> {
        self.finished
    }

    fn end(&mut self) {
        self.plan = None;
        self.drops.clear();
        self.finished = None;
    }
}
