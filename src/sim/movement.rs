//! Aim target movement
//!
//! Per-tick trajectory update for single-target aim rounds. Each tier carries
//! a `MovementProfile`; the mode is resolved once when the round starts
//! (`RandomPick` is never re-rolled mid-round) and then stepped with unscaled
//! time, since the world clock is paused while a capture runs.
//!
//! Boundary handling is per axis: a target that crosses the travel bounds is
//! clamped back onto the edge and its velocity component on that axis is
//! either reflected (bounce) or zeroed (stop).

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::BOUNDS_EPSILON;
use crate::unit_from_angle;

/// Shortest allowed wander re-pick interval
const MIN_CHANGE_INTERVAL: f32 = 0.05;

/// Movement behavior for an aim target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementMode {
    /// Target stays put
    #[default]
    None,
    /// Falls from the top edge at a fixed speed
    Drop,
    /// Drifts in one random direction, then stops for good
    DriftTimed,
    /// Re-picks a random direction and speed on an interval
    Wander,
    /// Picks one of the profile's enabled modes at round start
    RandomPick,
}

/// Per-tier movement tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementProfile {
    pub mode: MovementMode,
    /// Reflect velocity at the bounds instead of stopping on that axis
    pub bounce_at_edges: bool,

    /// Drop: fall speed (plane units/s)
    pub drop_speed: f32,
    /// Drop: halt permanently on reaching the bottom edge
    pub stop_at_bottom: bool,
    /// Drop: reaching the bottom edge ends the aim round as a timeout
    pub end_round_at_bottom: bool,

    /// DriftTimed: speed (plane units/s)
    pub drift_speed: f32,
    /// DriftTimed: seconds of motion before freezing
    pub drift_secs: f32,

    /// Wander: speed range (plane units/s)
    pub wander_min_speed: f32,
    pub wander_max_speed: f32,
    /// Wander: seconds between direction/speed changes
    pub change_every_secs: f32,

    /// RandomPick: modes to choose from uniformly
    pub pick_from: Vec<MovementMode>,
}

impl Default for MovementProfile {
    fn default() -> Self {
        Self {
            mode: MovementMode::None,
            bounce_at_edges: true,
            drop_speed: 120.0,
            stop_at_bottom: false,
            end_round_at_bottom: false,
            drift_speed: 90.0,
            drift_secs: 1.0,
            wander_min_speed: 60.0,
            wander_max_speed: 140.0,
            change_every_secs: 0.8,
            pick_from: Vec::new(),
        }
    }
}

impl MovementProfile {
    /// Static profile (no movement)
    pub fn still() -> Self {
        Self::default()
    }

    /// Clamp negative/non-finite parameters to zero and order the wander range
    pub fn sanitized(mut self) -> Self {
        let fix = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        self.drop_speed = fix(self.drop_speed);
        self.drift_speed = fix(self.drift_speed);
        self.drift_secs = fix(self.drift_secs);
        self.wander_min_speed = fix(self.wander_min_speed);
        self.wander_max_speed = fix(self.wander_max_speed);
        self.change_every_secs = fix(self.change_every_secs);
        if self.wander_min_speed > self.wander_max_speed {
            std::mem::swap(&mut self.wander_min_speed, &mut self.wander_max_speed);
        }
        self.pick_from
            .retain(|m| !matches!(m, MovementMode::RandomPick));
        self
    }
}

/// Region the target center may travel in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Travel region for a target of `target_half` half-size on a plane of
    /// `plane_size` centered at the origin
    pub fn for_target(plane_size: Vec2, target_half: Vec2) -> Self {
        let half = plane_size * 0.5 - target_half;
        Self {
            min: -half,
            max: half,
        }
    }

    #[inline]
    pub fn travel(&self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Too little room on either axis to move (NaN counts as degenerate)
    pub fn is_degenerate(&self) -> bool {
        let t = self.travel();
        !(t.x > BOUNDS_EPSILON && t.y > BOUNDS_EPSILON)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        if self.is_degenerate() {
            return self.center();
        }
        p.clamp(self.min, self.max)
    }
}

/// Which edge an axis collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Low,
    High,
}

/// Live motion state of one aim target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub pos: Vec2,
    /// Plane units/second, not affected by the world time scale
    pub vel: Vec2,
    /// Resolved mode (never `RandomPick`)
    pub mode: MovementMode,
    /// Unscaled seconds since motion started
    pub elapsed: f32,
    /// Wander: seconds until the next re-pick
    pub next_change: f32,
    /// Permanently stopped for this round
    pub halted: bool,
    /// Drop: target has hit the bottom edge
    pub reached_bottom: bool,
}

impl Motion {
    /// Motionless target at `pos`
    pub fn stationary(pos: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            mode: MovementMode::None,
            elapsed: 0.0,
            next_change: 0.0,
            halted: true,
            reached_bottom: false,
        }
    }

    /// Begin motion for a round. Degenerate bounds disable movement.
    pub fn start(profile: &MovementProfile, pos: Vec2, bounds: &Bounds, rng: &mut impl Rng) -> Self {
        if bounds.is_degenerate() {
            if profile.mode != MovementMode::None {
                log::warn!("Degenerate aim bounds {:?}, target will be static", bounds);
            }
            return Self::stationary(pos);
        }

        let mode = resolve_mode(profile, rng);
        let mut motion = Self::stationary(pos);
        motion.mode = mode;
        motion.halted = false;

        match mode {
            MovementMode::None | MovementMode::RandomPick => {
                motion.mode = MovementMode::None;
                motion.halted = true;
            }
            MovementMode::Drop => {
                motion.vel = Vec2::new(0.0, -profile.drop_speed);
            }
            MovementMode::DriftTimed => {
                motion.vel = random_direction(rng) * profile.drift_speed;
            }
            MovementMode::Wander => {
                motion.vel = wander_velocity(profile, rng);
                motion.next_change = profile.change_every_secs.max(MIN_CHANGE_INTERVAL);
            }
        }

        motion
    }

    pub fn is_moving(&self) -> bool {
        !self.halted && self.vel != Vec2::ZERO
    }

    /// Freeze in place (player clicked)
    pub fn stop(&mut self) {
        self.vel = Vec2::ZERO;
        self.halted = true;
    }
}

/// Resolve `RandomPick` to a concrete mode (uniform over enabled sub-modes)
pub fn resolve_mode(profile: &MovementProfile, rng: &mut impl Rng) -> MovementMode {
    if profile.mode != MovementMode::RandomPick {
        return profile.mode;
    }

    let choices: Vec<MovementMode> = profile
        .pick_from
        .iter()
        .copied()
        .filter(|m| *m != MovementMode::RandomPick)
        .collect();

    if choices.is_empty() {
        return MovementMode::None;
    }
    choices[rng.random_range(0..choices.len())]
}

fn random_direction(rng: &mut impl Rng) -> Vec2 {
    unit_from_angle(rng.random_range(0.0..std::f32::consts::TAU))
}

fn wander_velocity(profile: &MovementProfile, rng: &mut impl Rng) -> Vec2 {
    let lo = profile.wander_min_speed.min(profile.wander_max_speed);
    let hi = profile.wander_min_speed.max(profile.wander_max_speed);
    let speed = if hi > lo { rng.random_range(lo..=hi) } else { lo };
    random_direction(rng) * speed
}

/// Clamp one axis into [min, max]; returns the edge that was crossed
fn clamp_axis(pos: &mut f32, min: f32, max: f32) -> Option<Edge> {
    if *pos < min {
        *pos = min;
        Some(Edge::Low)
    } else if *pos > max {
        *pos = max;
        Some(Edge::High)
    } else {
        None
    }
}

/// Velocity component after hitting `edge`
fn collide(vel: f32, edge: Edge, bounce: bool) -> f32 {
    if !bounce {
        return 0.0;
    }
    // Always point back inside, so a target resting on the edge cannot stick
    match edge {
        Edge::Low => vel.abs(),
        Edge::High => -vel.abs(),
    }
}

/// Advance target motion by `dt` unscaled seconds
pub fn step(
    profile: &MovementProfile,
    motion: Motion,
    bounds: &Bounds,
    dt: f32,
    rng: &mut impl Rng,
) -> Motion {
    let mut m = motion;
    if m.halted || m.mode == MovementMode::None {
        return m;
    }
    if bounds.is_degenerate() {
        m.stop();
        return m;
    }

    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
    m.elapsed += dt;

    match m.mode {
        MovementMode::DriftTimed if m.elapsed >= profile.drift_secs => {
            m.stop();
            return m;
        }
        MovementMode::Wander => {
            m.next_change -= dt;
            if m.next_change <= 0.0 {
                m.vel = wander_velocity(profile, rng);
                m.next_change = profile.change_every_secs.max(MIN_CHANGE_INTERVAL);
            }
        }
        _ => {}
    }

    m.pos += m.vel * dt;

    let bounce = profile.bounce_at_edges;

    if let Some(edge) = clamp_axis(&mut m.pos.x, bounds.min.x, bounds.max.x) {
        m.vel.x = collide(m.vel.x, edge, bounce);
    }

    if let Some(edge) = clamp_axis(&mut m.pos.y, bounds.min.y, bounds.max.y) {
        if m.mode == MovementMode::Drop && edge == Edge::Low {
            m.reached_bottom = true;
            if profile.stop_at_bottom {
                m.stop();
                return m;
            }
        }
        m.vel.y = collide(m.vel.y, edge, bounce);
    }

    if m.mode == MovementMode::Drop && m.vel == Vec2::ZERO {
        m.halted = true;
    }

    m
}
