//! Catch Core - reaction-timing and precision-aiming capture minigame
//!
//! Core modules:
//! - `sim`: Deterministic capture simulation (phases, scoring, target motion)
//! - `tuning`: Data-driven per-tier balance
//! - `clock`: Nestable pause/resume of the surrounding world's time flow
//! - `platform`: Display/outcome/modal collaborator abstraction
//! - `settings`: Global constants and fallbacks

pub mod clock;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use clock::{PauseToken, WorldClock};
pub use settings::{CaptureSettings, ConfigError};
pub use tuning::{CatchMode, TierTuning, TuningTable};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (one rendered tick at 60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Aim plane dimensions (plane units, origin at center, +y up)
    pub const PLANE_WIDTH: f32 = 640.0;
    pub const PLANE_HEIGHT: f32 = 400.0;

    /// Base aim target edge length before tier scaling
    pub const BASE_TARGET_SIZE: f32 = 72.0;

    /// Travel below this on an axis counts as degenerate bounds
    pub const BOUNDS_EPSILON: f32 = 0.5;
}

/// Random unit vector from an angle in radians
#[inline]
pub fn unit_from_angle(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Clamp to [0, 1], mapping NaN to 0
#[inline]
pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
