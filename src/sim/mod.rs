//! Deterministic capture simulation
//!
//! All minigame logic lives here. This module must be pure and deterministic:
//! - Time only advances through `tick`
//! - Seeded RNG only
//! - No rendering or platform dependencies beyond the collaborator traits

pub mod aim;
pub mod commit;
pub mod movement;
pub mod rain;
pub mod rect;
pub mod scoring;
pub mod state;
pub mod tick;
pub mod timing;

pub use aim::{AimEvent, AimRound, AimStage};
pub use commit::{CommitVerdict, ReactionBar, SweepBar};
pub use movement::{Bounds, Motion, MovementMode, MovementProfile};
pub use rain::{FallingRain, RainHit, RainPlan, RainRound, RainSpawner};
pub use rect::TargetRect;
pub use scoring::{ScoreCurve, score};
pub use state::{
    CaptureOutcome, CapturePhase, CaptureRecord, CaptureSession, CatchTarget, FailReason, Stage,
    TargetOverrides, Tier,
};
pub use tick::{CaptureMachine, Hooks, Press, TickInput};
pub use timing::{TimingEvent, TimingRound, TimingStage};
