//! Platform abstraction layer
//!
//! The capture core never draws, plays sounds or awards items itself. It
//! talks to the host through these traits:
//! - `Display`: prompt text, status line and hit feedback
//! - `OutcomeSink`: success/failure notification with the target handle
//! - `ModalGate`: "an overlay is open, ignore everything"

use glam::Vec2;

use crate::sim::state::{CatchTarget, FailReason};

/// A single text element the host can show or hide
pub trait Surface {
    fn show(&mut self, text: &str);
    fn hide(&mut self);
}

/// Outbound presentation calls
pub trait Display {
    fn show_prompt(&mut self, text: &str);
    fn clear_prompt(&mut self);
    fn show_status(&mut self, score_total: u32, targets_left: u32, points_needed: u32);
    /// `local` is relative to the target center
    fn show_hit_feedback(&mut self, local: Vec2, score: u32);
    fn hide_hit_feedback(&mut self);
    /// Timing cue fired (audio/visual flash)
    fn cue(&mut self) {}
}

/// Success/failure notification
pub trait OutcomeSink {
    fn on_success(&mut self, target: &CatchTarget);
    fn on_failure(&mut self, target: &CatchTarget, reason: FailReason);
}

/// Opaque modal overlay (tutorial popups and the like)
pub trait ModalGate {
    fn is_open(&self) -> bool;
}

impl ModalGate for bool {
    fn is_open(&self) -> bool {
        *self
    }
}

/// Gate that is never open
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModal;

impl ModalGate for NoModal {
    fn is_open(&self) -> bool {
        false
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn show_prompt(&mut self, _text: &str) {}
    fn clear_prompt(&mut self) {}
    fn show_status(&mut self, _score_total: u32, _targets_left: u32, _points_needed: u32) {}
    fn show_hit_feedback(&mut self, _local: Vec2, _score: u32) {}
    fn hide_hit_feedback(&mut self) {}
}

/// Writes every display call to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDisplay;

impl Display for LogDisplay {
    fn show_prompt(&mut self, text: &str) {
        log::info!("[prompt] {}", text);
    }

    fn clear_prompt(&mut self) {
        log::debug!("[prompt] cleared");
    }

    fn show_status(&mut self, score_total: u32, targets_left: u32, points_needed: u32) {
        log::info!(
            "[status] total {} | targets left {} | need {}",
            score_total,
            targets_left,
            points_needed
        );
    }

    fn show_hit_feedback(&mut self, local: Vec2, score: u32) {
        log::info!("[hit] +{} at ({:.1}, {:.1})", score, local.x, local.y);
    }

    fn hide_hit_feedback(&mut self) {
        log::debug!("[hit] hidden");
    }

    fn cue(&mut self) {
        log::info!("[cue] !");
    }
}

/// In-memory surface holding the last shown text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSurface {
    pub text: Option<String>,
}

impl Surface for TextSurface {
    fn show(&mut self, text: &str) {
        self.text = Some(text.to_string());
    }

    fn hide(&mut self) {
        self.text = None;
    }
}

/// `Display` built from three plain surfaces
#[derive(Debug, Clone, Default)]
pub struct SurfaceDisplay<S: Surface> {
    pub prompt: S,
    pub status: S,
    pub feedback: S,
}

impl<S: Surface> SurfaceDisplay<S> {
    pub fn new(prompt: S, status: S, feedback: S) -> Self {
        Self {
            prompt,
            status,
            feedback,
        }
    }
}

impl<S: Surface> Display for SurfaceDisplay<S> {
    fn show_prompt(&mut self, text: &str) {
        self.prompt.show(text);
    }

    fn clear_prompt(&mut self) {
        self.prompt.hide();
    }

    fn show_status(&mut self, score_total: u32, targets_left: u32, points_needed: u32) {
        self.status.show(&format!(
            "Score {}  Targets {}  Need {}",
            score_total, targets_left, points_needed
        ));
    }

    fn show_hit_feedback(&mut self, local: Vec2, score: u32) {
        self.feedback
            .show(&format!("+{} ({:.0}, {:.0})", score, local.x, local.y));
    }

    fn hide_hit_feedback(&mut self) {
        self.feedback.hide();
    }
}

/// Recorded outcome notification
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeEvent {
    Success { target_id: u64 },
    Failure { target_id: u64, reason: FailReason },
}

/// Sink that logs and keeps every notification
#[derive(Debug, Clone, Default)]
pub struct OutcomeLog {
    pub events: Vec<OutcomeEvent>,
}

impl OutcomeLog {
    pub fn last(&self) -> Option<&OutcomeEvent> {
        self.events.last()
    }

    pub fn successes(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, OutcomeEvent::Success { .. }))
            .count()
    }
}

impl OutcomeSink for OutcomeLog {
    fn on_success(&mut self, target: &CatchTarget) {
        log::info!("Caught {} (#{})", target.name, target.id);
        self.events.push(OutcomeEvent::Success {
            target_id: target.id,
        });
    }

    fn on_failure(&mut self, target: &CatchTarget, reason: FailReason) {
        log::info!("{} (#{}) got away: {}", target.name, target.id, reason);
        self.events.push(OutcomeEvent::Failure {
            target_id: target.id,
            reason,
        });
    }
}
