//! Cue-reaction rounds
//!
//! One round: wait a random delay for the cue, then press within the window.
//!
//! ```text
//! Arming ──arm(now)──▶ WaitingForCue ──now ≥ cue_at──▶ WindowOpen ──press──▶ Resolved
//!                          │ press                         │ now > window_end
//!                          ▼                               ▼
//!                       too soon                        too slow
//! ```
//!
//! The round stays in `Arming` until the owner arms it, so the cue time is
//! only computed once any modal overlay has closed.

use serde::{Deserialize, Serialize};

/// Stage of a single timing round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingStage {
    /// Not yet counting (waiting for the owner to arm)
    Arming,
    /// Counting down to the cue; any press is too soon
    WaitingForCue,
    /// Cue fired; press before the window closes
    WindowOpen,
    /// Round finished (hit or fail)
    Resolved,
}

/// What happened this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimingEvent {
    None,
    /// Cue just fired (notify audio/visual collaborators)
    Cue,
    /// Pressed inside the window
    Hit { reaction_secs: f32 },
    /// Pressed before the cue
    TooSoon,
    /// Window closed with no press
    TooSlow,
}

/// One cue-reaction round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingRound {
    pub stage: TimingStage,
    /// Sampled wait before the cue (seconds)
    pub delay_secs: f32,
    /// Reaction window after the cue (seconds)
    pub window_secs: f32,
    /// Session time the cue is due
    pub cue_at: f64,
    /// Session time the window closes
    pub window_end: f64,
    /// Session time the cue actually fired
    pub cue_fired_at: Option<f64>,
}

impl TimingRound {
    pub fn new(delay_secs: f32, window_secs: f32) -> Self {
        Self {
            stage: TimingStage::Arming,
            delay_secs: delay_secs.max(0.0),
            window_secs: window_secs.max(0.0),
            cue_at: 0.0,
            window_end: 0.0,
            cue_fired_at: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.stage != TimingStage::Arming
    }

    /// Start counting from `now`
    pub fn arm(&mut self, now: f64) {
        if self.is_armed() {
            return;
        }
        self.cue_at = now + self.delay_secs as f64;
        self.window_end = self.cue_at + self.window_secs as f64;
        self.stage = TimingStage::WaitingForCue;
    }

    /// Advance the round. `pressed` must already be filtered by the owner's
    /// input-ignore window.
    pub fn update(&mut self, now: f64, pressed: bool) -> TimingEvent {
        match self.stage {
            TimingStage::Arming | TimingStage::Resolved => TimingEvent::None,

            TimingStage::WaitingForCue => {
                if now < self.cue_at {
                    if pressed {
                        self.stage = TimingStage::Resolved;
                        return TimingEvent::TooSoon;
                    }
                    return TimingEvent::None;
                }
                // The cue tick itself consumes nothing
                self.stage = TimingStage::WindowOpen;
                self.cue_fired_at = Some(now);
                self.window_end = now + self.window_secs as f64;
                TimingEvent::Cue
            }

            TimingStage::WindowOpen => {
                let fired = self.cue_fired_at.unwrap_or(self.cue_at);
                if pressed && now <= self.window_end {
                    self.stage = TimingStage::Resolved;
                    return TimingEvent::Hit {
                        reaction_secs: (now - fired) as f32,
                    };
                }
                if now > self.window_end {
                    self.stage = TimingStage::Resolved;
                    return TimingEvent::TooSlow;
                }
                TimingEvent::None
            }
        }
    }
}
