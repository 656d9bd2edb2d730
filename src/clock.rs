//! World time-flow control
//!
//! The surrounding simulation scales its delta time by `WorldClock::scale()`.
//! Independent systems pause it with `pause()` and get a token back; each
//! `resume(token)` restores exactly the scale that was observed when that
//! pause was taken, so nested pauses never clobber each other's restore value.

use serde::{Deserialize, Serialize};

/// Receipt for one pause request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PauseToken(u64);

/// Shared pause/resume-capable time scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldClock {
    scale: f32,
    /// Active pauses, oldest first, with the scale each one must restore
    pauses: Vec<(PauseToken, f32)>,
    next_token: u64,
}

impl Default for WorldClock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl WorldClock {
    pub fn new(scale: f32) -> Self {
        Self {
            scale: scale.max(0.0),
            pauses: Vec::new(),
            next_token: 1,
        }
    }

    /// Current time scale (0 while any pause is active)
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn is_paused(&self) -> bool {
        !self.pauses.is_empty()
    }

    /// Number of outstanding pauses
    pub fn depth(&self) -> usize {
        self.pauses.len()
    }

    /// Scale a raw delta by the current time scale
    pub fn scaled(&self, dt: f32) -> f32 {
        dt * self.scale
    }

    /// Change the running scale. While paused, the new value is what the
    /// outermost pause will restore.
    pub fn set_scale(&mut self, scale: f32) {
        let scale = scale.max(0.0);
        match self.pauses.first_mut() {
            Some((_, restore)) => *restore = scale,
            None => self.scale = scale,
        }
    }

    /// Stop time flow, remembering the current scale
    pub fn pause(&mut self) -> PauseToken {
        let token = PauseToken(self.next_token);
        self.next_token += 1;
        self.pauses.push((token, self.scale));
        self.scale = 0.0;
        log::debug!("World clock paused ({:?}, depth {})", token, self.pauses.len());
        token
    }

    /// Release a pause. Returns false for an unknown or already-released token.
    pub fn resume(&mut self, token: PauseToken) -> bool {
        let Some(idx) = self.pauses.iter().position(|(t, _)| *t == token) else {
            log::warn!("Resume with unknown pause token {:?}", token);
            return false;
        };

        let (_, restore) = self.pauses.remove(idx);
        if idx == self.pauses.len() {
            // Innermost pause: restore what it observed
            self.scale = restore;
        } else {
            // Released out of order: the pause taken after it inherits its restore value
            self.pauses[idx].1 = restore;
        }
        log::debug!("World clock resumed ({:?}, scale {})", token, self.scale);
        true
    }
}
