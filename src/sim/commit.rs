//! Reaction-bar commit prompt
//!
//! Before any rounds run, the player must stop a sweeping marker inside a
//! valid zone. Higher tiers get a narrower zone.

use serde::{Deserialize, Serialize};

use super::state::Tier;
use crate::settings::CommitSettings;

/// Narrowest zone any tier can get
const MIN_ZONE_WIDTH: f32 = 0.02;
/// Slowest sweep allowed (bar lengths/s), so a sweep always ends
const MIN_MARKER_SPEED: f32 = 0.05;

/// Result of one bar update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitVerdict {
    Pending,
    /// Pressed inside the zone
    Landed,
    /// Pressed before the zone
    Early,
    /// Pressed after the zone, or the sweep ended unpressed
    Late,
}

/// Collaborator that runs the commit prompt
pub trait ReactionBar {
    /// Reset for a new session at the given tier
    fn begin(&mut self, tier: Tier);
    /// Advance by `dt` seconds. `pressed` is already filtered by the owner.
    fn update(&mut self, dt: f32, pressed: bool) -> CommitVerdict;
    /// Marker position (0-1)
    fn marker(&self) -> f32;
    /// Valid zone as (start, end), both in 0-1
    fn zone(&self) -> (f32, f32);
}

/// Built-in bar: the marker sweeps 0 → 1 once
#[derive(Debug, Clone)]
pub struct SweepBar {
    settings: CommitSettings,
    marker: f32,
    zone: (f32, f32),
    verdict: CommitVerdict,
}

impl SweepBar {
    pub fn from_settings(settings: &CommitSettings) -> Self {
        let mut bar = Self {
            settings: settings.clone(),
            marker: 0.0,
            zone: (0.0, 0.0),
            verdict: CommitVerdict::Pending,
        };
        bar.begin(Tier::Common);
        bar
    }

    fn zone_for(&self, tier: Tier) -> (f32, f32) {
        let shrink = 1.0 - self.settings.zone_shrink_per_tier * tier.index() as f32;
        let width = (self.settings.zone_width * shrink).max(MIN_ZONE_WIDTH);
        let start = crate::clamp01(self.settings.zone_center - width * 0.5);
        let end = crate::clamp01(self.settings.zone_center + width * 0.5);
        (start, end.max(start))
    }
}

impl ReactionBar for SweepBar {
    fn begin(&mut self, tier: Tier) {
        self.marker = 0.0;
        self.zone = self.zone_for(tier);
        self.verdict = CommitVerdict::Pending;
    }

    fn update(&mut self, dt: f32, pressed: bool) -> CommitVerdict {
        if self.verdict != CommitVerdict::Pending {
            return self.verdict;
        }

        if pressed {
            let (start, end) = self.zone;
            self.verdict = if self.marker < start {
                CommitVerdict::Early
            } else if self.marker <= end {
                CommitVerdict::Landed
            } else {
                CommitVerdict::Late
            };
            return self.verdict;
        }

        self.marker += self.settings.marker_speed.max(MIN_MARKER_SPEED) * dt.max(0.0);
        if self.marker >= 1.0 {
            self.marker = 1.0;
            self.verdict = CommitVerdict::Late;
        }
        self.verdict
    }

    fn marker(&self) -> f32 {
        self.marker
    }

    fn zone(&self) -> (f32, f32) {
        self.zone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar() -> SweepBar {
        SweepBar::from_settings(&CommitSettings::default())
    }

    /// Sweep until the marker is in the zone
    fn sweep_into_zone(bar: &mut SweepBar) {
        let (start, _) = bar.zone();
        while bar.marker() < start {
            assert_eq!(bar.update(0.01, false), CommitVerdict::Pending);
        }
    }

    #[test]
    fn test_press_inside_zone_lands() {
        let mut bar = bar();
        sweep_into_zone(&mut bar);
        assert_eq!(bar.update(0.01, true), CommitVerdict::Landed);
    }

    #[test]
    fn test_press_before_zone_is_early() {
        let mut bar = bar();
        bar.update(0.1, false);
        assert_eq!(bar.update(0.01, true), CommitVerdict::Early);
        // Verdict sticks
        assert_eq!(bar.update(0.01, false), CommitVerdict::Early);
    }

    #[test]
    fn test_unpressed_sweep_ends_late() {
        let mut bar = bar();
        let mut verdict = CommitVerdict::Pending;
        for _ in 0..1000 {
            verdict = bar.update(0.01, false);
            if verdict != CommitVerdict::Pending {
                break;
            }
        }
        assert_eq!(verdict, CommitVerdict::Late);
        assert_eq!(bar.marker(), 1.0);
    }

    #[test]
    fn test_zone_narrows_with_tier() {
        let mut bar = bar();
        bar.begin(Tier::Common);
        let (a, b) = bar.zone();
        bar.begin(Tier::Legendary);
        let (c, d) = bar.zone();
        assert!(d - c < b - a);
        assert!(d - c >= MIN_ZONE_WIDTH - 1e-6);
    }
}
