//! Capture state machine, polled once per rendered tick
//!
//! ```text
//! Idle ─select─▶ Committing ─landed─▶ PhasePlanning ─▶ Aiming/Raining ─▶ Timing ─▶ Idle
//!                    │ early/late                          │ fail             │ fail
//!                    ▼                                     ▼                  ▼
//!                  Idle (failure)                        Idle (failure)     Idle (failure)
//! ```
//!
//! Every stage change sets a short input-ignore window so the press that
//! caused it is not reinterpreted by the new stage. Each round stays unarmed
//! until its first non-modal tick, so deadlines are computed only once the
//! round is really running.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::aim::{AimEvent, AimRound};
use super::commit::{CommitVerdict, ReactionBar, SweepBar};
use super::rain::{FallingRain, RainPlan, RainRound, RainShot, RainSpawner, RainVerdict};
use super::state::{
    CaptureOutcome, CapturePhase, CaptureRecord, CaptureSession, CatchTarget, FailReason, Stage,
};
use super::timing::{TimingEvent, TimingRound};
use crate::clock::WorldClock;
use crate::platform::{Display, ModalGate, OutcomeSink};
use crate::settings::CaptureSettings;
use crate::tuning::{TuningTable, plan_rounds};

/// A single press this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Press {
    /// Pointer press at a plane position
    Pointer(Vec2),
    /// Key/button press with no position
    Key,
}

impl Press {
    pub fn position(self) -> Option<Vec2> {
        match self {
            Press::Pointer(pos) => Some(pos),
            Press::Key => None,
        }
    }
}

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Press that started this tick
    pub press: Option<Press>,
    /// Pointer/button currently held down
    pub pointer_held: bool,
}

impl TickInput {
    pub fn click(pos: Vec2) -> Self {
        Self {
            press: Some(Press::Pointer(pos)),
            pointer_held: true,
        }
    }
}

/// Host collaborators borrowed for one call
pub struct Hooks<'a> {
    pub display: &'a mut dyn Display,
    pub outcomes: &'a mut dyn OutcomeSink,
    pub modal: &'a dyn ModalGate,
    pub clock: &'a mut WorldClock,
}

enum Flow {
    Continue,
    Resolve(CaptureOutcome),
}

/// Top-level capture orchestrator
pub struct CaptureMachine {
    settings: CaptureSettings,
    tuning: TuningTable,
    rng: Pcg32,
    /// Session seconds, frozen while the modal gate is open
    now: f64,
    session: Option<CaptureSession>,
    ignore_ticks: u32,
    external_input: bool,
    /// Re-enable external input once the pointer is released
    rearm_pending: bool,
    reaction_bar: Box<dyn ReactionBar>,
    rain: Box<dyn RainSpawner>,
    last_record: Option<CaptureRecord>,
}

impl CaptureMachine {
    /// Machine with the built-in reaction bar and rain spawner
    pub fn new(settings: CaptureSettings, tuning: TuningTable, seed: u64) -> Self {
        let settings = settings.sanitized();
        let bar = Box::new(SweepBar::from_settings(&settings.commit));
        let rain = Box::new(FallingRain::new(
            settings.plane_size(),
            settings.base_target_size,
        ));
        Self::with_collaborators(settings, tuning, seed, bar, rain)
    }

    pub fn with_collaborators(
        settings: CaptureSettings,
        tuning: TuningTable,
        seed: u64,
        reaction_bar: Box<dyn ReactionBar>,
        rain: Box<dyn RainSpawner>,
    ) -> Self {
        Self {
            settings: settings.sanitized(),
            tuning: tuning.sanitized(),
            rng: Pcg32::seed_from_u64(seed),
            now: 0.0,
            session: None,
            ignore_ticks: 0,
            external_input: true,
            rearm_pending: false,
            reaction_bar,
            rain,
            last_record: None,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.session
            .as_ref()
            .map_or(CapturePhase::Idle, CaptureSession::phase)
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn tuning(&self) -> &TuningTable {
        &self.tuning
    }

    /// Whether the host may dispatch clicks to the world
    pub fn external_input_enabled(&self) -> bool {
        self.external_input
    }

    /// Summary of the most recently resolved capture
    pub fn last_record(&self) -> Option<&CaptureRecord> {
        self.last_record.as_ref()
    }

    pub fn reaction_bar(&self) -> &dyn ReactionBar {
        self.reaction_bar.as_ref()
    }

    pub fn rain_spawner(&self) -> &dyn RainSpawner {
        self.rain.as_ref()
    }

    /// Start a session. Ignored (returns false) unless idle with external
    /// input re-armed, so the press that resolved the previous capture
    /// cannot select the next target.
    pub fn select_target(&mut self, target: CatchTarget, hooks: &mut Hooks<'_>) -> bool {
        if let Some(active) = &self.session {
            log::warn!(
                "Ignoring {}: already capturing {}",
                target.name,
                active.target.name
            );
            return false;
        }
        if self.rearm_pending {
            log::warn!("Ignoring {}: pointer not released since last capture", target.name);
            return false;
        }

        let token = hooks.clock.pause();
        self.external_input = false;
        self.rearm_pending = false;

        let session = CaptureSession::new(target, self.now, token);
        log::info!(
            "Capture started: {} (#{}, {})",
            session.target.name,
            session.target.id,
            session.tier.as_str()
        );
        self.reaction_bar.begin(session.tier);
        hooks.display.show_prompt("Press when the marker is in the zone!");
        self.session = Some(session);
        self.mark_transition();
        true
    }

    /// Abandon the active session as a failure. Returns false when idle.
    pub fn cancel(&mut self, hooks: &mut Hooks<'_>) -> bool {
        match self.session.take() {
            Some(session) => {
                self.finish(session, CaptureOutcome::Failure(FailReason::Cancelled), hooks);
                true
            }
            None => false,
        }
    }

    /// Advance by one rendered tick of `dt` unscaled seconds
    pub fn tick(&mut self, input: &TickInput, dt: f32, hooks: &mut Hooks<'_>) {
        if self.rearm_pending && !input.pointer_held {
            self.rearm_pending = false;
            self.external_input = true;
            log::debug!("External input re-armed");
        }

        if self.session.is_none() || hooks.modal.is_open() {
            return;
        }

        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.now += dt as f64;

        let press = if self.ignore_ticks > 0 {
            self.ignore_ticks -= 1;
            None
        } else {
            input.press
        };

        let Some(mut session) = self.session.take() else {
            return;
        };
        match self.advance(&mut session, press, dt, hooks) {
            Flow::Continue => self.session = Some(session),
            Flow::Resolve(outcome) => self.finish(session, outcome, hooks),
        }
    }

    fn mark_transition(&mut self) {
        self.ignore_ticks = self.settings.input_ignore_ticks.max(1);
    }

    fn advance(
        &mut self,
        session: &mut CaptureSession,
        press: Option<Press>,
        dt: f32,
        hooks: &mut Hooks<'_>,
    ) -> Flow {
        match session.phase() {
            CapturePhase::Idle => Flow::Continue,
            CapturePhase::Committing => self.advance_commit(session, press, dt, hooks),
            CapturePhase::PhasePlanning => self.plan(session, hooks),
            CapturePhase::Aiming => self.advance_aim(session, press, dt, hooks),
            CapturePhase::Raining => self.advance_rain(session, press, dt, hooks),
            CapturePhase::Timing => self.advance_timing(session, press, hooks),
        }
    }

    fn advance_commit(
        &mut self,
        session: &mut CaptureSession,
        press: Option<Press>,
        dt: f32,
        hooks: &mut Hooks<'_>,
    ) -> Flow {
        match self.reaction_bar.update(dt, press.is_some()) {
            CommitVerdict::Pending => Flow::Continue,
            CommitVerdict::Landed => {
                log::debug!("Commit landed at {:.3}", self.reaction_bar.marker());
                session.stage = Stage::Planning;
                hooks.display.clear_prompt();
                self.mark_transition();
                Flow::Continue
            }
            CommitVerdict::Early => Flow::Resolve(CaptureOutcome::Failure(FailReason::TooEarly)),
            CommitVerdict::Late => Flow::Resolve(CaptureOutcome::Failure(FailReason::TooLate)),
        }
    }

    fn plan(&mut self, session: &mut CaptureSession, hooks: &mut Hooks<'_>) -> Flow {
        let tuning = self.tuning.get(session.tier);
        let plan = plan_rounds(tuning, session.tier, &session.target.overrides, &self.settings);
        let rain_eligible = tuning.rain_eligible;

        session.aim_remaining = plan.aim_rounds;
        session.timing_remaining = plan.timing_rounds;
        session.aim_threshold_total = plan.aim_threshold;
        session.timing_window_secs = plan.timing_window_secs;
        session.timing_delay = plan.timing_delay;
        log::debug!(
            "Planned {} aim / {} timing rounds (threshold {}, window {:.2}s)",
            plan.aim_rounds,
            plan.timing_rounds,
            plan.aim_threshold,
            plan.timing_window_secs
        );

        if plan.aim_rounds > 0 {
            let rain = rain_eligible
                && plan.aim_rounds >= 2
                && self.rng.random::<f32>() < self.settings.rain.chance;
            if rain {
                self.enter_rain(session, hooks);
            } else {
                self.enter_aim(session, hooks);
            }
            Flow::Continue
        } else if plan.timing_rounds > 0 {
            self.enter_timing(session, hooks);
            Flow::Continue
        } else {
            Flow::Resolve(CaptureOutcome::Success)
        }
    }

    // === Aim ===

    fn enter_aim(&mut self, session: &mut CaptureSession, hooks: &mut Hooks<'_>) {
        let round = AimRound::spawn(
            self.tuning.get(session.tier),
            &self.settings,
            &mut self.rng,
        );
        session.stage = Stage::Aim(round);
        hooks.display.show_prompt("Hit the bullseye!");
        hooks.display.show_status(
            session.aim_score_total,
            session.aim_remaining,
            session.points_needed(),
        );
        self.mark_transition();
    }

    fn advance_aim(
        &mut self,
        session: &mut CaptureSession,
        press: Option<Press>,
        dt: f32,
        hooks: &mut Hooks<'_>,
    ) -> Flow {
        let Stage::Aim(round) = &mut session.stage else {
            return Flow::Continue;
        };
        if !round.is_armed() {
            round.arm(self.now, &mut self.rng);
            return Flow::Continue;
        }

        let click = press.and_then(Press::position);
        match round.update(self.now, dt, click, &self.settings, &mut self.rng) {
            AimEvent::None => Flow::Continue,
            AimEvent::Scored {
                score,
                local,
                inside,
            } => {
                session.record_aim_score(score);
                session.aim_remaining = session.aim_remaining.saturating_sub(1);
                log::debug!(
                    "Aim round scored {} ({}, total {})",
                    score,
                    if inside { "on target" } else { "off target" },
                    session.aim_score_total
                );
                hooks.display.show_hit_feedback(local, score);
                hooks.display.show_status(
                    session.aim_score_total,
                    session.aim_remaining,
                    session.points_needed(),
                );
                self.mark_transition();
                Flow::Continue
            }
            AimEvent::TimedOut => {
                session.record_aim_score(0);
                session.aim_remaining = session.aim_remaining.saturating_sub(1);
                log::debug!("Aim round timed out");
                hooks.display.show_status(
                    session.aim_score_total,
                    session.aim_remaining,
                    session.points_needed(),
                );
                self.next_aim_round(session, hooks)
            }
            AimEvent::Advance => {
                hooks.display.hide_hit_feedback();
                self.next_aim_round(session, hooks)
            }
        }
    }

    fn next_aim_round(&mut self, session: &mut CaptureSession, hooks: &mut Hooks<'_>) -> Flow {
        if session.aim_remaining > 0 {
            self.enter_aim(session, hooks);
            Flow::Continue
        } else {
            self.finish_aim_phase(session, hooks)
        }
    }

    /// Rain rounds are judged by the spawner, not the threshold
    fn finish_aim_phase(&mut self, session: &mut CaptureSession, hooks: &mut Hooks<'_>) -> Flow {
        if !session.rain_mode && !session.aim_threshold_met() {
            log::debug!(
                "Aim total {} below threshold {}",
                session.aim_score_total,
                session.aim_threshold_total
            );
            return Flow::Resolve(CaptureOutcome::Failure(FailReason::LowTotal));
        }
        if session.timing_remaining > 0 {
            self.enter_timing(session, hooks);
            Flow::Continue
        } else {
            Flow::Resolve(CaptureOutcome::Success)
        }
    }

    // === Rain ===

    fn enter_rain(&mut self, session: &mut CaptureSession, hooks: &mut Hooks<'_>) {
        let plan = RainPlan::from_settings(&self.settings.rain, self.rng.random::<u64>());
        let round = RainRound::new(plan, self.settings.rain.extra_bullets);
        log::info!(
            "Rain round: {} targets, {} bullets",
            plan.total_targets,
            round.bullets_total
        );
        session.rain_mode = true;
        session.stage = Stage::Rain(round);
        hooks.display.show_prompt("Shoot them all!");
        hooks
            .display
            .show_status(session.aim_score_total, plan.total_targets, 0);
        self.mark_transition();
    }

    fn advance_rain(
        &mut self,
        session: &mut CaptureSession,
        press: Option<Press>,
        dt: f32,
        hooks: &mut Hooks<'_>,
    ) -> Flow {
        let Stage::Rain(round) = &mut session.stage else {
            return Flow::Continue;
        };
        if !round.armed {
            round.arm(self.rain.as_mut());
            return Flow::Continue;
        }

        let click = press.and_then(Press::position);
        let tick = round.update(dt, click, self.rain.as_mut(), &self.settings.score);

        if let Some(shot) = tick.shot {
            match shot {
                RainShot::Hit { score, local } => {
                    session.record_aim_score(score);
                    hooks.display.show_hit_feedback(local, score);
                }
                RainShot::Miss => hooks.display.hide_hit_feedback(),
            }
            hooks
                .display
                .show_status(session.aim_score_total, self.rain.targets_left(), 0);
        }

        match tick.verdict {
            None => Flow::Continue,
            Some(RainVerdict::Cleared) => {
                self.rain.end();
                hooks.display.hide_hit_feedback();
                self.finish_aim_phase(session, hooks)
            }
            Some(RainVerdict::Escaped) => {
                Flow::Resolve(CaptureOutcome::Failure(FailReason::EscapedTooMany))
            }
            Some(RainVerdict::OutOfBullets) => {
                Flow::Resolve(CaptureOutcome::Failure(FailReason::OutOfBullets))
            }
        }
    }

    // === Timing ===

    fn enter_timing(&mut self, session: &mut CaptureSession, hooks: &mut Hooks<'_>) {
        let (lo, hi) = session.timing_delay;
        let delay = if lo.is_finite() && hi.is_finite() && hi > lo {
            self.rng.random_range(lo..=hi)
        } else if lo.is_finite() {
            lo
        } else {
            self.settings.timing_delay_min
        };
        session.stage = Stage::Timing(TimingRound::new(delay, session.timing_window_secs));
        hooks.display.show_prompt("Wait for it...");
        self.mark_transition();
    }

    fn advance_timing(
        &mut self,
        session: &mut CaptureSession,
        press: Option<Press>,
        hooks: &mut Hooks<'_>,
    ) -> Flow {
        let Stage::Timing(round) = &mut session.stage else {
            return Flow::Continue;
        };
        if !round.is_armed() {
            round.arm(self.now);
            return Flow::Continue;
        }

        match round.update(self.now, press.is_some()) {
            TimingEvent::None => Flow::Continue,
            TimingEvent::Cue => {
                hooks.display.cue();
                hooks.display.show_prompt("NOW!");
                Flow::Continue
            }
            TimingEvent::Hit { reaction_secs } => {
                session.last_reaction_secs = Some(reaction_secs);
                session.timing_remaining = session.timing_remaining.saturating_sub(1);
                log::debug!("Reaction {:.3}s", reaction_secs);
                if session.timing_remaining > 0 {
                    self.enter_timing(session, hooks);
                    Flow::Continue
                } else {
                    Flow::Resolve(CaptureOutcome::Success)
                }
            }
            TimingEvent::TooSoon => Flow::Resolve(CaptureOutcome::Failure(FailReason::TooSoon)),
            TimingEvent::TooSlow => Flow::Resolve(CaptureOutcome::Failure(FailReason::TooSlow)),
        }
    }

    // === Resolution ===

    fn finish(&mut self, mut session: CaptureSession, outcome: CaptureOutcome, hooks: &mut Hooks<'_>) {
        if matches!(session.stage, Stage::Rain(_)) {
            self.rain.end();
        }
        hooks.display.hide_hit_feedback();
        hooks.display.clear_prompt();

        match outcome {
            CaptureOutcome::Success => hooks.outcomes.on_success(&session.target),
            CaptureOutcome::Failure(reason) => hooks.outcomes.on_failure(&session.target, reason),
        }

        if let Some(token) = session.pause.take() {
            hooks.clock.resume(token);
        }
        self.rearm_pending = true;
        self.ignore_ticks = 0;

        match outcome {
            CaptureOutcome::Success => log::info!(
                "Capture of {} succeeded (aim total {})",
                session.target.name,
                session.aim_score_total
            ),
            CaptureOutcome::Failure(reason) => {
                log::info!("Capture of {} failed: {}", session.target.name, reason)
            }
        }
        self.last_record = Some(CaptureRecord::from_session(session, outcome, self.now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::platform::{OutcomeEvent, OutcomeLog};
    use crate::settings::RainSettings;
    use crate::sim::state::{TargetOverrides, Tier};
    use crate::sim::timing::TimingStage;
    use crate::tuning::{CatchMode, TierTuning};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Display for Recorder {
        fn show_prompt(&mut self, text: &str) {
            self.calls.push(format!("prompt {}", text));
        }
        fn clear_prompt(&mut self) {
            self.calls.push("clear".into());
        }
        fn show_status(&mut self, total: u32, left: u32, needed: u32) {
            self.calls.push(format!("status {} {} {}", total, left, needed));
        }
        fn show_hit_feedback(&mut self, _local: Vec2, score: u32) {
            self.calls.push(format!("hit {}", score));
        }
        fn hide_hit_feedback(&mut self) {
            self.calls.push("hide".into());
        }
        fn cue(&mut self) {
            self.calls.push("cue".into());
        }
    }

    #[derive(Default)]
    struct Harness {
        display: Recorder,
        outcomes: OutcomeLog,
        modal: bool,
        clock: WorldClock,
    }

    impl Harness {
        fn hooks(&mut self) -> Hooks<'_> {
            Hooks {
                display: &mut self.display,
                outcomes: &mut self.outcomes,
                modal: &self.modal,
                clock: &mut self.clock,
            }
        }
    }

    fn settings() -> CaptureSettings {
        CaptureSettings {
            rain: RainSettings {
                chance: 0.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn machine(tier: Tier, tuning: TierTuning, settings: CaptureSettings) -> CaptureMachine {
        CaptureMachine::new(settings, TuningTable::default().with_tier(tier, tuning), 7)
    }

    fn step(m: &mut CaptureMachine, h: &mut Harness, press: Option<Press>) {
        let input = TickInput {
            press,
            pointer_held: press.is_some(),
        };
        m.tick(&input, SIM_DT, &mut h.hooks());
    }

    fn click(pos: Vec2) -> Option<Press> {
        Some(Press::Pointer(pos))
    }

    fn land_commit(m: &mut CaptureMachine, h: &mut Harness) {
        let (start, _) = m.reaction_bar().zone();
        for _ in 0..1000 {
            if m.reaction_bar().marker() >= start {
                break;
            }
            step(m, h, None);
        }
        step(m, h, Some(Press::Key));
        assert_eq!(m.phase(), CapturePhase::PhasePlanning);
    }

    /// Select, land the commit, plan and arm the first round
    fn start(m: &mut CaptureMachine, h: &mut Harness, target: CatchTarget) {
        assert!(m.select_target(target, &mut h.hooks()));
        land_commit(m, h);
        step(m, h, None);
        step(m, h, None);
        assert!(m.phase().is_running());
    }

    fn run_until(m: &mut CaptureMachine, h: &mut Harness, phase: CapturePhase) {
        for _ in 0..2000 {
            if m.phase() == phase {
                return;
            }
            step(m, h, None);
        }
        panic!("never reached {:?}", phase);
    }

    fn aim_center(m: &CaptureMachine) -> Vec2 {
        match m.session().map(|s| &s.stage) {
            Some(Stage::Aim(round)) => round.rect.center,
            other => panic!("not aiming: {:?}", other),
        }
    }

    fn cue_fired_at(m: &CaptureMachine) -> Option<f64> {
        match m.session().map(|s| &s.stage) {
            Some(Stage::Timing(round)) => round.cue_fired_at,
            _ => None,
        }
    }

    fn last_outcome(h: &Harness) -> Option<&OutcomeEvent> {
        h.outcomes.last()
    }

    fn failure(reason: FailReason) -> OutcomeEvent {
        OutcomeEvent::Failure {
            target_id: 1,
            reason,
        }
    }

    fn timing_target(delay: f32, window: f32) -> CatchTarget {
        CatchTarget::new(1, "perch", Tier::Common).with_overrides(TargetOverrides {
            timing_delay_min: Some(delay),
            timing_delay_max: Some(delay),
            timing_window: Some(window),
            ..Default::default()
        })
    }

    fn aim_target(tier: Tier, threshold: f32) -> CatchTarget {
        CatchTarget::new(1, "trout", tier).with_overrides(TargetOverrides {
            aim_threshold: Some(threshold),
            ..Default::default()
        })
    }

    #[test]
    fn test_timing_press_after_cue_succeeds() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());
        start(&mut m, &mut h, timing_target(1.0, 1.0));

        for _ in 0..600 {
            if cue_fired_at(&m).is_some() {
                break;
            }
            step(&mut m, &mut h, None);
        }
        assert!(cue_fired_at(&m).is_some());
        assert!(h.display.calls.iter().any(|c| c == "cue"));

        for _ in 0..29 {
            step(&mut m, &mut h, None);
        }
        step(&mut m, &mut h, Some(Press::Key));

        assert_eq!(m.phase(), CapturePhase::Idle);
        assert_eq!(last_outcome(&h), Some(&OutcomeEvent::Success { target_id: 1 }));
        let reaction = m.last_record().and_then(|r| r.last_reaction_secs).unwrap();
        assert!((reaction - 0.5).abs() < 0.01, "reaction {}", reaction);
    }

    #[test]
    fn test_center_click_passes_threshold() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Uncommon, TierTuning::aim_only(1), settings());
        start(&mut m, &mut h, aim_target(Tier::Uncommon, 50.0));

        let center = aim_center(&m);
        step(&mut m, &mut h, click(center));
        assert!(h.display.calls.iter().any(|c| c == "hit 100"));

        run_until(&mut m, &mut h, CapturePhase::Idle);
        assert_eq!(last_outcome(&h), Some(&OutcomeEvent::Success { target_id: 1 }));
        let record = m.last_record().unwrap();
        assert_eq!(record.round_scores, vec![100]);
        assert_eq!(record.aim_score_total, 100);
    }

    #[test]
    fn test_low_total_fails_after_all_rounds() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Uncommon, TierTuning::aim_only(2), settings());
        start(&mut m, &mut h, aim_target(Tier::Uncommon, 120.0));

        // First round times out
        for _ in 0..1000 {
            if m.session().is_some_and(|s| s.round_scores.len() == 1) {
                break;
            }
            step(&mut m, &mut h, None);
        }
        assert_eq!(m.session().map(|s| s.aim_remaining), Some(1));
        assert_eq!(m.phase(), CapturePhase::Aiming);

        // Arm the second, then hit dead center
        step(&mut m, &mut h, None);
        let center = aim_center(&m);
        step(&mut m, &mut h, click(center));

        run_until(&mut m, &mut h, CapturePhase::Idle);
        assert_eq!(last_outcome(&h), Some(&failure(FailReason::LowTotal)));
        let record = m.last_record().unwrap();
        assert_eq!(record.round_scores, vec![0, 100]);
        assert_eq!(record.aim_score_total, 100);
    }

    #[test]
    fn test_rain_cleared_succeeds_regardless_of_score() {
        let mut h = Harness::default();
        let settings = CaptureSettings {
            rain: RainSettings {
                chance: 1.0,
                target_count: 5,
                extra_bullets: 2,
                allowed_escapes: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let tuning = TierTuning {
            rain_eligible: true,
            ..TierTuning::aim_only(2)
        };
        let mut m = machine(Tier::Rare, tuning, settings);
        // Threshold far above anything rain can score
        start(&mut m, &mut h, aim_target(Tier::Rare, 10_000.0));
        assert_eq!(m.phase(), CapturePhase::Raining);

        let mut misses = 0;
        for _ in 0..2000 {
            if m.phase() == CapturePhase::Idle {
                break;
            }
            if misses < 2 {
                step(&mut m, &mut h, click(Vec2::splat(5000.0)));
                misses += 1;
                continue;
            }
            let live = m.rain_spawner().live_targets();
            match live.first() {
                Some(rect) => step(&mut m, &mut h, click(rect.center)),
                None => step(&mut m, &mut h, None),
            }
        }

        assert_eq!(last_outcome(&h), Some(&OutcomeEvent::Success { target_id: 1 }));
        let record = m.last_record().unwrap();
        assert!(record.rain_mode);
        assert_eq!(record.round_scores.len(), 5);
        assert_eq!(record.aim_score_total, record.round_scores.iter().sum::<u32>());
    }

    #[test]
    fn test_rain_out_of_bullets() {
        let mut h = Harness::default();
        let settings = CaptureSettings {
            rain: RainSettings {
                chance: 1.0,
                target_count: 3,
                extra_bullets: 0,
                allowed_escapes: 3,
                ..Default::default()
            },
            ..Default::default()
        };
        let tuning = TierTuning {
            rain_eligible: true,
            ..TierTuning::aim_only(2)
        };
        let mut m = machine(Tier::Rare, tuning, settings);
        start(&mut m, &mut h, aim_target(Tier::Rare, 0.0));

        for _ in 0..10 {
            if m.phase() == CapturePhase::Idle {
                break;
            }
            step(&mut m, &mut h, click(Vec2::splat(5000.0)));
        }
        assert_eq!(last_outcome(&h), Some(&failure(FailReason::OutOfBullets)));
    }

    #[test]
    fn test_rain_escape_budget() {
        let mut h = Harness::default();
        let settings = CaptureSettings {
            rain: RainSettings {
                chance: 1.0,
                allowed_escapes: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let tuning = TierTuning {
            rain_eligible: true,
            ..TierTuning::aim_only(2)
        };
        let mut m = machine(Tier::Rare, tuning, settings);
        start(&mut m, &mut h, aim_target(Tier::Rare, 0.0));
        run_until(&mut m, &mut h, CapturePhase::Idle);
        assert_eq!(last_outcome(&h), Some(&failure(FailReason::EscapedTooMany)));
    }

    #[test]
    fn test_timeout_alone_never_fails() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Uncommon, TierTuning::aim_only(1), settings());
        start(&mut m, &mut h, aim_target(Tier::Uncommon, 0.0));
        run_until(&mut m, &mut h, CapturePhase::Idle);
        assert_eq!(last_outcome(&h), Some(&OutcomeEvent::Success { target_id: 1 }));
        assert_eq!(m.last_record().unwrap().round_scores, vec![0]);
    }

    #[test]
    fn test_press_before_cue_is_too_soon() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());
        start(&mut m, &mut h, timing_target(1.0, 1.0));
        step(&mut m, &mut h, Some(Press::Key));
        assert_eq!(last_outcome(&h), Some(&failure(FailReason::TooSoon)));
    }

    #[test]
    fn test_no_press_is_too_slow() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());
        start(&mut m, &mut h, timing_target(0.5, 0.2));
        run_until(&mut m, &mut h, CapturePhase::Idle);
        assert_eq!(last_outcome(&h), Some(&failure(FailReason::TooSlow)));
    }

    #[test]
    fn test_multiple_timing_rounds_run_in_sequence() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(2), settings());
        start(&mut m, &mut h, timing_target(0.2, 1.0));

        for round in 0..2 {
            for _ in 0..600 {
                if m.session().is_some_and(|s| {
                    matches!(&s.stage, Stage::Timing(r) if r.stage == TimingStage::WindowOpen)
                }) {
                    break;
                }
                step(&mut m, &mut h, None);
            }
            step(&mut m, &mut h, Some(Press::Key));
            if round == 0 {
                assert_eq!(m.session().map(|s| s.timing_remaining), Some(1));
            }
        }
        assert_eq!(last_outcome(&h), Some(&OutcomeEvent::Success { target_id: 1 }));
    }

    #[test]
    fn test_clock_restored_and_input_rearmed_on_release() {
        let mut h = Harness::default();
        h.clock.set_scale(0.5);
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());

        assert!(m.select_target(timing_target(1.0, 1.0), &mut h.hooks()));
        assert_eq!(h.clock.scale(), 0.0);
        assert!(!m.external_input_enabled());

        assert!(m.cancel(&mut h.hooks()));
        assert_eq!(h.clock.scale(), 0.5);
        assert_eq!(last_outcome(&h), Some(&failure(FailReason::Cancelled)));
        assert_eq!(m.phase(), CapturePhase::Idle);

        // Still held from the resolving press
        let held = TickInput {
            press: None,
            pointer_held: true,
        };
        m.tick(&held, SIM_DT, &mut h.hooks());
        assert!(!m.external_input_enabled());
        m.tick(&TickInput::default(), SIM_DT, &mut h.hooks());
        assert!(m.external_input_enabled());
    }

    #[test]
    fn test_modal_gate_freezes_session() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());
        assert!(m.select_target(timing_target(1.0, 1.0), &mut h.hooks()));
        step(&mut m, &mut h, None);

        h.modal = true;
        let now = m.now();
        let marker = m.reaction_bar().marker();
        for _ in 0..30 {
            step(&mut m, &mut h, Some(Press::Key));
        }
        assert_eq!(m.now(), now);
        assert_eq!(m.reaction_bar().marker(), marker);
        assert_eq!(m.phase(), CapturePhase::Committing);

        h.modal = false;
        step(&mut m, &mut h, None);
        assert!(m.now() > now);
    }

    #[test]
    fn test_round_waits_for_modal_before_arming() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());
        assert!(m.select_target(timing_target(1.0, 1.0), &mut h.hooks()));
        land_commit(&mut m, &mut h);
        // Planning enters the timing round unarmed
        step(&mut m, &mut h, None);
        assert_eq!(m.phase(), CapturePhase::Timing);

        h.modal = true;
        for _ in 0..30 {
            step(&mut m, &mut h, Some(Press::Key));
        }
        assert_eq!(m.phase(), CapturePhase::Timing);
        assert!(matches!(
            m.session().map(|s| &s.stage),
            Some(Stage::Timing(r)) if !r.is_armed()
        ));

        h.modal = false;
        step(&mut m, &mut h, None);
        let armed_at = m.now();
        match m.session().map(|s| &s.stage) {
            Some(Stage::Timing(r)) => {
                assert_eq!(r.stage, TimingStage::WaitingForCue);
                assert!((r.cue_at - (armed_at + 1.0)).abs() < 1e-6);
            }
            other => panic!("not timing: {:?}", other),
        }
        assert!(h.outcomes.events.is_empty());
    }

    #[test]
    fn test_infinite_delay_override_degrades_to_settings() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());
        let target = CatchTarget::new(1, "perch", Tier::Common).with_overrides(TargetOverrides {
            timing_delay_max: Some(f32::INFINITY),
            ..Default::default()
        });
        start(&mut m, &mut h, target);
        assert_eq!(m.phase(), CapturePhase::Timing);

        let s = m.settings().clone();
        let session = m.session().unwrap();
        assert_eq!(session.timing_delay, (s.timing_delay_min, s.timing_delay_max));
        match &session.stage {
            Stage::Timing(r) => {
                assert!(r.delay_secs.is_finite());
                assert!(r.delay_secs >= s.timing_delay_min && r.delay_secs <= s.timing_delay_max);
            }
            other => panic!("not timing: {:?}", other),
        }
    }

    #[test]
    fn test_select_rejected_until_pointer_released() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());
        assert!(m.select_target(timing_target(1.0, 1.0), &mut h.hooks()));
        assert!(m.cancel(&mut h.hooks()));

        assert!(!m.select_target(timing_target(1.0, 1.0), &mut h.hooks()));
        assert_eq!(m.phase(), CapturePhase::Idle);
        assert!(!h.clock.is_paused());

        m.tick(&TickInput::default(), SIM_DT, &mut h.hooks());
        assert!(m.select_target(timing_target(1.0, 1.0), &mut h.hooks()));
        assert_eq!(m.phase(), CapturePhase::Committing);
    }

    #[test]
    fn test_select_while_busy_is_rejected() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());
        assert!(m.select_target(timing_target(1.0, 1.0), &mut h.hooks()));
        assert!(!m.select_target(timing_target(1.0, 1.0), &mut h.hooks()));
        assert_eq!(h.clock.depth(), 1);
        assert!(m.cancel(&mut h.hooks()));
        assert!(!h.clock.is_paused());
        assert!(!m.cancel(&mut h.hooks()));
    }

    #[test]
    fn test_top_tier_runs_aim_then_timing() {
        let both = TierTuning {
            mode: CatchMode::Both,
            aim_target_count: 1,
            timing_count: 1,
            ..Default::default()
        };

        let mut h = Harness::default();
        let mut m = machine(Tier::Legendary, both.clone(), settings());
        start(&mut m, &mut h, aim_target(Tier::Legendary, 50.0));
        assert_eq!(m.phase(), CapturePhase::Aiming);
        let center = aim_center(&m);
        step(&mut m, &mut h, click(center));
        run_until(&mut m, &mut h, CapturePhase::Timing);

        // Below the top tier the same tuning keeps only aim
        let mut h = Harness::default();
        let mut m = machine(Tier::Rare, both, settings());
        start(&mut m, &mut h, aim_target(Tier::Rare, 50.0));
        let center = aim_center(&m);
        step(&mut m, &mut h, click(center));
        run_until(&mut m, &mut h, CapturePhase::Idle);
        assert_eq!(last_outcome(&h), Some(&OutcomeEvent::Success { target_id: 1 }));
    }

    #[test]
    fn test_commit_early_and_late() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());
        assert!(m.select_target(timing_target(1.0, 1.0), &mut h.hooks()));
        // First press falls in the ignore window
        step(&mut m, &mut h, Some(Press::Key));
        assert_eq!(m.phase(), CapturePhase::Committing);
        step(&mut m, &mut h, Some(Press::Key));
        assert_eq!(last_outcome(&h), Some(&failure(FailReason::TooEarly)));

        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::timing_only(1), settings());
        assert!(m.select_target(timing_target(1.0, 1.0), &mut h.hooks()));
        run_until(&mut m, &mut h, CapturePhase::Idle);
        assert_eq!(last_outcome(&h), Some(&failure(FailReason::TooLate)));
    }

    #[test]
    fn test_none_mode_succeeds_after_commit() {
        let mut h = Harness::default();
        let mut m = machine(Tier::Common, TierTuning::default(), settings());
        assert!(m.select_target(CatchTarget::new(1, "guppy", Tier::Common), &mut h.hooks()));
        land_commit(&mut m, &mut h);
        step(&mut m, &mut h, None);
        assert_eq!(last_outcome(&h), Some(&OutcomeEvent::Success { target_id: 1 }));
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let mut h = Harness::default();
            let mut m = CaptureMachine::new(settings(), TuningTable::default(), 99);
            start(&mut m, &mut h, CatchTarget::new(1, "eel", Tier::Epic));
            for _ in 0..20 {
                step(&mut m, &mut h, None);
            }
            aim_center(&m)
        };
        assert_eq!(run(), run());
    }
}
