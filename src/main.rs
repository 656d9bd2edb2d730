//! Catch Core demo entry point
//!
//! Runs one capture per tier with a scripted auto-player and logs what
//! happens. Optional arguments: a settings JSON path and a tuning JSON path.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use catch_core::consts::{MAX_SUBSTEPS, SIM_DT};
    use catch_core::platform::{LogDisplay, NoModal, OutcomeLog};
    use catch_core::sim::{
        CaptureMachine, CapturePhase, CatchTarget, Hooks, Press, Stage, TickInput, Tier,
        TimingStage,
    };
    use catch_core::{CaptureSettings, TuningTable, WorldClock};

    /// Simulated frame time (30 fps host, two sim ticks per frame)
    const FRAME_DT: f32 = 1.0 / 30.0;
    /// Give up on a session after this many frames
    const MAX_FRAMES: u32 = 30 * 60;
    /// Auto-player reaction time after a timing cue (seconds)
    const REACTION_SECS: f64 = 0.2;

    fn read_config(path: Option<&String>) -> Option<String> {
        let path = path?;
        match std::fs::read_to_string(path) {
            Ok(json) => Some(json),
            Err(e) => {
                log::warn!("Could not read {}: {}", path, e);
                None
            }
        }
    }

    /// Press at the right moment for whatever stage is running
    fn auto_press(machine: &CaptureMachine) -> Option<Press> {
        let session = machine.session()?;
        match &session.stage {
            Stage::Commit => {
                let (start, end) = machine.reaction_bar().zone();
                let marker = machine.reaction_bar().marker();
                (marker >= (start + end) * 0.5).then_some(Press::Key)
            }
            Stage::Planning => None,
            Stage::Aim(round) => round
                .is_armed()
                .then_some(Press::Pointer(round.rect.center)),
            Stage::Rain(_) => machine
                .rain_spawner()
                .live_targets()
                .first()
                .map(|rect| Press::Pointer(rect.center)),
            Stage::Timing(round) => match (round.stage, round.cue_fired_at) {
                (TimingStage::WindowOpen, Some(fired))
                    if machine.now() - fired >= REACTION_SECS =>
                {
                    Some(Press::Key)
                }
                _ => None,
            },
        }
    }

    pub fn run() {
        let args: Vec<String> = std::env::args().collect();
        let settings = read_config(args.get(1))
            .map(|json| CaptureSettings::load_or_default(&json))
            .unwrap_or_default();
        let tuning = read_config(args.get(2))
            .map(|json| TuningTable::load_or_default(&json))
            .unwrap_or_default();

        let seed = 0x00C0_FFEE;
        log::info!("Catch Core demo starting (seed {:#x})", seed);

        let mut machine = CaptureMachine::new(settings, tuning, seed);
        let mut display = LogDisplay;
        let mut outcomes = OutcomeLog::default();
        let mut clock = WorldClock::default();
        let modal = NoModal;

        for (i, tier) in Tier::ALL.into_iter().enumerate() {
            let target = CatchTarget::new(i as u64 + 1, format!("{} fish", tier.as_str()), tier);
            let mut hooks = Hooks {
                display: &mut display,
                outcomes: &mut outcomes,
                modal: &modal,
                clock: &mut clock,
            };
            if !machine.select_target(target, &mut hooks) {
                continue;
            }

            let mut accumulator = 0.0;
            for _ in 0..MAX_FRAMES {
                accumulator += FRAME_DT;
                let mut steps = 0;
                while accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
                    let press = auto_press(&machine);
                    let input = TickInput {
                        press,
                        pointer_held: press.is_some(),
                    };
                    machine.tick(&input, SIM_DT, &mut hooks);
                    accumulator -= SIM_DT;
                    steps += 1;
                }
                if machine.phase() == CapturePhase::Idle {
                    break;
                }
            }

            if machine.phase() != CapturePhase::Idle {
                log::warn!("Session did not resolve, cancelling");
                machine.cancel(&mut hooks);
            }
            // Release the pointer so external input re-arms
            machine.tick(&TickInput::default(), SIM_DT, &mut hooks);

            if let Some(record) = machine.last_record() {
                log::info!(
                    "{}: {:?} | scores {:?} | reaction {:?} | {:.2}s",
                    record.tier.as_str(),
                    record.outcome,
                    record.round_scores,
                    record.last_reaction_secs,
                    record.duration_secs
                );
            }
        }

        log::info!(
            "Caught {} of {} (world clock scale {})",
            outcomes.successes(),
            outcomes.events.len(),
            clock.scale()
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    demo::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The core is a library; there is no browser entry point
}
