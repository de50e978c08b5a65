use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::content::ContentLoadError;
use crate::StartupError;

use super::rendering::{Frame, Renderer};
use super::scene::{SceneCommand, SceneKey, SceneMachine, SceneSwitchError};
use super::script::{InputSource, ScriptParseError};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_ticks: Option<u64>,
    /// Sleep between ticks so a run takes wall-clock time. Headless playtests
    /// leave this off and run as fast as possible.
    pub pace_realtime: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks: None,
            pace_realtime: false,
        }
    }
}

impl LoopConfig {
    pub fn fixed_dt_seconds(&self) -> f32 {
        1.0 / self.target_tps.max(1) as f32
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Content(#[from] ContentLoadError),
    #[error(transparent)]
    Script(#[from] ScriptParseError),
    #[error("failed to read script '{path}': {source}")]
    ReadScript {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("scene switch failed: {0}")]
    Scene(#[from] SceneSwitchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    InputExhausted,
    QuitRequested,
    SceneQuit,
    TickLimit,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::InputExhausted => "input_exhausted",
            StopReason::QuitRequested => "quit_requested",
            StopReason::SceneQuit => "scene_quit",
            StopReason::TickLimit => "tick_limit",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub final_scene: Option<SceneKey>,
    pub stop_reason: StopReason,
}

/// Drives the active scene at a fixed step until the input source runs dry, quit
/// is requested, or the tick limit is hit. The scene machine is left loaded so the
/// caller can inspect its context afterwards.
pub fn run_app<C, E>(
    config: &LoopConfig,
    scenes: &mut SceneMachine<C, E>,
    start: SceneKey,
    start_entry: E,
    input: &mut dyn InputSource,
    renderer: &mut dyn Renderer,
) -> Result<RunSummary, AppError> {
    let fixed_dt_seconds = config.fixed_dt_seconds();
    let fixed_dt = Duration::from_secs_f32(fixed_dt_seconds);
    scenes.switch_to(start, start_entry)?;

    let mut frame = Frame::new();
    let mut ticks: u64 = 0;
    let stop_reason = loop {
        if config.max_ticks.is_some_and(|max_ticks| ticks >= max_ticks) {
            break StopReason::TickLimit;
        }
        let Some(snapshot) = input.next_snapshot() else {
            break StopReason::InputExhausted;
        };
        let tick_started = Instant::now();
        ticks = ticks.saturating_add(1);
        if snapshot.quit_requested() {
            break StopReason::QuitRequested;
        }

        match scenes.update_active(fixed_dt_seconds, &snapshot)? {
            SceneCommand::None => {}
            SceneCommand::SwitchTo { key, entry } => {
                let from = scenes.active_scene().cloned();
                scenes.switch_to(key.clone(), entry)?;
                info!(
                    from = from.as_ref().map(SceneKey::as_str).unwrap_or("<none>"),
                    to = %key,
                    tick = ticks,
                    "scene_switched"
                );
            }
            SceneCommand::Quit => break StopReason::SceneQuit,
        }

        frame.clear();
        scenes.render_active(&mut frame);
        renderer.present(&frame);

        if config.pace_realtime {
            let elapsed = tick_started.elapsed();
            if elapsed < fixed_dt {
                thread::sleep(fixed_dt - elapsed);
            }
        }
    };

    debug!(
        ticks,
        reason = stop_reason.as_str(),
        title = scenes.debug_title_active().as_deref().unwrap_or(""),
        "loop_stopped"
    );
    Ok(RunSummary {
        ticks,
        final_scene: scenes.active_scene().cloned(),
        stop_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{InputAction, InputSnapshot, Scene, SceneProvider, ScriptedInput};

    #[derive(Default)]
    struct Counter {
        updates: u32,
    }

    struct Hop {
        next: Option<&'static str>,
    }

    impl Scene<Counter, ()> for Hop {
        fn load(&mut self, _ctx: &mut Counter) {}

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            input: &InputSnapshot,
            ctx: &mut Counter,
        ) -> SceneCommand<()> {
            ctx.updates += 1;
            if input.pressed(InputAction::Interact) {
                return match self.next {
                    Some(next) => SceneCommand::SwitchTo {
                        key: SceneKey::new(next),
                        entry: (),
                    },
                    None => SceneCommand::Quit,
                };
            }
            SceneCommand::None
        }

        fn render(&self, ctx: &Counter, frame: &mut Frame) {
            frame.label_screen(crate::app::ScreenAnchor::TopLeft, ctx.updates.to_string());
        }
    }

    struct HopProvider;

    impl SceneProvider<Counter, ()> for HopProvider {
        fn create(&self, key: &SceneKey, _entry: ()) -> Option<Box<dyn Scene<Counter, ()>>> {
            let next = match key.as_str() {
                "first" => Some("second"),
                "second" => Some("missing"),
                "last" => None,
                _ => return None,
            };
            Some(Box::new(Hop { next }))
        }
    }

    #[derive(Default)]
    struct CountingRenderer {
        frames: u32,
    }

    impl Renderer for CountingRenderer {
        fn present(&mut self, _frame: &Frame) {
            self.frames += 1;
        }
    }

    fn interact() -> InputSnapshot {
        InputSnapshot::empty().with_action_pressed(InputAction::Interact)
    }

    #[test]
    fn run_stops_when_input_is_exhausted() {
        let mut scenes = SceneMachine::new(Box::new(HopProvider), Counter::default());
        let mut input = ScriptedInput::from_snapshots(vec![InputSnapshot::empty(); 3]);
        let mut renderer = CountingRenderer::default();

        let summary = run_app(
            &LoopConfig::default(),
            &mut scenes,
            SceneKey::new("first"),
            (),
            &mut input,
            &mut renderer,
        )
        .expect("run");

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.stop_reason, StopReason::InputExhausted);
        assert_eq!(renderer.frames, 3);
        assert_eq!(scenes.context().updates, 3);
    }

    #[test]
    fn run_switches_scenes_and_honors_tick_limit() {
        let mut scenes = SceneMachine::new(Box::new(HopProvider), Counter::default());
        let mut input =
            ScriptedInput::from_snapshots(vec![interact(), InputSnapshot::empty(), interact()]);
        let config = LoopConfig {
            max_ticks: Some(2),
            ..LoopConfig::default()
        };

        let summary = run_app(
            &config,
            &mut scenes,
            SceneKey::new("first"),
            (),
            &mut input,
            &mut CountingRenderer::default(),
        )
        .expect("run");

        assert_eq!(summary.stop_reason, StopReason::TickLimit);
        assert_eq!(summary.final_scene, Some(SceneKey::new("second")));
    }

    #[test]
    fn switch_to_unknown_scene_is_fatal() {
        let mut scenes = SceneMachine::new(Box::new(HopProvider), Counter::default());
        let mut input = ScriptedInput::from_snapshots(vec![interact()]);

        let error = run_app(
            &LoopConfig::default(),
            &mut scenes,
            SceneKey::new("second"),
            (),
            &mut input,
            &mut CountingRenderer::default(),
        )
        .expect_err("unknown target");

        assert!(matches!(
            error,
            AppError::Scene(SceneSwitchError::UnknownScene(ref key)) if key.as_str() == "missing"
        ));
    }

    #[test]
    fn quit_request_and_scene_quit_stop_the_loop() {
        let mut scenes = SceneMachine::new(Box::new(HopProvider), Counter::default());
        let mut input = ScriptedInput::from_snapshots(vec![
            InputSnapshot::empty().with_action_pressed(InputAction::Quit),
            InputSnapshot::empty(),
        ]);
        let summary = run_app(
            &LoopConfig::default(),
            &mut scenes,
            SceneKey::new("first"),
            (),
            &mut input,
            &mut CountingRenderer::default(),
        )
        .expect("run");
        assert_eq!(summary.stop_reason, StopReason::QuitRequested);
        assert_eq!(scenes.context().updates, 0);

        let mut scenes = SceneMachine::new(Box::new(HopProvider), Counter::default());
        let mut input = ScriptedInput::from_snapshots(vec![interact()]);
        let summary = run_app(
            &LoopConfig::default(),
            &mut scenes,
            SceneKey::new("last"),
            (),
            &mut input,
            &mut CountingRenderer::default(),
        )
        .expect("run");
        assert_eq!(summary.stop_reason, StopReason::SceneQuit);
    }
}
