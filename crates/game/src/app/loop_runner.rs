use std::process::ExitCode;
use std::rc::Rc;

use sage_engine::{run_app, SceneKey, SceneMachine, TraceRenderer};
use tracing::{error, info};

use super::bootstrap::AppWiring;
use super::gameplay::{GameSceneProvider, PersistentState};

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        content,
        start,
        start_entry,
        mut input,
    } = app;

    let mut state = PersistentState::new();
    if let Some(chapter) = content.chapters.get(&content.intro_chapter) {
        state.set_total_quizzes(chapter.total_quizzes);
    }
    let mut scenes = SceneMachine::new(
        Box::new(GameSceneProvider::new(Rc::clone(&content))),
        state,
    );
    let mut renderer = TraceRenderer::default();

    let summary = match run_app(
        &config,
        &mut scenes,
        start,
        start_entry,
        &mut input,
        &mut renderer,
    ) {
        Ok(summary) => summary,
        Err(err) => {
            error!(error = %err, "run_failed");
            return ExitCode::FAILURE;
        }
    };

    let title = scenes.debug_title_active().unwrap_or_default();
    let state = scenes.into_context();
    let progress = serde_json::to_string(&state.summary())
        .unwrap_or_else(|err| format!("<unserializable: {err}>"));
    info!(
        ticks = summary.ticks,
        final_scene = summary.final_scene.as_ref().map(SceneKey::as_str).unwrap_or("<none>"),
        stop_reason = summary.stop_reason.as_str(),
        frames = renderer.presented_frames(),
        changed_frames = renderer.changed_frames(),
        title = %title,
        state = %progress,
        "run_finished"
    );
    ExitCode::SUCCESS
}
