use sage_engine::{
    Frame, InputAction, InputSnapshot, PointerEvent, Scene, SceneCommand, SceneKey, Vec2,
};
use tracing::debug;

use super::state::PersistentState;
use super::{SceneEntry, StoryNext, StoryRequest, RESULT_SCENE};

pub(crate) const STORY_PANEL: &str = "story";

/// Page-by-page narration. Used for the intro, chapter intros and endings.
pub(crate) struct StoryScene {
    request: StoryRequest,
    page: usize,
}

impl StoryScene {
    pub(crate) fn new(request: StoryRequest) -> Self {
        Self { request, page: 0 }
    }

    #[cfg(test)]
    pub(crate) fn page(&self) -> usize {
        self.page
    }

    fn finish(&self) -> SceneCommand<SceneEntry> {
        match &self.request.then {
            StoryNext::Result(result) => SceneCommand::SwitchTo {
                key: SceneKey::new(RESULT_SCENE),
                entry: SceneEntry::Result(result.clone()),
            },
            StoryNext::Scene(key) => SceneCommand::SwitchTo {
                key: key.clone(),
                entry: SceneEntry::default_for(key),
            },
            StoryNext::CasePart { key, part_index } => SceneCommand::SwitchTo {
                key: key.clone(),
                entry: SceneEntry::Case {
                    part_index: *part_index,
                },
            },
        }
    }
}

impl Scene<PersistentState, SceneEntry> for StoryScene {
    fn load(&mut self, _state: &mut PersistentState) {
        debug!(pages = self.request.pages.len(), "story_started");
    }

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        _state: &mut PersistentState,
    ) -> SceneCommand<SceneEntry> {
        if self.page >= self.request.pages.len() {
            return self.finish();
        }
        if input.pressed(InputAction::Cancel) {
            debug!(page = self.page, "story_skipped");
            return self.finish();
        }
        let clicked = matches!(input.pointer(), Some(PointerEvent::Click(_)));
        if input.pressed(InputAction::Interact) || clicked {
            self.page += 1;
            if self.page >= self.request.pages.len() {
                return self.finish();
            }
        }
        SceneCommand::None
    }

    fn render(&self, _state: &PersistentState, frame: &mut Frame) {
        let Some(page) = self.request.pages.get(self.page) else {
            return;
        };
        if let Some(image) = &page.image {
            frame.sprite(image.clone(), Vec2::ZERO);
        }
        frame.panel(
            STORY_PANEL,
            vec![
                page.text.clone(),
                format!("{} / {}", self.page + 1, self.request.pages.len()),
                "E/Enter: next | Esc: skip".to_string(),
            ],
        );
    }

    fn debug_title(&self, _state: &PersistentState) -> Option<String> {
        Some(format!(
            "story {}/{}",
            self.page + 1,
            self.request.pages.len()
        ))
    }
}
