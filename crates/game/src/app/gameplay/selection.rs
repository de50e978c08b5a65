use std::rc::Rc;

use sage_engine::{
    Frame, InputAction, InputSnapshot, PointerEvent, Scene, SceneCommand, SceneKey, UiTarget,
};
use tracing::{info, warn};

use super::content::GameContent;
use super::state::PersistentState;
use super::{SceneEntry, StoryNext, StoryRequest, CHAPTER_SELECTION_SCENE, STORY_SCENE};

pub(crate) const SELECTION_PANEL: &str = "chapters";
const REPLAY_INTRO_LABEL: &str = "Replay intro";

/// Chapter list plus one row to replay the intro story.
pub(crate) struct ChapterSelectionScene {
    content: Rc<GameContent>,
    chapter_keys: Vec<String>,
    highlight: usize,
}

impl ChapterSelectionScene {
    pub(crate) fn new(content: Rc<GameContent>) -> Self {
        let chapter_keys = content.chapters.keys().cloned().collect();
        Self {
            content,
            chapter_keys,
            highlight: 0,
        }
    }

    fn row_count(&self) -> usize {
        self.chapter_keys.len() + 1
    }

    pub(crate) fn labels(&self) -> Vec<String> {
        self.chapter_keys
            .iter()
            .filter_map(|key| self.content.chapters.get(key))
            .map(|chapter| chapter.title.clone())
            .chain(std::iter::once(REPLAY_INTRO_LABEL.to_string()))
            .collect()
    }

    fn choose(&self, row: usize, state: &mut PersistentState) -> SceneCommand<SceneEntry> {
        let Some(chapter_key) = self.chapter_keys.get(row) else {
            return SceneCommand::SwitchTo {
                key: SceneKey::new(STORY_SCENE),
                entry: SceneEntry::Story(StoryRequest {
                    pages: self.content.intro_story.clone(),
                    then: StoryNext::Scene(SceneKey::new(CHAPTER_SELECTION_SCENE)),
                }),
            };
        };
        let Some(chapter) = self.content.chapters.get(chapter_key) else {
            return SceneCommand::None;
        };
        let Some(first_scene) = chapter.scenes.first() else {
            warn!(chapter = %chapter_key, "chapter_without_scenes");
            return SceneCommand::None;
        };

        state.set_total_quizzes(chapter.total_quizzes);
        info!(
            chapter = %chapter_key,
            total_quizzes = chapter.total_quizzes,
            "chapter_selected"
        );
        let first_scene = SceneKey::new(first_scene.clone());
        if chapter.intro.is_empty() {
            SceneCommand::SwitchTo {
                key: first_scene,
                entry: SceneEntry::Field { entry_x: None },
            }
        } else {
            SceneCommand::SwitchTo {
                key: SceneKey::new(STORY_SCENE),
                entry: SceneEntry::Story(StoryRequest {
                    pages: chapter.intro.clone(),
                    then: StoryNext::Scene(first_scene),
                }),
            }
        }
    }
}

impl Scene<PersistentState, SceneEntry> for ChapterSelectionScene {
    fn load(&mut self, _state: &mut PersistentState) {}

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        state: &mut PersistentState,
    ) -> SceneCommand<SceneEntry> {
        let rows = self.row_count();
        match input.pointer() {
            Some(PointerEvent::Click(UiTarget::ListItem(row))) if row < rows => {
                return self.choose(row, state);
            }
            Some(PointerEvent::Enter(UiTarget::ListItem(row))) if row < rows => {
                self.highlight = row;
            }
            _ => {}
        }
        if input.pressed(InputAction::NavigateDown) {
            self.highlight = (self.highlight + 1) % rows;
        }
        if input.pressed(InputAction::NavigateUp) {
            self.highlight = (self.highlight + rows - 1) % rows;
        }
        if input.pressed(InputAction::Interact) {
            return self.choose(self.highlight, state);
        }
        SceneCommand::None
    }

    fn render(&self, _state: &PersistentState, frame: &mut Frame) {
        let lines = self
            .labels()
            .into_iter()
            .enumerate()
            .map(|(row, label)| {
                let cursor = if row == self.highlight { ">" } else { " " };
                format!("{cursor} {label}")
            })
            .collect();
        frame.panel(SELECTION_PANEL, lines);
    }

    fn debug_title(&self, _state: &PersistentState) -> Option<String> {
        Some(format!("chapter selection | row {}", self.highlight))
    }
}
