use std::rc::Rc;

use sage_engine::{
    Frame, InputAction, InputSnapshot, PointerEvent, Scene, SceneCommand, SceneKey, UiTarget,
};
use tracing::info;

use super::chapter::retry_chapter;
use super::content::GameContent;
use super::state::PersistentState;
use super::{ChapterResult, SceneEntry, CHAPTER_SELECTION_SCENE};

pub(crate) const RESULT_PANEL: &str = "result";
const MENU: [&str; 2] = ["Retry", "Back to chapter selection"];

pub(crate) struct ResultScene {
    content: Rc<GameContent>,
    result: ChapterResult,
    highlight: usize,
}

impl ResultScene {
    pub(crate) fn new(content: Rc<GameContent>, result: ChapterResult) -> Self {
        Self {
            content,
            result,
            highlight: 0,
        }
    }

    pub(crate) fn summary_lines(&self) -> [String; 2] {
        [
            format!("Correct: {} / {}", self.result.correct, self.result.total),
            format!("Accuracy: {:.1}%", self.result.accuracy * 100.0),
        ]
    }

    fn choose(&self, row: usize, state: &mut PersistentState) -> SceneCommand<SceneEntry> {
        match row {
            0 => retry_chapter(&self.content, &self.result.chapter_key, state),
            _ => SceneCommand::SwitchTo {
                key: SceneKey::new(CHAPTER_SELECTION_SCENE),
                entry: SceneEntry::Menu,
            },
        }
    }
}

impl Scene<PersistentState, SceneEntry> for ResultScene {
    fn load(&mut self, _state: &mut PersistentState) {
        info!(
            chapter = %self.result.chapter_key,
            correct = self.result.correct,
            total = self.result.total,
            accuracy = self.result.accuracy,
            "result_shown"
        );
    }

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        state: &mut PersistentState,
    ) -> SceneCommand<SceneEntry> {
        match input.pointer() {
            Some(PointerEvent::Click(UiTarget::ListItem(row))) if row < MENU.len() => {
                return self.choose(row, state);
            }
            Some(PointerEvent::Enter(UiTarget::ListItem(row))) if row < MENU.len() => {
                self.highlight = row;
            }
            _ => {}
        }
        if input.pressed(InputAction::NavigateUp) || input.pressed(InputAction::NavigateDown) {
            self.highlight = (self.highlight + 1) % MENU.len();
        }
        if input.pressed(InputAction::Interact) {
            return self.choose(self.highlight, state);
        }
        SceneCommand::None
    }

    fn render(&self, _state: &PersistentState, frame: &mut Frame) {
        let mut lines = self.summary_lines().to_vec();
        lines.extend(MENU.iter().enumerate().map(|(row, label)| {
            let cursor = if row == self.highlight { ">" } else { " " };
            format!("{cursor} {label}")
        }));
        frame.panel(RESULT_PANEL, lines);
    }
}
