use sage_engine::{Frame, InputSnapshot, Scene, SceneCommand, SceneKey};
use tracing::{debug, info, warn};

use super::content::{Endings, GameContent};
use super::field_scene::FieldScene;
use super::state::{PersistentState, QuizId};
use super::{
    ChapterResult, SceneEntry, StoryNext, StoryRequest, CHAPTER_SELECTION_SCENE, STORY_SCENE,
};

pub(crate) const HIGH_ENDING_ACCURACY: f32 = 0.7;

/// correct / required clamped to 1.0, or 0.0 for a chapter that requires nothing.
pub(crate) fn chapter_accuracy(correct: u32, required: u32) -> f32 {
    if required == 0 {
        return 0.0;
    }
    (correct as f32 / required as f32).min(1.0)
}

/// A field scene that belongs to a chapter. Watches the chapter's quiz roster
/// and starts the ending once enough quizzes are done.
pub(crate) struct ChapterProgressController {
    field: FieldScene,
    chapter_key: String,
    roster: Vec<QuizId>,
    required: u32,
    endings: Endings,
    cleared: bool,
}

impl ChapterProgressController {
    /// Hands the scene back unchanged when it is not part of any chapter.
    pub(crate) fn wrap(field: FieldScene, content: &GameContent) -> Result<Self, FieldScene> {
        let Some((chapter_key, chapter)) = content.chapter_of_scene(field.key().as_str()) else {
            return Err(field);
        };
        Ok(Self {
            roster: content.chapter_roster(chapter_key),
            chapter_key: chapter_key.to_string(),
            required: chapter.total_quizzes,
            endings: chapter.endings.clone(),
            cleared: false,
            field,
        })
    }

    #[cfg(test)]
    pub(crate) fn field(&self) -> &FieldScene {
        &self.field
    }

    #[cfg(test)]
    pub(crate) fn is_cleared(&self) -> bool {
        self.cleared
    }

    fn completed_in_chapter(&self, state: &PersistentState) -> u32 {
        self.roster
            .iter()
            .filter(|quiz_id| state.is_quiz_completed(quiz_id))
            .count() as u32
    }

    fn is_requirement_met(&self, state: &PersistentState) -> bool {
        self.completed_in_chapter(state) >= self.required
    }

    /// Fires at most once per scene instance, and never for a chapter that was
    /// already cleared when the scene loaded.
    fn check_clear(&mut self, state: &PersistentState) -> Option<SceneCommand<SceneEntry>> {
        if self.cleared {
            return None;
        }
        if !self.is_requirement_met(state) {
            return None;
        }
        self.cleared = true;

        let completed = self.completed_in_chapter(state);
        let correct = state.correct_among(&self.roster);
        let accuracy = chapter_accuracy(correct, self.required);
        let high = accuracy >= HIGH_ENDING_ACCURACY;
        info!(
            chapter = %self.chapter_key,
            completed,
            correct,
            required = self.required,
            accuracy,
            ending = if high { "high" } else { "low" },
            "chapter_cleared"
        );

        let pages = if high {
            self.endings.high.clone()
        } else {
            self.endings.low.clone()
        };
        Some(SceneCommand::SwitchTo {
            key: SceneKey::new(STORY_SCENE),
            entry: SceneEntry::Story(StoryRequest {
                pages,
                then: StoryNext::Result(ChapterResult {
                    chapter_key: self.chapter_key.clone(),
                    accuracy,
                    correct,
                    total: self.required,
                }),
            }),
        })
    }
}

impl Scene<PersistentState, SceneEntry> for ChapterProgressController {
    fn load(&mut self, state: &mut PersistentState) {
        // A chapter with nothing to do keeps clearing on entry.
        if self.required > 0 && self.is_requirement_met(state) {
            self.cleared = true;
            debug!(chapter = %self.chapter_key, "chapter_revisited_after_clear");
        }
        self.field.load(state);
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        state: &mut PersistentState,
    ) -> SceneCommand<SceneEntry> {
        let command = self.field.update(fixed_dt_seconds, input, state);
        if !matches!(command, SceneCommand::None) {
            return command;
        }
        self.check_clear(state).unwrap_or(SceneCommand::None)
    }

    fn render(&self, state: &PersistentState, frame: &mut Frame) {
        self.field.render(state, frame);
    }

    fn unload(&mut self, state: &mut PersistentState) {
        self.field.unload(state);
    }

    fn debug_title(&self, state: &PersistentState) -> Option<String> {
        let base = self.field.debug_title(state).unwrap_or_default();
        Some(format!(
            "{base} | {} {}/{}",
            self.chapter_key,
            self.completed_in_chapter(state),
            self.required
        ))
    }
}

/// Forgets the chapter's quiz completions and sends the player back to its
/// first scene. Other chapters keep their progress.
pub(crate) fn retry_chapter(
    content: &GameContent,
    chapter_key: &str,
    state: &mut PersistentState,
) -> SceneCommand<SceneEntry> {
    let Some(chapter) = content.chapters.get(chapter_key) else {
        warn!(chapter = %chapter_key, "retry_unknown_chapter");
        return SceneCommand::SwitchTo {
            key: SceneKey::new(CHAPTER_SELECTION_SCENE),
            entry: SceneEntry::Menu,
        };
    };
    let removed = state.reset_chapter(&content.chapter_roster(chapter_key));
    state.set_total_quizzes(chapter.total_quizzes);
    info!(chapter = %chapter_key, removed, "chapter_retry");

    match chapter.scenes.first() {
        Some(first) => SceneCommand::SwitchTo {
            key: SceneKey::new(first.clone()),
            entry: SceneEntry::Field { entry_x: None },
        },
        None => SceneCommand::SwitchTo {
            key: SceneKey::new(CHAPTER_SELECTION_SCENE),
            entry: SceneEntry::Menu,
        },
    }
}
