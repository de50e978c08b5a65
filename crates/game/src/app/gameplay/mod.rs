use std::rc::Rc;

use sage_engine::{Scene, SceneKey, SceneProvider};
use tracing::warn;

mod case;
mod chapter;
mod content;
mod dialog;
mod entity;
mod field_scene;
mod notification;
mod overlays;
mod quiz;
mod result;
mod selection;
mod state;
mod story;
mod targeting;

pub(crate) use content::{validate_content, GameContent, StoryPage};
pub(crate) use state::PersistentState;

use case::{CaseListScene, CaseScene};
use chapter::ChapterProgressController;
use field_scene::FieldScene;
use result::ResultScene;
use selection::ChapterSelectionScene;
use story::StoryScene;

pub(crate) const CHAPTER_SELECTION_SCENE: &str = "ChapterSelectionScene";
pub(crate) const STORY_SCENE: &str = "StoryScene";
pub(crate) const RESULT_SCENE: &str = "ResultScene";

pub(crate) type GameScene = dyn Scene<PersistentState, SceneEntry>;

/// Score handed from a cleared chapter to the result screen.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChapterResult {
    pub(crate) chapter_key: String,
    pub(crate) accuracy: f32,
    pub(crate) correct: u32,
    pub(crate) total: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StoryNext {
    Result(ChapterResult),
    Scene(SceneKey),
    CasePart { key: SceneKey, part_index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoryRequest {
    pub(crate) pages: Vec<StoryPage>,
    pub(crate) then: StoryNext,
}

/// What a scene is told when it is switched to.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SceneEntry {
    Field { entry_x: Option<f32> },
    Story(StoryRequest),
    Result(ChapterResult),
    Case { part_index: usize },
    Menu,
}

impl SceneEntry {
    /// The plain entry used when nothing more specific is known about `key`.
    pub(crate) fn default_for(key: &SceneKey) -> Self {
        if key.as_str() == CHAPTER_SELECTION_SCENE {
            SceneEntry::Menu
        } else {
            SceneEntry::Field { entry_x: None }
        }
    }
}

pub(crate) struct GameSceneProvider {
    content: Rc<GameContent>,
}

impl GameSceneProvider {
    pub(crate) fn new(content: Rc<GameContent>) -> Self {
        Self { content }
    }
}

impl SceneProvider<PersistentState, SceneEntry> for GameSceneProvider {
    fn create(&self, key: &SceneKey, entry: SceneEntry) -> Option<Box<GameScene>> {
        match (key.as_str(), entry) {
            (CHAPTER_SELECTION_SCENE, _) => {
                Some(Box::new(ChapterSelectionScene::new(Rc::clone(&self.content))))
            }
            (STORY_SCENE, SceneEntry::Story(request)) => Some(Box::new(StoryScene::new(request))),
            (STORY_SCENE, _) => Some(Box::new(StoryScene::new(StoryRequest {
                pages: Vec::new(),
                then: StoryNext::Scene(SceneKey::new(CHAPTER_SELECTION_SCENE)),
            }))),
            (RESULT_SCENE, SceneEntry::Result(result)) => Some(Box::new(ResultScene::new(
                Rc::clone(&self.content),
                result,
            ))),
            (RESULT_SCENE, other) => {
                warn!(entry = ?other, "result_scene_without_result");
                None
            }
            (list_key, _) if self.content.case_lists.contains_key(list_key) => Some(Box::new(
                CaseListScene::new(key.clone(), Rc::clone(&self.content))?,
            )),
            (case_key, entry) if self.content.case_scenes.contains_key(case_key) => {
                let part_index = match entry {
                    SceneEntry::Case { part_index } => part_index,
                    _ => 0,
                };
                Some(Box::new(CaseScene::new(
                    key.clone(),
                    Rc::clone(&self.content),
                    part_index,
                )?))
            }
            (_, entry) => {
                let entry_x = match entry {
                    SceneEntry::Field { entry_x } => entry_x,
                    _ => None,
                };
                let field = FieldScene::new(key.clone(), Rc::clone(&self.content), entry_x)?;
                match ChapterProgressController::wrap(field, &self.content) {
                    Ok(chapter) => Some(Box::new(chapter)),
                    Err(field) => Some(Box::new(field)),
                }
            }
        }
    }
}

/// Where a run begins: the intro story first when starting at the configured
/// start scene, otherwise straight into `start`.
pub(crate) fn initial_route(content: &GameContent, start: &SceneKey) -> (SceneKey, SceneEntry) {
    if start.as_str() == content.start_scene && !content.intro_story.is_empty() {
        return (
            SceneKey::new(STORY_SCENE),
            SceneEntry::Story(StoryRequest {
                pages: content.intro_story.clone(),
                then: StoryNext::Scene(start.clone()),
            }),
        );
    }
    (start.clone(), SceneEntry::default_for(start))
}

#[cfg(test)]
mod tests;
