use std::collections::{BTreeMap, BTreeSet};

use sage_engine::ContentIssue;
use serde::Deserialize;

use super::state::QuizId;
use super::{CHAPTER_SELECTION_SCENE, RESULT_SCENE, STORY_SCENE};

const DEFAULT_WORLD_WIDTH: f32 = 960.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GameContent {
    pub(crate) intro_chapter: String,
    pub(crate) start_scene: String,
    #[serde(default)]
    pub(crate) intro_story: Vec<StoryPage>,
    pub(crate) scenes: BTreeMap<String, SceneContent>,
    pub(crate) chapters: BTreeMap<String, ChapterContent>,
    #[serde(default)]
    pub(crate) help_pages: Vec<StoryPage>,
    #[serde(default)]
    pub(crate) case_lists: BTreeMap<String, CaseListContent>,
    #[serde(default)]
    pub(crate) case_scenes: BTreeMap<String, CaseSceneContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneContent {
    #[serde(default)]
    pub(crate) background: Option<String>,
    #[serde(default = "default_world_width")]
    pub(crate) world_width: f32,
    #[serde(default)]
    pub(crate) entities: Vec<EntityContent>,
}

fn default_world_width() -> f32 {
    DEFAULT_WORLD_WIDTH
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum EntityContent {
    #[serde(rename = "NPC")]
    Npc(NpcContent),
    Collectible(CollectibleContent),
    Portal(PortalContent),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NpcContent {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) dialog: Vec<String>,
    #[serde(default)]
    pub(crate) quiz: Option<QuizContent>,
    #[serde(default)]
    pub(crate) completed_dialog: Option<OneOrMany>,
    #[serde(default)]
    pub(crate) is_static: bool,
    #[serde(default)]
    pub(crate) image_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CollectibleContent {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) item_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PortalContent {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) target_scene: String,
    #[serde(default)]
    pub(crate) entry_x: Option<f32>,
    #[serde(default)]
    pub(crate) confirm: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizContent {
    pub(crate) question: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: OneOrMany,
    #[serde(default)]
    pub(crate) multi_select: bool,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default)]
    pub(crate) explanation_image: Option<String>,
}

/// A field that accepts either a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub(crate) fn as_slice(&self) -> &[String] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChapterContent {
    pub(crate) title: String,
    pub(crate) scenes: Vec<String>,
    pub(crate) total_quizzes: u32,
    #[serde(default)]
    pub(crate) intro: Vec<StoryPage>,
    #[serde(default)]
    pub(crate) endings: Endings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Endings {
    #[serde(default)]
    pub(crate) high: Vec<StoryPage>,
    #[serde(default)]
    pub(crate) low: Vec<StoryPage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct StoryPage {
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) image: Option<String>,
}

/// A menu of case scenes, each played independently of the others.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaseListContent {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    pub(crate) cases: Vec<CaseEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CaseEntry {
    pub(crate) title: String,
    pub(crate) scene: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaseSceneContent {
    pub(crate) title: String,
    pub(crate) parts: Vec<CasePart>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub(crate) enum CasePart {
    Scenario(ScenarioPart),
    Exercise(ExercisePart),
    Review(ReviewPart),
}

impl CasePart {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            CasePart::Scenario(_) => "scenario",
            CasePart::Exercise(_) => "exercise",
            CasePart::Review(_) => "review",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScenarioPart {
    pub(crate) pages: Vec<StoryPage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExercisePart {
    #[serde(default)]
    pub(crate) title: Option<String>,
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) image: Option<String>,
    #[serde(default)]
    pub(crate) reference_text: Option<String>,
    #[serde(default)]
    pub(crate) questions: Vec<String>,
    #[serde(default)]
    pub(crate) attachments: Vec<Attachment>,
    #[serde(default)]
    pub(crate) submit_label: Option<String>,
    /// Compared with the trimmed answer. `None` accepts anything.
    #[serde(default)]
    pub(crate) expected_answer: Option<String>,
    #[serde(default)]
    pub(crate) incorrect_feedback: Option<String>,
    /// Asked before the part is submitted, when set.
    #[serde(default)]
    pub(crate) confirm_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Attachment {
    pub(crate) label: String,
    pub(crate) path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewPart {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) image: Option<String>,
    #[serde(default)]
    pub(crate) prompts: Vec<PromptExample>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PromptExample {
    pub(crate) title: String,
    pub(crate) text: String,
}

impl GameContent {
    /// The chapter that lists `scene_key`, first match in key order.
    pub(crate) fn chapter_of_scene(&self, scene_key: &str) -> Option<(&str, &ChapterContent)> {
        self.chapters
            .iter()
            .find(|(_, chapter)| chapter.scenes.iter().any(|scene| scene == scene_key))
            .map(|(key, chapter)| (key.as_str(), chapter))
    }

    pub(crate) fn is_intro_chapter_scene(&self, scene_key: &str) -> bool {
        self.chapters
            .get(&self.intro_chapter)
            .is_some_and(|chapter| chapter.scenes.iter().any(|scene| scene == scene_key))
    }

    /// Quiz ids of every quiz-carrying NPC in the chapter's scenes.
    pub(crate) fn chapter_roster(&self, chapter_key: &str) -> Vec<QuizId> {
        let Some(chapter) = self.chapters.get(chapter_key) else {
            return Vec::new();
        };
        chapter
            .scenes
            .iter()
            .filter_map(|scene_key| self.scenes.get(scene_key).map(|scene| (scene_key, scene)))
            .flat_map(|(scene_key, scene)| {
                scene.entities.iter().filter_map(move |entity| match entity {
                    EntityContent::Npc(npc) if npc.quiz.is_some() => {
                        Some(QuizId::for_npc(scene_key, &npc.name))
                    }
                    _ => None,
                })
            })
            .collect()
    }

    /// The case list that offers `case_key`, first match in key order.
    pub(crate) fn case_list_of(&self, case_key: &str) -> Option<&str> {
        self.case_lists
            .iter()
            .find(|(_, list)| list.cases.iter().any(|entry| entry.scene == case_key))
            .map(|(key, _)| key.as_str())
    }

    pub(crate) fn case_part(&self, case_key: &str, part_index: usize) -> Option<&CasePart> {
        self.case_scenes.get(case_key)?.parts.get(part_index)
    }

    pub(crate) fn is_known_scene(&self, scene_key: &str) -> bool {
        self.scenes.contains_key(scene_key)
            || self.case_scenes.contains_key(scene_key)
            || self.case_lists.contains_key(scene_key)
            || matches!(
                scene_key,
                CHAPTER_SELECTION_SCENE | STORY_SCENE | RESULT_SCENE
            )
    }
}

/// Letters of `answers` that name an option. Anything else is skipped and
/// reported through `on_invalid`.
pub(crate) fn correct_letters(
    answers: &OneOrMany,
    option_count: usize,
    mut on_invalid: impl FnMut(&str),
) -> BTreeSet<char> {
    let mut letters = BTreeSet::new();
    for raw in answers.as_slice() {
        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) if letter.is_ascii_alphabetic() => {
                let letter = letter.to_ascii_uppercase();
                let index = (letter as u8 - b'A') as usize;
                if index >= option_count {
                    on_invalid(raw);
                }
                letters.insert(letter);
            }
            _ => on_invalid(raw),
        }
    }
    letters
}

/// Cross-reference checks that the schema alone cannot express. Problems are
/// reported, not fatal.
pub(crate) fn validate_content(content: &GameContent) -> Vec<ContentIssue> {
    let mut issues = Vec::new();

    if !content.is_known_scene(&content.start_scene) {
        issues.push(ContentIssue::new(
            "startScene",
            format!("unknown scene '{}'", content.start_scene),
        ));
    }
    if !content.chapters.contains_key(&content.intro_chapter) {
        issues.push(ContentIssue::new(
            "introChapter",
            format!("unknown chapter '{}'", content.intro_chapter),
        ));
    }

    for (scene_key, scene) in &content.scenes {
        let mut npc_names = BTreeSet::new();
        for (index, entity) in scene.entities.iter().enumerate() {
            let path = format!("scenes.{scene_key}.entities[{index}]");
            match entity {
                EntityContent::Portal(portal) => {
                    if !content.is_known_scene(&portal.target_scene) {
                        issues.push(ContentIssue::new(
                            format!("{path}.targetScene"),
                            format!("unknown scene '{}'", portal.target_scene),
                        ));
                    }
                }
                EntityContent::Npc(npc) => {
                    if !npc_names.insert(npc.name.as_str()) {
                        issues.push(ContentIssue::new(
                            format!("{path}.name"),
                            format!("duplicate NPC name '{}' shares a quiz id", npc.name),
                        ));
                    }
                    if let Some(quiz) = &npc.quiz {
                        validate_quiz(quiz, &format!("{path}.quiz"), &mut issues);
                    }
                }
                EntityContent::Collectible(_) => {}
            }
        }
    }

    for (chapter_key, chapter) in &content.chapters {
        let path = format!("chapters.{chapter_key}");
        if chapter.scenes.is_empty() {
            issues.push(ContentIssue::new(format!("{path}.scenes"), "chapter has no scenes"));
        }
        for scene_key in &chapter.scenes {
            if !content.scenes.contains_key(scene_key) {
                issues.push(ContentIssue::new(
                    format!("{path}.scenes"),
                    format!("unknown scene '{scene_key}'"),
                ));
            }
        }
        let roster = content.chapter_roster(chapter_key).len();
        if (chapter.total_quizzes as usize) > roster {
            issues.push(ContentIssue::new(
                format!("{path}.totalQuizzes"),
                format!(
                    "requires {} quizzes but only {roster} exist; the chapter can never clear",
                    chapter.total_quizzes
                ),
            ));
        }
    }

    for (list_key, list) in &content.case_lists {
        if content.scenes.contains_key(list_key) {
            issues.push(ContentIssue::new(
                format!("caseLists.{list_key}"),
                "shares its key with a field scene; the case list wins",
            ));
        }
        if list.cases.is_empty() {
            issues.push(ContentIssue::new(
                format!("caseLists.{list_key}.cases"),
                "case list offers no cases",
            ));
        }
        for (index, entry) in list.cases.iter().enumerate() {
            if !content.case_scenes.contains_key(&entry.scene) {
                issues.push(ContentIssue::new(
                    format!("caseLists.{list_key}.cases[{index}].scene"),
                    format!("unknown case scene '{}'", entry.scene),
                ));
            }
        }
    }

    for (case_key, case) in &content.case_scenes {
        let path = format!("caseScenes.{case_key}");
        if content.scenes.contains_key(case_key) {
            issues.push(ContentIssue::new(
                path.clone(),
                "shares its key with a field scene; the case scene wins",
            ));
        }
        if case.parts.is_empty() {
            issues.push(ContentIssue::new(format!("{path}.parts"), "case has no parts"));
        }
        for (index, part) in case.parts.iter().enumerate() {
            let part_path = format!("{path}.parts[{index}]");
            match part {
                CasePart::Scenario(scenario) if scenario.pages.is_empty() => {
                    issues.push(ContentIssue::new(
                        format!("{part_path}.pages"),
                        "scenario has no pages",
                    ));
                }
                CasePart::Exercise(exercise)
                    if exercise
                        .expected_answer
                        .as_deref()
                        .is_some_and(|answer| answer.trim().is_empty()) =>
                {
                    issues.push(ContentIssue::new(
                        format!("{part_path}.expectedAnswer"),
                        "blank expected answer; only an empty submission passes",
                    ));
                }
                _ => {}
            }
        }
    }

    issues
}

fn validate_quiz(quiz: &QuizContent, path: &str, issues: &mut Vec<ContentIssue>) {
    if quiz.options.is_empty() {
        issues.push(ContentIssue::new(format!("{path}.options"), "quiz has no options"));
    }
    if quiz.options.len() > 26 {
        issues.push(ContentIssue::new(
            format!("{path}.options"),
            "more options than letters A-Z",
        ));
    }
    let letters = correct_letters(&quiz.correct_answer, quiz.options.len(), |raw| {
        issues.push(ContentIssue::new(
            format!("{path}.correctAnswer"),
            format!("'{raw}' does not name an option"),
        ));
    });
    if letters.is_empty() {
        issues.push(ContentIssue::new(
            format!("{path}.correctAnswer"),
            "no correct answer; every submission is graded against an empty set",
        ));
    }
    if !quiz.multi_select && letters.len() > 1 {
        issues.push(ContentIssue::new(
            format!("{path}.correctAnswer"),
            "single-select quiz lists several correct answers and cannot be answered correctly",
        ));
    }
}
