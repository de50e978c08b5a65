use std::rc::Rc;

use sage_engine::{
    Countdown, Frame, InputAction, InputSnapshot, PointerEvent, Scene, SceneCommand, SceneKey,
    ScreenAnchor, UiTarget,
};
use tracing::{debug, info, warn};

use super::content::{CaseListContent, CasePart, ExercisePart, GameContent, ReviewPart, StoryPage};
use super::notification::{NotificationQueue, TOAST_SECONDS};
use super::overlays::{ConfirmChoice, ConfirmDialog, HelpModal};
use super::state::PersistentState;
use super::{SceneEntry, StoryNext, StoryRequest, CHAPTER_SELECTION_SCENE, STORY_SCENE};

pub(crate) const CASE_PANEL: &str = "case";
pub(crate) const CASE_LIST_PANEL: &str = "cases";
const MAX_ANSWER_CHARS: usize = 256;
const QUESTIONS_PER_PAGE: usize = 3;
const END_FADE_SECONDS: f32 = 0.5;
const BACKSPACE: char = '\u{8}';
const DEFAULT_SUBMIT_LABEL: &str = "Submit";
const DEFAULT_INCORRECT_FEEDBACK: &str = "Not quite. Read the case again and retry.";
const BACK_TO_CHAPTERS_LABEL: &str = "Back to chapter selection";

/// Free-text answer typed during an exercise.
#[derive(Debug, Default)]
struct AnswerField {
    text: String,
}

impl AnswerField {
    /// Backspace removes the last character. Other control characters are
    /// dropped and nothing is kept past `MAX_ANSWER_CHARS`.
    fn append(&mut self, typed: &str) {
        for ch in typed.chars() {
            if ch == BACKSPACE {
                self.text.pop();
                continue;
            }
            if ch.is_control() || self.text.chars().count() >= MAX_ANSWER_CHARS {
                continue;
            }
            self.text.push(ch);
        }
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn clear(&mut self) {
        self.text.clear();
    }
}

/// One part of a case: a scenario handed to the story scene, an exercise to
/// submit or a review to read. Each part gets a fresh instance, so moving on
/// means switching to the same key with the next part index.
pub(crate) struct CaseScene {
    key: SceneKey,
    content: Rc<GameContent>,
    part_index: usize,
    list_key: SceneKey,
    page: usize,
    answer: AnswerField,
    help: Option<HelpModal>,
    confirm: Option<ConfirmDialog<()>>,
    notifications: NotificationQueue,
    ending: Option<Countdown>,
}

impl CaseScene {
    /// `None` when `key` names no case scene.
    pub(crate) fn new(key: SceneKey, content: Rc<GameContent>, part_index: usize) -> Option<Self> {
        if !content.case_scenes.contains_key(key.as_str()) {
            return None;
        }
        let list_key = SceneKey::new(
            content
                .case_list_of(key.as_str())
                .unwrap_or(CHAPTER_SELECTION_SCENE),
        );
        Some(Self {
            key,
            content,
            part_index,
            list_key,
            page: 0,
            answer: AnswerField::default(),
            help: None,
            confirm: None,
            notifications: NotificationQueue::default(),
            ending: None,
        })
    }

    #[cfg(test)]
    pub(crate) fn answer(&self) -> &str {
        self.answer.text()
    }

    #[cfg(test)]
    pub(crate) fn page(&self) -> usize {
        self.page
    }

    #[cfg(test)]
    pub(crate) fn is_ending(&self) -> bool {
        self.ending.is_some()
    }

    #[cfg(test)]
    pub(crate) fn toast_texts(&self) -> impl Iterator<Item = &str> {
        self.notifications.texts()
    }

    fn back_to_list(&self) -> SceneCommand<SceneEntry> {
        SceneCommand::SwitchTo {
            key: self.list_key.clone(),
            entry: SceneEntry::Menu,
        }
    }

    fn next_part(&self) -> SceneCommand<SceneEntry> {
        info!(case = %self.key, part = self.part_index, "case_part_submitted");
        SceneCommand::SwitchTo {
            key: self.key.clone(),
            entry: SceneEntry::Case {
                part_index: self.part_index + 1,
            },
        }
    }

    fn begin_end(&mut self, state: &mut PersistentState) {
        if self.ending.is_some() {
            return;
        }
        let first_time = state.complete_case(self.key.as_str());
        info!(case = %self.key, first_time, "case_completed");
        self.ending = Some(Countdown::new(END_FADE_SECONDS));
    }

    fn play_scenario(&self, pages: &[StoryPage]) -> SceneCommand<SceneEntry> {
        debug!(case = %self.key, part = self.part_index, pages = pages.len(), "case_scenario");
        SceneCommand::SwitchTo {
            key: SceneKey::new(STORY_SCENE),
            entry: SceneEntry::Story(StoryRequest {
                pages: pages.to_vec(),
                then: StoryNext::CasePart {
                    key: self.key.clone(),
                    part_index: self.part_index + 1,
                },
            }),
        }
    }

    fn turn_page(&mut self, forward: bool, page_count: usize) {
        let last = page_count.saturating_sub(1);
        self.page = if forward {
            (self.page + 1).min(last)
        } else {
            self.page.saturating_sub(1)
        };
    }

    fn update_exercise(
        &mut self,
        exercise: &ExercisePart,
        input: &InputSnapshot,
        state: &PersistentState,
    ) -> SceneCommand<SceneEntry> {
        self.answer.append(input.text());
        if input.pressed(InputAction::PageLeft) || input.pressed(InputAction::PageRight) {
            self.turn_page(
                input.pressed(InputAction::PageRight),
                question_pages(exercise),
            );
        }
        if input.pressed(InputAction::Interact)
            || input.pointer() == Some(PointerEvent::Click(UiTarget::Confirm))
        {
            return self.submit(exercise, state);
        }
        SceneCommand::None
    }

    fn submit(&mut self, exercise: &ExercisePart, state: &PersistentState) -> SceneCommand<SceneEntry> {
        if let Some(expected) = &exercise.expected_answer {
            if self.answer.text().trim() != expected.trim() {
                info!(case = %self.key, part = self.part_index, "case_answer_rejected");
                let feedback = exercise
                    .incorrect_feedback
                    .as_deref()
                    .unwrap_or(DEFAULT_INCORRECT_FEEDBACK);
                self.notifications.push(feedback, TOAST_SECONDS);
                self.answer.clear();
                return SceneCommand::None;
            }
        }
        if let Some(message) = &exercise.confirm_message {
            self.confirm = ConfirmDialog::open(state.modal(), message.clone(), ());
            return SceneCommand::None;
        }
        self.next_part()
    }

    fn update_review(
        &mut self,
        review: &ReviewPart,
        input: &InputSnapshot,
        state: &mut PersistentState,
    ) -> SceneCommand<SceneEntry> {
        let back = input.pressed(InputAction::PageLeft) || input.pressed(InputAction::MoveLeft);
        let forward = input.pressed(InputAction::PageRight) || input.pressed(InputAction::MoveRight);
        if back || forward {
            self.turn_page(forward, review.prompts.len());
        }
        if input.pressed(InputAction::Interact)
            || input.pointer() == Some(PointerEvent::Click(UiTarget::Confirm))
        {
            self.begin_end(state);
        }
        SceneCommand::None
    }

    fn exercise_lines(&self, exercise: &ExercisePart, lines: &mut Vec<String>) {
        lines.extend(exercise.title.iter().cloned());
        lines.push(exercise.description.clone());
        if let Some(image) = &exercise.image {
            lines.push(format!("[{image}]"));
        }
        lines.extend(exercise.reference_text.iter().cloned());

        let first = self.page * QUESTIONS_PER_PAGE;
        for (offset, question) in exercise
            .questions
            .iter()
            .enumerate()
            .skip(first)
            .take(QUESTIONS_PER_PAGE)
        {
            lines.push(format!("Q{}. {question}", offset + 1));
        }
        let pages = question_pages(exercise);
        if pages > 1 {
            lines.push(format!("{} / {pages}", self.page + 1));
        }
        for attachment in &exercise.attachments {
            lines.push(format!("Download: {} ({})", attachment.label, attachment.path));
        }
        lines.push(format!("> {}_", self.answer.text()));
        let submit = exercise.submit_label.as_deref().unwrap_or(DEFAULT_SUBMIT_LABEL);
        lines.push(format!("E/Enter: {submit} | Esc: back to cases"));
    }

    fn review_lines(&self, review: &ReviewPart, lines: &mut Vec<String>) {
        lines.extend(review.title.iter().cloned());
        lines.extend(review.description.iter().cloned());
        if let Some(image) = &review.image {
            lines.push(format!("[{image}]"));
        }
        if let Some(prompt) = review.prompts.get(self.page) {
            lines.push(prompt.title.clone());
            lines.push(prompt.text.clone());
            lines.push(format!("{} / {}", self.page + 1, review.prompts.len()));
        }
        lines.push("E/Enter: end exercise".to_string());
    }
}

fn question_pages(exercise: &ExercisePart) -> usize {
    exercise.questions.len().div_ceil(QUESTIONS_PER_PAGE).max(1)
}

impl Scene<PersistentState, SceneEntry> for CaseScene {
    fn load(&mut self, state: &mut PersistentState) {
        let content = Rc::clone(&self.content);
        match content.case_part(self.key.as_str(), self.part_index) {
            Some(part) => debug!(
                case = %self.key,
                part = self.part_index,
                kind = part.kind(),
                "case_part_started"
            ),
            None => self.begin_end(state),
        }
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        state: &mut PersistentState,
    ) -> SceneCommand<SceneEntry> {
        self.notifications.tick(fixed_dt_seconds);
        if let Some(fade) = self.ending.as_mut() {
            if fade.tick(fixed_dt_seconds) {
                return self.back_to_list();
            }
            return SceneCommand::None;
        }

        if let Some(help) = self.help.as_mut() {
            if !help.handle_input(input) {
                self.help = None;
            }
            return SceneCommand::None;
        }
        if let Some(confirm) = &self.confirm {
            match confirm.handle_input(input) {
                Some(ConfirmChoice::Accept) => {
                    self.confirm = None;
                    return self.next_part();
                }
                Some(ConfirmChoice::Decline) => self.confirm = None,
                None => {}
            }
            return SceneCommand::None;
        }
        if input.pressed(InputAction::Help) && !state.modal().is_open() {
            self.help = HelpModal::open(state.modal(), &self.content.help_pages);
            return SceneCommand::None;
        }
        if input.pressed(InputAction::Cancel)
            || input.pointer() == Some(PointerEvent::Click(UiTarget::Close))
        {
            info!(case = %self.key, part = self.part_index, "case_left");
            return self.back_to_list();
        }

        let content = Rc::clone(&self.content);
        match content.case_part(self.key.as_str(), self.part_index) {
            Some(CasePart::Scenario(scenario)) => self.play_scenario(&scenario.pages),
            Some(CasePart::Exercise(exercise)) => self.update_exercise(exercise, input, state),
            Some(CasePart::Review(review)) => self.update_review(review, input, state),
            None => {
                self.begin_end(state);
                SceneCommand::None
            }
        }
    }

    fn render(&self, _state: &PersistentState, frame: &mut Frame) {
        let Some(case) = self.content.case_scenes.get(self.key.as_str()) else {
            return;
        };
        let mut lines = vec![case.title.clone()];
        match case.parts.get(self.part_index) {
            Some(CasePart::Exercise(exercise)) => self.exercise_lines(exercise, &mut lines),
            Some(CasePart::Review(review)) => self.review_lines(review, &mut lines),
            Some(CasePart::Scenario(_)) | None => {}
        }
        frame.panel(CASE_PANEL, lines);
        frame.label_screen(ScreenAnchor::TopRight, "Back to cases");

        if let Some(help) = &self.help {
            help.render(frame);
        }
        if let Some(confirm) = &self.confirm {
            confirm.render(frame);
        }
        self.notifications.render(frame);
        if let Some(fade) = &self.ending {
            frame.fade(fade.progress());
        }
    }

    fn unload(&mut self, _state: &mut PersistentState) {
        self.help = None;
        self.confirm = None;
    }

    fn debug_title(&self, _state: &PersistentState) -> Option<String> {
        let parts = self
            .content
            .case_scenes
            .get(self.key.as_str())
            .map_or(0, |case| case.parts.len());
        let kind = self
            .content
            .case_part(self.key.as_str(), self.part_index)
            .map_or("end", CasePart::kind);
        Some(format!(
            "{} | part {}/{parts} {kind} | page {}",
            self.key,
            self.part_index + 1,
            self.page + 1
        ))
    }
}

/// The cases of one list plus a row back to chapter selection. Cases finished
/// this session are marked.
pub(crate) struct CaseListScene {
    key: SceneKey,
    content: Rc<GameContent>,
    highlight: usize,
    help: Option<HelpModal>,
}

impl CaseListScene {
    /// `None` when `key` names no case list.
    pub(crate) fn new(key: SceneKey, content: Rc<GameContent>) -> Option<Self> {
        if !content.case_lists.contains_key(key.as_str()) {
            return None;
        }
        Some(Self {
            key,
            content,
            highlight: 0,
            help: None,
        })
    }

    fn list(&self) -> Option<&CaseListContent> {
        self.content.case_lists.get(self.key.as_str())
    }

    fn row_count(&self) -> usize {
        self.list().map_or(0, |list| list.cases.len()) + 1
    }

    pub(crate) fn labels(&self, state: &PersistentState) -> Vec<String> {
        self.list()
            .into_iter()
            .flat_map(|list| list.cases.iter())
            .map(|entry| {
                if state.is_case_completed(&entry.scene) {
                    format!("{} (done)", entry.title)
                } else {
                    entry.title.clone()
                }
            })
            .chain(std::iter::once(BACK_TO_CHAPTERS_LABEL.to_string()))
            .collect()
    }

    fn choose(&self, row: usize) -> SceneCommand<SceneEntry> {
        let Some(entry) = self.list().and_then(|list| list.cases.get(row)) else {
            return SceneCommand::SwitchTo {
                key: SceneKey::new(CHAPTER_SELECTION_SCENE),
                entry: SceneEntry::Menu,
            };
        };
        if !self.content.case_scenes.contains_key(&entry.scene) {
            warn!(list = %self.key, case = %entry.scene, "case_scene_missing");
            return SceneCommand::None;
        }
        info!(list = %self.key, case = %entry.scene, "case_selected");
        SceneCommand::SwitchTo {
            key: SceneKey::new(entry.scene.clone()),
            entry: SceneEntry::Case { part_index: 0 },
        }
    }
}

impl Scene<PersistentState, SceneEntry> for CaseListScene {
    fn load(&mut self, _state: &mut PersistentState) {}

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        state: &mut PersistentState,
    ) -> SceneCommand<SceneEntry> {
        if let Some(help) = self.help.as_mut() {
            if !help.handle_input(input) {
                self.help = None;
            }
            return SceneCommand::None;
        }
        if input.pressed(InputAction::Help) {
            self.help = HelpModal::open(state.modal(), &self.content.help_pages);
            return SceneCommand::None;
        }
        if input.pressed(InputAction::Cancel) {
            return self.choose(self.row_count() - 1);
        }

        let rows = self.row_count();
        match input.pointer() {
            Some(PointerEvent::Click(UiTarget::ListItem(row))) if row < rows => {
                return self.choose(row);
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
            return self.choose(self.highlight);
        }
        SceneCommand::None
    }

    fn render(&self, state: &PersistentState, frame: &mut Frame) {
        let mut lines = Vec::new();
        if let Some(list) = self.list() {
            lines.push(list.title.clone());
            if !list.description.is_empty() {
                lines.push(list.description.clone());
            }
        }
        lines.extend(
            self.labels(state)
                .into_iter()
                .enumerate()
                .map(|(row, label)| {
                    let cursor = if row == self.highlight { ">" } else { " " };
                    format!("{cursor} {label}")
                }),
        );
        frame.panel(CASE_LIST_PANEL, lines);
        if let Some(help) = &self.help {
            help.render(frame);
        }
    }

    fn unload(&mut self, _state: &mut PersistentState) {
        self.help = None;
    }

    fn debug_title(&self, _state: &PersistentState) -> Option<String> {
        Some(format!("{} | row {}", self.key, self.highlight))
    }
}
