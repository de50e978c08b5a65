use std::collections::BTreeSet;

use sage_engine::{Frame, InputAction, InputSnapshot, PointerEvent, UiTarget};
use thiserror::Error;
use tracing::{info, warn};

use super::content::{correct_letters, QuizContent};
use super::state::{ModalGate, ModalKind, ModalLease, PersistentState, QuizId};

pub(crate) const QUIZ_PANEL: &str = "quiz";
const FEEDBACK_CORRECT: &str = "Correct!";
const FEEDBACK_INCORRECT: &str = "Not quite.";
const MISSING_EXPLANATION: &str = "No explanation available.";
const NO_RECORD: &str = "(no record)";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Quiz {
    pub(crate) question: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct: BTreeSet<char>,
    pub(crate) multi_select: bool,
    pub(crate) explanation: String,
    pub(crate) explanation_image: Option<String>,
}

impl Quiz {
    pub(crate) fn from_content(content: &QuizContent) -> Self {
        let correct = correct_letters(&content.correct_answer, content.options.len(), |raw| {
            warn!(question = %content.question, answer = raw, "content_warning");
        });
        Self {
            question: content.question.clone(),
            options: content.options.clone(),
            correct,
            multi_select: content.multi_select,
            explanation: content
                .explanation
                .clone()
                .unwrap_or_else(|| MISSING_EXPLANATION.to_string()),
            explanation_image: content.explanation_image.clone(),
        }
    }

    /// Exact set equality, so an empty selection is only correct for an empty key.
    pub(crate) fn grade(&self, selected: &BTreeSet<char>) -> bool {
        *selected == self.correct
    }

    /// Keyboard rows: every option, plus the submit row for multi-select.
    fn row_count(&self) -> usize {
        self.options.len() + usize::from(self.multi_select)
    }
}

pub(crate) fn option_letter(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .filter(|offset| *offset < 26)
        .map(|offset| char::from(b'A' + offset))
        .unwrap_or('?')
}

fn letters_text(letters: &[char]) -> String {
    letters
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum QuizError {
    #[error("cannot open quiz while {0:?} modal is open")]
    ModalBusy(ModalKind),
    #[error("quiz '{0}' is still pending")]
    AlreadyPending(QuizId),
}

/// How a started quiz ended. `outcome` is `None` when the player backed out
/// before grading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuizResolution {
    pub(crate) quiz_id: QuizId,
    pub(crate) outcome: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletedPage {
    Question,
    Answer,
}

#[derive(Debug)]
enum QuizPhase {
    Closed,
    Answering {
        quiz_id: QuizId,
        quiz: Quiz,
        selected: BTreeSet<char>,
        highlight: Option<usize>,
    },
    Explanation {
        quiz_id: QuizId,
        quiz: Quiz,
        correct: bool,
        answer: Vec<char>,
    },
    Completed {
        quiz: Quiz,
        page: CompletedPage,
        remark: String,
        stored_answer: Option<Vec<char>>,
    },
}

#[derive(Debug)]
pub(crate) struct QuizController {
    phase: QuizPhase,
    lease: Option<ModalLease>,
    resolution: Option<QuizResolution>,
}

impl Default for QuizController {
    fn default() -> Self {
        Self {
            phase: QuizPhase::Closed,
            lease: None,
            resolution: None,
        }
    }
}

impl QuizController {
    pub(crate) fn start_quiz(
        &mut self,
        quiz_id: QuizId,
        quiz: Quiz,
        gate: &ModalGate,
    ) -> Result<(), QuizError> {
        if let QuizPhase::Answering { quiz_id: pending, .. }
        | QuizPhase::Explanation { quiz_id: pending, .. } = &self.phase
        {
            return Err(QuizError::AlreadyPending(pending.clone()));
        }
        let lease = gate
            .try_acquire(ModalKind::Quiz)
            .ok_or_else(|| QuizError::ModalBusy(gate.open_kind().unwrap_or(ModalKind::Quiz)))?;
        info!(
            quiz = %quiz_id,
            options = quiz.options.len(),
            multi_select = quiz.multi_select,
            "quiz_started"
        );
        self.phase = QuizPhase::Answering {
            quiz_id,
            quiz,
            selected: BTreeSet::new(),
            highlight: None,
        };
        self.lease = Some(lease);
        self.resolution = None;
        Ok(())
    }

    /// Read-only replay of an already completed quiz.
    pub(crate) fn show_completed(
        &mut self,
        quiz: Quiz,
        remark: String,
        stored_answer: Option<Vec<char>>,
        gate: &ModalGate,
    ) -> Result<(), QuizError> {
        let lease = gate.try_acquire(ModalKind::CompletedQuiz).ok_or_else(|| {
            QuizError::ModalBusy(gate.open_kind().unwrap_or(ModalKind::CompletedQuiz))
        })?;
        self.phase = QuizPhase::Completed {
            quiz,
            page: CompletedPage::Question,
            remark,
            stored_answer,
        };
        self.lease = Some(lease);
        Ok(())
    }

    pub(crate) fn is_open(&self) -> bool {
        !matches!(self.phase, QuizPhase::Closed)
    }

    pub(crate) fn modal_kind(&self) -> Option<ModalKind> {
        self.lease.as_ref().map(ModalLease::kind)
    }

    #[cfg(test)]
    pub(crate) fn is_answering(&self) -> bool {
        matches!(self.phase, QuizPhase::Answering { .. })
    }

    #[cfg(test)]
    pub(crate) fn is_showing_explanation(&self) -> bool {
        matches!(self.phase, QuizPhase::Explanation { .. })
    }

    #[cfg(test)]
    pub(crate) fn completed_page(&self) -> Option<CompletedPage> {
        match &self.phase {
            QuizPhase::Completed { page, .. } => Some(*page),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn highlight(&self) -> Option<usize> {
        match &self.phase {
            QuizPhase::Answering { highlight, .. } => *highlight,
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn selected(&self) -> Option<&BTreeSet<char>> {
        match &self.phase {
            QuizPhase::Answering { selected, .. } => Some(selected),
            _ => None,
        }
    }

    /// The outcome of the last started quiz, once its explanation was closed or
    /// it was abandoned. Yields each resolution once.
    pub(crate) fn take_resolution(&mut self) -> Option<QuizResolution> {
        self.resolution.take()
    }

    pub(crate) fn handle_input(&mut self, input: &InputSnapshot, state: &mut PersistentState) {
        match self.phase {
            QuizPhase::Closed => {}
            QuizPhase::Answering { .. } => self.handle_answering(input, state),
            QuizPhase::Explanation { .. } => {
                let clicked = matches!(input.pointer(), Some(PointerEvent::Click(_)));
                if input.pressed(InputAction::Interact)
                    || input.pressed(InputAction::Cancel)
                    || clicked
                {
                    self.resolve_explanation();
                }
            }
            QuizPhase::Completed { .. } => self.handle_completed(input),
        }
    }

    fn handle_answering(&mut self, input: &InputSnapshot, state: &mut PersistentState) {
        if input.pressed(InputAction::Cancel) {
            self.abandon();
            return;
        }

        let QuizPhase::Answering {
            quiz, highlight, ..
        } = &mut self.phase
        else {
            return;
        };
        let rows = quiz.row_count();
        if rows > 0 {
            if input.pressed(InputAction::NavigateDown) {
                *highlight = Some(highlight.map_or(0, |row| (row + 1) % rows));
            }
            if input.pressed(InputAction::NavigateUp) {
                *highlight = Some(highlight.map_or(rows - 1, |row| (row + rows - 1) % rows));
            }
        }

        match input.pointer() {
            Some(PointerEvent::Enter(UiTarget::ListItem(row))) if row < rows => {
                *highlight = Some(row);
            }
            Some(PointerEvent::Leave) => *highlight = None,
            Some(PointerEvent::Click(UiTarget::ListItem(row))) if row < rows => {
                self.apply_row(row, state);
                return;
            }
            Some(PointerEvent::Click(UiTarget::Confirm)) if quiz.multi_select => {
                self.submit(state);
                return;
            }
            _ => {}
        }

        if input.pressed(InputAction::Interact) {
            if let Some(row) = *highlight {
                self.apply_row(row, state);
            }
        }
    }

    fn apply_row(&mut self, row: usize, state: &mut PersistentState) {
        let QuizPhase::Answering { quiz, selected, .. } = &mut self.phase else {
            return;
        };
        if row >= quiz.options.len() {
            if quiz.multi_select {
                self.submit(state);
            }
            return;
        }
        let letter = option_letter(row);
        if quiz.multi_select {
            if !selected.remove(&letter) {
                selected.insert(letter);
            }
        } else {
            *selected = BTreeSet::from([letter]);
            self.submit(state);
        }
    }

    fn submit(&mut self, state: &mut PersistentState) {
        let phase = std::mem::replace(&mut self.phase, QuizPhase::Closed);
        let QuizPhase::Answering {
            quiz_id,
            quiz,
            selected,
            ..
        } = phase
        else {
            self.phase = phase;
            return;
        };
        let correct = quiz.grade(&selected);
        let answer = state.record_answer(&quiz_id, &selected);
        info!(
            quiz = %quiz_id,
            answer = %letters_text(&answer),
            correct,
            "quiz_graded"
        );
        self.phase = QuizPhase::Explanation {
            quiz_id,
            quiz,
            correct,
            answer,
        };
    }

    fn abandon(&mut self) {
        let phase = std::mem::replace(&mut self.phase, QuizPhase::Closed);
        if let QuizPhase::Answering { quiz_id, .. } = phase {
            self.resolution = Some(QuizResolution {
                quiz_id,
                outcome: None,
            });
        }
        self.lease = None;
    }

    fn resolve_explanation(&mut self) {
        let phase = std::mem::replace(&mut self.phase, QuizPhase::Closed);
        if let QuizPhase::Explanation {
            quiz_id, correct, ..
        } = phase
        {
            self.resolution = Some(QuizResolution {
                quiz_id,
                outcome: Some(correct),
            });
        }
        self.lease = None;
    }

    fn handle_completed(&mut self, input: &InputSnapshot) {
        let QuizPhase::Completed { page, .. } = &mut self.phase else {
            return;
        };
        let close_clicked = matches!(
            input.pointer(),
            Some(PointerEvent::Click(UiTarget::Close | UiTarget::Backdrop))
        );
        if input.pressed(InputAction::Cancel) || close_clicked {
            self.close_completed();
            return;
        }
        let advance = input.pressed(InputAction::Interact)
            || matches!(input.pointer(), Some(PointerEvent::Click(_)));
        if !advance {
            return;
        }
        match *page {
            CompletedPage::Question => *page = CompletedPage::Answer,
            CompletedPage::Answer => self.close_completed(),
        }
    }

    fn close_completed(&mut self) {
        self.phase = QuizPhase::Closed;
        self.lease = None;
    }

    pub(crate) fn render(&self, frame: &mut Frame) {
        let lines = match &self.phase {
            QuizPhase::Closed => return,
            QuizPhase::Answering {
                quiz,
                selected,
                highlight,
                ..
            } => {
                let mut lines = vec![quiz.question.clone()];
                for (index, option) in quiz.options.iter().enumerate() {
                    let letter = option_letter(index);
                    let cursor = if *highlight == Some(index) { ">" } else { " " };
                    let mark = if selected.contains(&letter) { "[x]" } else { "[ ]" };
                    if quiz.multi_select {
                        lines.push(format!("{cursor} {mark} {letter}. {option}"));
                    } else {
                        lines.push(format!("{cursor} {letter}. {option}"));
                    }
                }
                if quiz.multi_select {
                    let cursor = if *highlight == Some(quiz.options.len()) { ">" } else { " " };
                    lines.push(format!("{cursor} Submit"));
                }
                lines.push("Up/Down: choose | E/Enter: confirm".to_string());
                lines
            }
            QuizPhase::Explanation {
                quiz,
                correct,
                answer,
                ..
            } => {
                let feedback = if *correct {
                    FEEDBACK_CORRECT
                } else {
                    FEEDBACK_INCORRECT
                };
                let mut lines = vec![
                    feedback.to_string(),
                    format!("Your answer: {}", letters_text(answer)),
                    format!("Explanation: {}", quiz.explanation),
                ];
                if let Some(image) = &quiz.explanation_image {
                    lines.push(format!("[image: {image}]"));
                }
                lines.push("E/Enter: close".to_string());
                lines
            }
            QuizPhase::Completed {
                quiz,
                page: CompletedPage::Question,
                remark,
                stored_answer,
            } => {
                let mut lines = vec![remark.clone(), quiz.question.clone()];
                lines.extend(
                    quiz.options
                        .iter()
                        .enumerate()
                        .map(|(index, option)| format!("{}. {option}", option_letter(index))),
                );
                let answer = stored_answer
                    .as_deref()
                    .map_or_else(|| NO_RECORD.to_string(), letters_text);
                lines.push(format!("Your answer: {answer}"));
                lines.push("E/Enter: show explanation".to_string());
                lines
            }
            QuizPhase::Completed {
                quiz,
                page: CompletedPage::Answer,
                ..
            } => {
                let correct: Vec<char> = quiz.correct.iter().copied().collect();
                let mut lines = vec![
                    format!("Answer: {}", letters_text(&correct)),
                    format!("Explanation: {}", quiz.explanation),
                ];
                if let Some(image) = &quiz.explanation_image {
                    lines.push(format!("[image: {image}]"));
                }
                lines.push("E/Enter: close".to_string());
                lines
            }
        };
        frame.panel(QUIZ_PANEL, lines);
    }
}
