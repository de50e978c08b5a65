use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub(crate) struct QuizId(String);

impl QuizId {
    pub(crate) fn for_npc(scene_key: &str, npc_name: &str) -> Self {
        Self(format!("{scene_key}_{npc_name}"))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModalKind {
    Dialog,
    Quiz,
    CompletedQuiz,
    Help,
    Confirm,
}

/// The single "modal open" slot shared by every controller in a session.
#[derive(Debug, Clone, Default)]
pub(crate) struct ModalGate {
    slot: Rc<Cell<Option<ModalKind>>>,
}

impl ModalGate {
    /// Claims the slot for `kind`. Returns `None` while any other modal holds it.
    pub(crate) fn try_acquire(&self, kind: ModalKind) -> Option<ModalLease> {
        if let Some(open) = self.slot.get() {
            debug!(requested = ?kind, open = ?open, "modal_busy");
            return None;
        }
        self.slot.set(Some(kind));
        Some(ModalLease {
            slot: Rc::clone(&self.slot),
            kind,
        })
    }

    pub(crate) fn is_open(&self) -> bool {
        self.slot.get().is_some()
    }

    pub(crate) fn open_kind(&self) -> Option<ModalKind> {
        self.slot.get()
    }
}

/// Holding a lease means owning the modal slot. Dropping it frees the slot,
/// whichever way the owning modal was closed.
#[derive(Debug)]
pub(crate) struct ModalLease {
    slot: Rc<Cell<Option<ModalKind>>>,
    kind: ModalKind,
}

impl ModalLease {
    pub(crate) fn kind(&self) -> ModalKind {
        self.kind
    }
}

impl Drop for ModalLease {
    fn drop(&mut self) {
        if self.slot.get() == Some(self.kind) {
            self.slot.set(None);
        }
    }
}

/// Session-wide progress shared by every scene. Lives for the whole run and is
/// never written to disk.
#[derive(Debug, Default)]
pub(crate) struct PersistentState {
    completed_quizzes: BTreeSet<QuizId>,
    correct_quizzes: BTreeSet<QuizId>,
    correct_answers: u32,
    user_answers: BTreeMap<QuizId, Vec<char>>,
    collected_items: BTreeSet<String>,
    completed_cases: BTreeSet<String>,
    total_quizzes: u32,
    modal: ModalGate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StateSummary<'a> {
    completed_quizzes: Vec<&'a QuizId>,
    correct_answers: u32,
    user_answers: BTreeMap<&'a str, String>,
    collected_items: Vec<&'a str>,
    completed_cases: Vec<&'a str>,
    total_quizzes: u32,
}

impl PersistentState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn modal(&self) -> &ModalGate {
        &self.modal
    }

    pub(crate) fn is_quiz_completed(&self, quiz_id: &QuizId) -> bool {
        self.completed_quizzes.contains(quiz_id)
    }

    pub(crate) fn completed_count(&self) -> usize {
        self.completed_quizzes.len()
    }

    pub(crate) fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    /// Overwrites the stored answer for `quiz_id` with the sorted letters.
    pub(crate) fn record_answer(&mut self, quiz_id: &QuizId, letters: &BTreeSet<char>) -> Vec<char> {
        let sorted: Vec<char> = letters.iter().copied().collect();
        self.user_answers.insert(quiz_id.clone(), sorted.clone());
        sorted
    }

    pub(crate) fn user_answer(&self, quiz_id: &QuizId) -> Option<&[char]> {
        self.user_answers.get(quiz_id).map(Vec::as_slice)
    }

    /// Marks the quiz completed. Only the first completion of an id can count
    /// towards the correct-answer total. Returns false if it was already done.
    pub(crate) fn complete_quiz(&mut self, quiz_id: &QuizId, correct: bool) -> bool {
        if !self.completed_quizzes.insert(quiz_id.clone()) {
            return false;
        }
        if correct {
            self.correct_quizzes.insert(quiz_id.clone());
            self.correct_answers = self.correct_answers.saturating_add(1);
        }
        true
    }

    /// How many of `quiz_ids` were answered correctly on their first completion.
    pub(crate) fn correct_among(&self, quiz_ids: &[QuizId]) -> u32 {
        let count = quiz_ids
            .iter()
            .filter(|quiz_id| self.correct_quizzes.contains(*quiz_id))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub(crate) fn collect_item(&mut self, item_id: &str) -> bool {
        self.collected_items.insert(item_id.to_string())
    }

    pub(crate) fn is_item_collected(&self, item_id: &str) -> bool {
        self.collected_items.contains(item_id)
    }

    /// Returns false if the case was already completed this session.
    pub(crate) fn complete_case(&mut self, case_key: &str) -> bool {
        self.completed_cases.insert(case_key.to_string())
    }

    pub(crate) fn is_case_completed(&self, case_key: &str) -> bool {
        self.completed_cases.contains(case_key)
    }

    pub(crate) fn total_quizzes(&self) -> u32 {
        self.total_quizzes
    }

    pub(crate) fn set_total_quizzes(&mut self, total: u32) {
        self.total_quizzes = total;
    }

    /// Forgets the given chapter's completions and zeroes the correct-answer count.
    /// Completions outside `chapter_quizzes` are kept.
    pub(crate) fn reset_chapter(&mut self, chapter_quizzes: &[QuizId]) -> usize {
        let before = self.completed_quizzes.len();
        self.completed_quizzes
            .retain(|quiz_id| !chapter_quizzes.contains(quiz_id));
        self.correct_quizzes
            .retain(|quiz_id| !chapter_quizzes.contains(quiz_id));
        self.correct_answers = 0;
        before - self.completed_quizzes.len()
    }

    pub(crate) fn summary(&self) -> StateSummary<'_> {
        StateSummary {
            completed_quizzes: self.completed_quizzes.iter().collect(),
            correct_answers: self.correct_answers,
            user_answers: self
                .user_answers
                .iter()
                .map(|(quiz_id, letters)| (quiz_id.as_str(), letters.iter().collect()))
                .collect(),
            collected_items: self.collected_items.iter().map(String::as_str).collect(),
            completed_cases: self.completed_cases.iter().map(String::as_str).collect(),
            total_quizzes: self.total_quizzes,
        }
    }
}
