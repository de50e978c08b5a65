use sage_engine::{Frame, InputAction, InputSnapshot, PointerEvent, UiTarget};
use tracing::debug;

use super::content::StoryPage;
use super::entity::Portal;
use super::state::{ModalGate, ModalKind, ModalLease};

pub(crate) const HELP_PANEL: &str = "help";
pub(crate) const CONFIRM_PANEL: &str = "confirm";

fn closes_overlay(input: &InputSnapshot) -> bool {
    input.pressed(InputAction::Cancel)
        || matches!(
            input.pointer(),
            Some(PointerEvent::Click(UiTarget::Close | UiTarget::Backdrop))
        )
}

/// Paginated how-to-play pages.
#[derive(Debug)]
pub(crate) struct HelpModal {
    pages: Vec<StoryPage>,
    page: usize,
    lease: ModalLease,
}

impl HelpModal {
    pub(crate) fn open(gate: &ModalGate, pages: &[StoryPage]) -> Option<Self> {
        if pages.is_empty() {
            debug!("help_skipped_no_pages");
            return None;
        }
        let lease = gate.try_acquire(ModalKind::Help)?;
        Some(Self {
            pages: pages.to_vec(),
            page: 0,
            lease,
        })
    }

    #[cfg(test)]
    pub(crate) fn page(&self) -> usize {
        self.page
    }

    /// Returns false once the modal wants to close; dropping it frees the gate.
    pub(crate) fn handle_input(&mut self, input: &InputSnapshot) -> bool {
        if closes_overlay(input) || input.pressed(InputAction::Help) {
            debug!(kind = ?self.lease.kind(), "modal_closed");
            return false;
        }
        let last = self.pages.len() - 1;
        if input.pressed(InputAction::MoveLeft) || input.pressed(InputAction::PageLeft) {
            self.page = self.page.saturating_sub(1);
        } else if input.pressed(InputAction::MoveRight) || input.pressed(InputAction::PageRight) {
            self.page = (self.page + 1).min(last);
        }
        true
    }

    pub(crate) fn render(&self, frame: &mut Frame) {
        let Some(page) = self.pages.get(self.page) else {
            return;
        };
        let mut lines = vec![page.text.clone()];
        if let Some(image) = &page.image {
            lines.push(format!("[{image}]"));
        }
        lines.push(format!("{} / {}", self.page + 1, self.pages.len()));
        frame.panel(HELP_PANEL, lines);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfirmChoice {
    Accept,
    Decline,
}

/// Yes/No question that holds whatever should happen on "yes" until it is
/// answered.
#[derive(Debug)]
pub(crate) struct ConfirmDialog<T> {
    message: String,
    payload: T,
    _lease: ModalLease,
}

impl<T> ConfirmDialog<T> {
    pub(crate) fn open(gate: &ModalGate, message: impl Into<String>, payload: T) -> Option<Self> {
        let lease = gate.try_acquire(ModalKind::Confirm)?;
        Some(Self {
            message: message.into(),
            payload,
            _lease: lease,
        })
    }

    pub(crate) fn payload(&self) -> &T {
        &self.payload
    }

    pub(crate) fn handle_input(&self, input: &InputSnapshot) -> Option<ConfirmChoice> {
        if input.pressed(InputAction::Interact)
            || matches!(input.pointer(), Some(PointerEvent::Click(UiTarget::Confirm)))
        {
            return Some(ConfirmChoice::Accept);
        }
        if closes_overlay(input) {
            return Some(ConfirmChoice::Decline);
        }
        None
    }

    pub(crate) fn render(&self, frame: &mut Frame) {
        frame.panel(
            CONFIRM_PANEL,
            vec![
                self.message.clone(),
                "E/Enter: yes".to_string(),
                "Esc: no".to_string(),
            ],
        );
    }
}

/// The question asked before a confirm-portal fires.
pub(crate) fn portal_question(portal: &Portal) -> String {
    format!("Go to {}?", portal.target)
}
