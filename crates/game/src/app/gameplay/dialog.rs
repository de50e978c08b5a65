use sage_engine::{Frame, RepeatingTimer};

use super::state::{ModalGate, ModalKind, ModalLease};

pub(crate) const DIALOG_PANEL: &str = "dialog";
pub(crate) const TYPEWRITER_INTERVAL_SECONDS: f32 = 0.05;
const ADVANCE_HINT: &str = "E/Enter: next";
const CLOSE_HINT: &str = "E/Enter: close";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialogPhase {
    Idle,
    Typing,
    AwaitingAdvance,
    AwaitingClose,
}

/// One conversation's dialog box with a typewriter reveal. The modal lease is
/// held from the first line until the conversation closes.
#[derive(Debug)]
pub(crate) struct DialogController {
    phase: DialogPhase,
    speaker: String,
    full_text: String,
    revealed_chars: usize,
    total_chars: usize,
    more_follows: bool,
    typing: Option<RepeatingTimer>,
    lease: Option<ModalLease>,
}

impl Default for DialogController {
    fn default() -> Self {
        Self {
            phase: DialogPhase::Idle,
            speaker: String::new(),
            full_text: String::new(),
            revealed_chars: 0,
            total_chars: 0,
            more_follows: false,
            typing: None,
            lease: None,
        }
    }
}

impl DialogController {
    /// Starts typing `text`. Returns false when another modal owns the gate.
    pub(crate) fn open(
        &mut self,
        gate: &ModalGate,
        speaker: &str,
        text: &str,
        more_follows: bool,
    ) -> bool {
        if self.lease.is_none() {
            let Some(lease) = gate.try_acquire(ModalKind::Dialog) else {
                return false;
            };
            self.lease = Some(lease);
        }

        self.speaker = speaker.to_string();
        self.full_text = text.to_string();
        self.total_chars = text.chars().count();
        self.revealed_chars = 0;
        self.more_follows = more_follows;
        if self.total_chars == 0 {
            self.finish_typing();
        } else {
            self.typing = Some(RepeatingTimer::new(
                TYPEWRITER_INTERVAL_SECONDS,
                reveal_steps(self.total_chars),
            ));
            self.phase = DialogPhase::Typing;
        }
        true
    }

    pub(crate) fn tick(&mut self, dt_seconds: f32) {
        let Some(timer) = self.typing.as_mut() else {
            return;
        };
        let fired = timer.tick(dt_seconds) as usize;
        self.revealed_chars = (self.revealed_chars + fired).min(self.total_chars);
        if timer.is_finished() {
            self.finish_typing();
        }
    }

    /// Completes the reveal at once. No-op unless typing.
    pub(crate) fn skip(&mut self) {
        if self.phase == DialogPhase::Typing {
            if let Some(timer) = self.typing.as_mut() {
                timer.cancel();
            }
            self.finish_typing();
        }
    }

    fn finish_typing(&mut self) {
        self.typing = None;
        self.revealed_chars = self.total_chars;
        self.phase = if self.more_follows {
            DialogPhase::AwaitingAdvance
        } else {
            DialogPhase::AwaitingClose
        };
    }

    /// Hides the box and frees the modal gate. Closing twice is harmless.
    pub(crate) fn close(&mut self) {
        self.phase = DialogPhase::Idle;
        self.typing = None;
        self.lease = None;
        self.full_text.clear();
        self.revealed_chars = 0;
        self.total_chars = 0;
    }

    pub(crate) fn phase(&self) -> DialogPhase {
        self.phase
    }

    pub(crate) fn is_active(&self) -> bool {
        self.phase != DialogPhase::Idle
    }

    #[cfg(test)]
    pub(crate) fn is_typing(&self) -> bool {
        self.phase == DialogPhase::Typing
    }

    #[cfg(test)]
    pub(crate) fn is_awaiting_close(&self) -> bool {
        self.phase == DialogPhase::AwaitingClose
    }

    pub(crate) fn visible_text(&self) -> &str {
        match self.full_text.char_indices().nth(self.revealed_chars) {
            Some((byte_index, _)) => &self.full_text[..byte_index],
            None => &self.full_text,
        }
    }

    pub(crate) fn render(&self, frame: &mut Frame) {
        let hint = match self.phase {
            DialogPhase::Idle => return,
            DialogPhase::Typing => "",
            DialogPhase::AwaitingAdvance => ADVANCE_HINT,
            DialogPhase::AwaitingClose => CLOSE_HINT,
        };
        let mut lines = vec![self.speaker.clone(), self.visible_text().to_string()];
        if !hint.is_empty() {
            lines.push(hint.to_string());
        }
        frame.panel(DIALOG_PANEL, lines);
    }
}

/// One timer firing per character, saturating for absurdly long lines.
fn reveal_steps(total_chars: usize) -> u32 {
    u32::try_from(total_chars).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typewriter_reveals_one_char_per_interval() {
        let gate = ModalGate::default();
        let mut dialog = DialogController::default();
        assert!(dialog.open(&gate, "村人A", "こんにちは", false));
        assert!(dialog.is_typing());
        assert_eq!(dialog.visible_text(), "");

        dialog.tick(TYPEWRITER_INTERVAL_SECONDS * 2.5);
        assert_eq!(dialog.visible_text(), "こん");
        dialog.tick(1.0);
        assert_eq!(dialog.visible_text(), "こんにちは");
        assert_eq!(dialog.phase(), DialogPhase::AwaitingClose);
    }

    #[test]
    fn skip_leaves_full_untruncated_text() {
        let gate = ModalGate::default();
        let mut dialog = DialogController::default();
        dialog.open(&gate, "Sage", "A long line of text", true);
        dialog.tick(TYPEWRITER_INTERVAL_SECONDS);
        dialog.skip();

        assert_eq!(dialog.visible_text(), "A long line of text");
        assert_eq!(dialog.phase(), DialogPhase::AwaitingAdvance);
        dialog.tick(1.0);
        assert_eq!(dialog.visible_text(), "A long line of text");
    }

    #[test]
    fn lease_spans_lines_and_close_is_idempotent() {
        let gate = ModalGate::default();
        let mut dialog = DialogController::default();
        dialog.open(&gate, "Sage", "one", true);
        assert_eq!(gate.open_kind(), Some(ModalKind::Dialog));
        assert!(dialog.open(&gate, "Sage", "two", false), "reuses its own lease");

        dialog.close();
        assert!(!gate.is_open());
        assert!(!dialog.is_active());
        dialog.close();
        assert!(!gate.is_open());
    }

    #[test]
    fn open_is_refused_while_another_modal_is_up() {
        let gate = ModalGate::default();
        let _help = gate.try_acquire(ModalKind::Help).expect("help lease");
        let mut dialog = DialogController::default();
        assert!(!dialog.open(&gate, "Sage", "hi", false));
        assert!(!dialog.is_active());
    }

    #[test]
    fn empty_line_is_immediately_complete() {
        let gate = ModalGate::default();
        let mut dialog = DialogController::default();
        dialog.open(&gate, "Sage", "", false);
        assert!(dialog.is_awaiting_close());
    }

    #[test]
    fn reveal_steps_saturate_instead_of_wrapping() {
        assert_eq!(reveal_steps(12), 12);
        assert_eq!(reveal_steps(usize::MAX), u32::MAX);
    }
}
