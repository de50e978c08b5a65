#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    Interact,
    NavigateUp,
    NavigateDown,
    PageLeft,
    PageRight,
    Cancel,
    Help,
    Quit,
}

const ACTION_COUNT: usize = 11;

/// Pointer-addressable UI element. List items are indexed in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiTarget {
    ListItem(usize),
    Confirm,
    Close,
    Backdrop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Click(UiTarget),
    Enter(UiTarget),
    Leave,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set_down(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn mark_pressed(&mut self, action: InputAction) {
        self.pressed[action.index()] = true;
        self.down[action.index()] = true;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }
}

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Jump,
        InputAction::Interact,
        InputAction::NavigateUp,
        InputAction::NavigateDown,
        InputAction::PageLeft,
        InputAction::PageRight,
        InputAction::Cancel,
        InputAction::Help,
        InputAction::Quit,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::Interact => 3,
            InputAction::NavigateUp => 4,
            InputAction::NavigateDown => 5,
            InputAction::PageLeft => 6,
            InputAction::PageRight => 7,
            InputAction::Cancel => 8,
            InputAction::Help => 9,
            InputAction::Quit => 10,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            InputAction::MoveLeft => "left",
            InputAction::MoveRight => "right",
            InputAction::Jump => "jump",
            InputAction::Interact => "interact",
            InputAction::NavigateUp => "up",
            InputAction::NavigateDown => "down",
            InputAction::PageLeft => "page_left",
            InputAction::PageRight => "page_right",
            InputAction::Cancel => "cancel",
            InputAction::Help => "help",
            InputAction::Quit => "quit",
        }
    }

    /// Accepts the canonical token plus the key names the browser build used.
    pub fn from_token(token: &str) -> Option<Self> {
        let lowered = token.trim().to_ascii_lowercase();
        let action = match lowered.as_str() {
            "a" | "arrowleft" => InputAction::MoveLeft,
            "d" | "arrowright" => InputAction::MoveRight,
            "w" | "space" => InputAction::Jump,
            "e" | "enter" => InputAction::Interact,
            "arrowup" => InputAction::NavigateUp,
            "s" | "arrowdown" => InputAction::NavigateDown,
            "esc" | "escape" => InputAction::Cancel,
            "h" => InputAction::Help,
            other => return Self::ALL.into_iter().find(|action| action.as_token() == other),
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_for_every_action() {
        for action in InputAction::ALL {
            assert_eq!(InputAction::from_token(action.as_token()), Some(action));
        }
    }

    #[test]
    fn key_aliases_map_to_logical_actions() {
        assert_eq!(InputAction::from_token("E"), Some(InputAction::Interact));
        assert_eq!(InputAction::from_token("Enter"), Some(InputAction::Interact));
        assert_eq!(InputAction::from_token("ESC"), Some(InputAction::Cancel));
        assert_eq!(InputAction::from_token("ArrowDown"), Some(InputAction::NavigateDown));
        assert_eq!(InputAction::from_token("fly"), None);
    }

    #[test]
    fn pressed_implies_down() {
        let mut states = ActionStates::default();
        states.mark_pressed(InputAction::Interact);
        assert!(states.was_pressed(InputAction::Interact));
        assert!(states.is_down(InputAction::Interact));

        states.set_down(InputAction::MoveLeft, true);
        assert!(states.is_down(InputAction::MoveLeft));
        assert!(!states.was_pressed(InputAction::MoveLeft));
    }
}
