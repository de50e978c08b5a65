use std::collections::VecDeque;

use thiserror::Error;

use super::input::{InputAction, PointerEvent, UiTarget};
use super::scene::InputSnapshot;

/// Produces one input snapshot per simulation tick. `None` ends the run.
pub trait InputSource {
    fn next_snapshot(&mut self) -> Option<InputSnapshot>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Press(InputAction),
    Hold { action: InputAction, ticks: u32 },
    Wait(u32),
    Pointer(PointerEvent),
    Type(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("script line {line}: {message}")]
pub struct ScriptParseError {
    pub line: usize,
    pub message: String,
}

pub fn parse_script(content: &str) -> Result<Vec<ScriptStep>, ScriptParseError> {
    let mut steps = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let step = parse_typed_text(trimmed)
            .map(Ok)
            .unwrap_or_else(|| parse_step(&tokens))
            .map_err(|message| ScriptParseError {
            line: index + 1,
            message,
        })?;
        steps.push(step);
    }
    Ok(steps)
}

/// `type <text>` keeps everything after the verb verbatim, inner spaces included.
fn parse_typed_text(line: &str) -> Option<ScriptStep> {
    let (verb, rest) = line.split_once(char::is_whitespace)?;
    if !verb.eq_ignore_ascii_case("type") {
        return None;
    }
    Some(ScriptStep::Type(rest.trim().to_string()))
}

fn parse_step(tokens: &[&str]) -> Result<ScriptStep, String> {
    let Some((verb, args)) = tokens.split_first() else {
        return Err("empty command".to_string());
    };
    match verb.to_ascii_lowercase().as_str() {
        "press" => {
            let [action] = args else {
                return Err("usage: press <action>".to_string());
            };
            Ok(ScriptStep::Press(parse_action(action)?))
        }
        "hold" => {
            let [action, ticks] = args else {
                return Err("usage: hold <action> <ticks>".to_string());
            };
            Ok(ScriptStep::Hold {
                action: parse_action(action)?,
                ticks: parse_ticks(ticks)?,
            })
        }
        "wait" => {
            let [ticks] = args else {
                return Err("usage: wait <ticks>".to_string());
            };
            Ok(ScriptStep::Wait(parse_ticks(ticks)?))
        }
        "click" => Ok(ScriptStep::Pointer(PointerEvent::Click(parse_target(
            args, "click",
        )?))),
        "hover" => {
            if matches!(args, [arg] if arg.eq_ignore_ascii_case("none")) {
                return Ok(ScriptStep::Pointer(PointerEvent::Leave));
            }
            Ok(ScriptStep::Pointer(PointerEvent::Enter(parse_target(
                args, "hover",
            )?)))
        }
        "type" => Err("usage: type <text>".to_string()),
        "quit" => {
            if !args.is_empty() {
                return Err("usage: quit".to_string());
            }
            Ok(ScriptStep::Quit)
        }
        other => Err(format!("unknown command '{other}'")),
    }
}

fn parse_action(token: &str) -> Result<InputAction, String> {
    InputAction::from_token(token).ok_or_else(|| format!("unknown action '{token}'"))
}

fn parse_ticks(token: &str) -> Result<u32, String> {
    token
        .parse::<u32>()
        .map_err(|_| format!("invalid tick count '{token}' (expected u32)"))
}

fn parse_target(args: &[&str], verb: &str) -> Result<UiTarget, String> {
    match args {
        [kind, index] if kind.eq_ignore_ascii_case("item") => index
            .parse::<usize>()
            .map(UiTarget::ListItem)
            .map_err(|_| format!("invalid item index '{index}' (expected usize)")),
        [kind] => match kind.to_ascii_lowercase().as_str() {
            "confirm" => Ok(UiTarget::Confirm),
            "close" => Ok(UiTarget::Close),
            "backdrop" => Ok(UiTarget::Backdrop),
            other => Err(format!("unknown ui target '{other}'")),
        },
        _ => Err(format!(
            "usage: {verb} item <n>|confirm|close|backdrop"
        )),
    }
}

/// Replays parsed script steps one tick at a time. Press edges last exactly one
/// tick; held actions report a press edge on their first tick only.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    pending: VecDeque<InputSnapshot>,
}

impl ScriptedInput {
    pub fn from_steps(steps: &[ScriptStep]) -> Self {
        let mut pending = VecDeque::new();
        for step in steps {
            match step {
                ScriptStep::Press(action) => {
                    pending.push_back(InputSnapshot::empty().with_action_pressed(*action));
                }
                ScriptStep::Hold { action, ticks } => {
                    let action = *action;
                    for tick in 0..*ticks {
                        let snapshot = if tick == 0 {
                            InputSnapshot::empty().with_action_pressed(action)
                        } else {
                            InputSnapshot::empty().with_action_down(action, true)
                        };
                        pending.push_back(snapshot);
                    }
                }
                ScriptStep::Wait(ticks) => {
                    pending.extend((0..*ticks).map(|_| InputSnapshot::empty()));
                }
                ScriptStep::Pointer(event) => {
                    pending.push_back(InputSnapshot::empty().with_pointer(*event));
                }
                ScriptStep::Type(text) => {
                    pending.push_back(InputSnapshot::empty().with_text(text.clone()));
                }
                ScriptStep::Quit => {
                    pending.push_back(InputSnapshot::empty().with_action_pressed(InputAction::Quit));
                }
            }
        }
        Self { pending }
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = InputSnapshot>) -> Self {
        Self {
            pending: snapshots.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl InputSource for ScriptedInput {
    fn next_snapshot(&mut self) -> Option<InputSnapshot> {
        self.pending.pop_front()
    }
}
