use tracing::debug;

use super::scene::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenAnchor {
    TopLeft,
    TopRight,
    Center,
    Bottom,
}

/// Backend-agnostic description of one visual element. Scenes describe what is
/// visible; the renderer decides how it looks.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Sprite { key: String, position: Vec2 },
    WorldLabel { position: Vec2, text: String },
    ScreenLabel { anchor: ScreenAnchor, text: String },
    Panel { id: &'static str, lines: Vec<String> },
    Fade { alpha: f32 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    commands: Vec<DrawCommand>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn sprite(&mut self, key: impl Into<String>, position: Vec2) {
        self.push(DrawCommand::Sprite {
            key: key.into(),
            position,
        });
    }

    pub fn label_world(&mut self, position: Vec2, text: impl Into<String>) {
        self.push(DrawCommand::WorldLabel {
            position,
            text: text.into(),
        });
    }

    pub fn label_screen(&mut self, anchor: ScreenAnchor, text: impl Into<String>) {
        self.push(DrawCommand::ScreenLabel {
            anchor,
            text: text.into(),
        });
    }

    pub fn panel(&mut self, id: &'static str, lines: Vec<String>) {
        self.push(DrawCommand::Panel { id, lines });
    }

    pub fn fade(&mut self, alpha: f32) {
        self.push(DrawCommand::Fade {
            alpha: alpha.clamp(0.0, 1.0),
        });
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn panel_lines(&self, id: &str) -> Option<&[String]> {
        self.commands.iter().find_map(|command| match command {
            DrawCommand::Panel { id: panel_id, lines } if *panel_id == id => {
                Some(lines.as_slice())
            }
            _ => None,
        })
    }

    pub fn world_labels(&self) -> impl Iterator<Item = (Vec2, &str)> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::WorldLabel { position, text } => Some((*position, text.as_str())),
            _ => None,
        })
    }

    pub fn screen_label(&self, anchor: ScreenAnchor) -> Option<&str> {
        self.commands.iter().find_map(|command| match command {
            DrawCommand::ScreenLabel {
                anchor: label_anchor,
                text,
            } if *label_anchor == anchor => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

pub trait Renderer {
    fn present(&mut self, frame: &Frame);
}

/// Headless renderer: logs UI text whenever the presented frame changes.
#[derive(Debug, Default)]
pub struct TraceRenderer {
    last: Frame,
    presented_frames: u64,
    changed_frames: u64,
}

impl TraceRenderer {
    pub fn presented_frames(&self) -> u64 {
        self.presented_frames
    }

    pub fn changed_frames(&self) -> u64 {
        self.changed_frames
    }
}

impl Renderer for TraceRenderer {
    fn present(&mut self, frame: &Frame) {
        self.presented_frames = self.presented_frames.saturating_add(1);
        if *frame == self.last {
            return;
        }
        self.changed_frames = self.changed_frames.saturating_add(1);
        for command in frame.commands() {
            if self.last.commands().contains(command) {
                continue;
            }
            match command {
                DrawCommand::Panel { id, lines } => {
                    debug!(panel = id, text = %lines.join(" | "), "frame_panel");
                }
                DrawCommand::ScreenLabel { anchor, text } => {
                    debug!(anchor = ?anchor, text = %text, "frame_label");
                }
                DrawCommand::WorldLabel { position, text } => {
                    debug!(x = position.x, y = position.y, text = %text, "frame_prompt");
                }
                DrawCommand::Sprite { .. } | DrawCommand::Fade { .. } => {}
            }
        }
        self.last = frame.clone();
    }
}
