use std::fmt;

use thiserror::Error;
use tracing::info;

use super::input::{ActionStates, InputAction, PointerEvent};
use super::rendering::Frame;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneKey(String);

impl SceneKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneCommand<E> {
    None,
    SwitchTo { key: SceneKey, entry: E },
    Quit,
}

#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    actions: ActionStates,
    pointer: Option<PointerEvent>,
    text: String,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.actions.was_pressed(InputAction::Quit)
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// True only on the tick the action went down.
    pub fn pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn pointer(&self) -> Option<PointerEvent> {
        self.pointer
    }

    /// Text typed during this tick. Empty on most ticks.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set_down(action, is_down);
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.mark_pressed(action);
        self
    }

    pub fn with_pointer(mut self, pointer: PointerEvent) -> Self {
        self.pointer = Some(pointer);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A scene runs against a shared context `C` that outlives every scene instance, and
/// receives entry data `E` from whoever switched to it.
pub trait Scene<C, E> {
    fn load(&mut self, ctx: &mut C);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut C,
    ) -> SceneCommand<E>;
    fn render(&self, ctx: &C, frame: &mut Frame);
    fn unload(&mut self, _ctx: &mut C) {}
    fn debug_title(&self, _ctx: &C) -> Option<String> {
        None
    }
}

pub trait SceneProvider<C, E> {
    /// Builds a fresh scene instance for `key`, or `None` when the key is unknown.
    fn create(&self, key: &SceneKey, entry: E) -> Option<Box<dyn Scene<C, E>>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneSwitchError {
    #[error("unknown scene key '{0}'")]
    UnknownScene(SceneKey),
    #[error("no scene is active")]
    NoActiveScene,
}

struct SceneRuntime<C, E> {
    key: SceneKey,
    scene: Box<dyn Scene<C, E>>,
}

/// Owns the shared context and the active scene. Every switch unloads the current
/// scene and loads a freshly created one, so scene-local state never leaks across
/// visits while the context persists.
pub struct SceneMachine<C, E> {
    provider: Box<dyn SceneProvider<C, E>>,
    active: Option<SceneRuntime<C, E>>,
    ctx: C,
    switch_count: u64,
}

impl<C, E> SceneMachine<C, E> {
    pub fn new(provider: Box<dyn SceneProvider<C, E>>, ctx: C) -> Self {
        Self {
            provider,
            active: None,
            ctx,
            switch_count: 0,
        }
    }

    pub fn active_scene(&self) -> Option<&SceneKey> {
        self.active.as_ref().map(|runtime| &runtime.key)
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    pub fn switch_count(&self) -> u64 {
        self.switch_count
    }

    pub fn switch_to(&mut self, key: SceneKey, entry: E) -> Result<(), SceneSwitchError> {
        let Some(mut scene) = self.provider.create(&key, entry) else {
            return Err(SceneSwitchError::UnknownScene(key));
        };

        if let Some(mut previous) = self.active.take() {
            previous.scene.unload(&mut self.ctx);
        }
        scene.load(&mut self.ctx);
        info!(scene = %key, "scene_loaded");
        self.active = Some(SceneRuntime { key, scene });
        self.switch_count = self.switch_count.saturating_add(1);
        Ok(())
    }

    pub fn update_active(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
    ) -> Result<SceneCommand<E>, SceneSwitchError> {
        let runtime = self
            .active
            .as_mut()
            .ok_or(SceneSwitchError::NoActiveScene)?;
        Ok(runtime.scene.update(fixed_dt_seconds, input, &mut self.ctx))
    }

    pub fn render_active(&self, frame: &mut Frame) {
        if let Some(runtime) = &self.active {
            runtime.scene.render(&self.ctx, frame);
        }
    }

    pub fn debug_title_active(&self) -> Option<String> {
        self.active
            .as_ref()
            .and_then(|runtime| runtime.scene.debug_title(&self.ctx))
    }

    pub fn shutdown(&mut self) {
        if let Some(mut runtime) = self.active.take() {
            runtime.scene.unload(&mut self.ctx);
        }
    }

    pub fn into_context(mut self) -> C {
        self.shutdown();
        self.ctx
    }
}
