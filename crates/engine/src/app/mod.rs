mod input;
mod loop_runner;
mod rendering;
mod scene;
mod script;
mod timer;

pub use input::{InputAction, PointerEvent, UiTarget};
pub use loop_runner::{run_app, AppError, LoopConfig, RunSummary, StopReason};
pub use rendering::{DrawCommand, Frame, Renderer, ScreenAnchor, TraceRenderer};
pub use scene::{
    InputSnapshot, Scene, SceneCommand, SceneKey, SceneMachine, SceneProvider, SceneSwitchError,
    Vec2,
};
pub use script::{parse_script, InputSource, ScriptParseError, ScriptStep, ScriptedInput};
pub use timer::{Countdown, RepeatingTimer};
