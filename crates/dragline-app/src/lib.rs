//! Dragline application shell.
//!
//! Replays recorded view events against a configured tool box, with a move
//! tool and a rotate tool editing a small scene of point handles.

mod render;
mod replay;
mod scene;
mod tools;

pub use render::{Frame, Primitive, RenderOptions};
pub use replay::{FRAME_MS, MOVE_TOOL, ROTATE_TOOL, Report, Script, ScriptError, ScriptEvent, ScriptResult, Session, replay};
pub use scene::{PlanView, Scene, SharedScene};
pub use tools::{HANDLE_PAYLOAD, MoveDrag, MoveTool, RotateDrag, RotateTool};
