//! Event scripts and their replay through a view connector.
//!
//! A script is a JSON document holding an initial scene and a list of view
//! events. Events that need a timestamp (button presses and releases) use a
//! virtual clock that advances by [`FRAME_MS`] per pointer event and by
//! explicit `wait` events.

use crate::render::{Frame, RenderOptions};
use crate::scene::{PlanView, Scene, SharedScene};
use crate::tools::{MoveTool, RotateTool};
use dragline_core::{
    ConfigError, DraglineConfig, Modifiers, MouseButton, Subscription, ToolBox, ToolBoxEvent, ToolChain, ToolId,
    ViewConnector,
};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Name of the tool driven by [`MoveTool`].
pub const MOVE_TOOL: &str = "move";

/// Name of the tool driven by [`RotateTool`].
pub const ROTATE_TOOL: &str = "rotate";

/// Virtual time between two pointer events.
pub const FRAME_MS: u64 = 16;

/// Replay errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Tool is not active: {0}")]
    InactiveTool(String),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for replay operations.
pub type ScriptResult<T> = Result<T, ScriptError>;

fn left() -> MouseButton {
    MouseButton::Left
}

/// One recorded view event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Activate {
        tool: String,
    },
    Deactivate {
        tool: String,
    },
    Toggle {
        tool: String,
    },
    Enable,
    Disable,
    /// Replace the held modifier keys.
    Modifiers {
        #[serde(default)]
        shift: bool,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        alt: bool,
        #[serde(default)]
        meta: bool,
    },
    Down {
        x: f64,
        y: f64,
        #[serde(default = "left")]
        button: MouseButton,
    },
    Up {
        x: f64,
        y: f64,
        #[serde(default = "left")]
        button: MouseButton,
    },
    Move {
        x: f64,
        y: f64,
    },
    DoubleClick {
        x: f64,
        y: f64,
        #[serde(default = "left")]
        button: MouseButton,
    },
    Wheel {
        dx: f64,
        dy: f64,
    },
    /// Advance the virtual clock.
    Wait {
        ms: u64,
    },
    DragEnter {
        x: f64,
        y: f64,
        payload: String,
    },
    DragMove {
        x: f64,
        y: f64,
    },
    DragLeave,
    Drop {
        x: f64,
        y: f64,
    },
    GestureStart,
    GesturePan {
        dx: f64,
        dy: f64,
    },
    GestureZoom {
        zoom: f64,
    },
    GestureRotate {
        degrees: f64,
    },
    GestureEnd,
    FocusLost,
    CaptureLost,
    WindowDeactivated,
    FocusGained,
    /// Escape key.
    Cancel,
    /// Draw one frame and keep it in the report.
    Render,
}

/// A replayable script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub scene: Scene,
    pub events: Vec<ScriptEvent>,
}

impl Script {
    pub fn from_json(json: &str) -> ScriptResult<Self> {
        serde_json::from_str(json).map_err(|e| ScriptError::Serialization(format!("Failed to parse script: {}", e)))
    }

    pub fn load(path: &Path) -> ScriptResult<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| ScriptError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub scene: Scene,
    /// Active tools in activation order.
    pub active_tools: Vec<String>,
    /// Tool box notifications, e.g. `activated move`.
    pub tool_events: Vec<String>,
    pub frames: Vec<Frame>,
}

/// A configured tool box, the demo tools and a virtual clock.
pub struct Session {
    connector: ViewConnector<PlanView>,
    scene: SharedScene,
    events: Rc<RefCell<Vec<ToolBoxEvent>>>,
    _subscription: Subscription,
    frames: Vec<Frame>,
    clock_ms: u64,
}

impl Session {
    pub fn new(config: &DraglineConfig, scene: Scene) -> ScriptResult<Self> {
        let (tool_box, ids) = ToolBox::from_config(config)?;
        let events = Rc::new(RefCell::new(Vec::new()));
        let subscription = {
            let events = Rc::clone(&events);
            tool_box.subscribe(move |event| events.borrow_mut().push(*event))
        };

        let scene = scene.into_shared();
        let grid = config.grid();
        let mut connector = ViewConnector::new(tool_box, ToolChain::new(), PlanView, config.connector);
        match ids.get(MOVE_TOOL) {
            Some(&id) => connector.add_controller(MoveTool::new(id, Rc::clone(&scene), grid)),
            None => log::warn!("No '{MOVE_TOOL}' tool configured"),
        }
        match ids.get(ROTATE_TOOL) {
            Some(&id) => connector.add_controller(RotateTool::new(id, Rc::clone(&scene), grid)),
            None => log::warn!("No '{ROTATE_TOOL}' tool configured"),
        }

        Ok(Self {
            connector,
            scene,
            events,
            _subscription: subscription,
            frames: Vec::new(),
            clock_ms: 0,
        })
    }

    pub fn connector(&self) -> &ViewConnector<PlanView> {
        &self.connector
    }

    pub fn scene(&self) -> Scene {
        self.scene.borrow().clone()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    fn tool_id(&self, name: &str) -> ScriptResult<ToolId> {
        self.connector
            .tool_box()
            .tool_by_name(name)
            .ok_or_else(|| ScriptError::UnknownTool(name.to_string()))
    }

    fn tick(&mut self) -> u64 {
        self.clock_ms += FRAME_MS;
        self.clock_ms
    }

    /// Replay every event in order, stopping at the first error.
    pub fn run(&mut self, events: &[ScriptEvent]) -> ScriptResult<()> {
        for (index, event) in events.iter().enumerate() {
            log::debug!("Event {index}: {event:?}");
            self.apply(event)?;
        }
        Ok(())
    }

    pub fn apply(&mut self, event: &ScriptEvent) -> ScriptResult<()> {
        match event {
            ScriptEvent::Activate { tool } => {
                let id = self.tool_id(tool)?;
                if !self.connector.tool_box_mut().activate(id) {
                    log::warn!("Tool '{tool}' is suppressed");
                }
            }
            ScriptEvent::Deactivate { tool } => {
                let id = self.tool_id(tool)?;
                if !self.connector.tool_box().is_active(id) {
                    return Err(ScriptError::InactiveTool(tool.clone()));
                }
                self.connector.tool_box_mut().deactivate(id);
            }
            ScriptEvent::Toggle { tool } => {
                let id = self.tool_id(tool)?;
                self.connector.tool_box_mut().toggle(id);
            }
            ScriptEvent::Enable => self.connector.tool_box_mut().enable(),
            ScriptEvent::Disable => self.connector.tool_box_mut().disable(),
            ScriptEvent::Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            } => self.connector.set_modifiers(Modifiers {
                shift: *shift,
                ctrl: *ctrl,
                alt: *alt,
                meta: *meta,
            }),
            ScriptEvent::Down { x, y, button } => {
                let time = self.tick();
                self.connector.mouse_button_down(*button, Point::new(*x, *y), time);
            }
            ScriptEvent::Up { x, y, button } => {
                let time = self.tick();
                self.connector.mouse_button_up(*button, Point::new(*x, *y), time);
            }
            ScriptEvent::Move { x, y } => {
                self.tick();
                self.connector.mouse_motion(Point::new(*x, *y));
            }
            ScriptEvent::DoubleClick { x, y, button } => {
                self.tick();
                self.connector.mouse_double_click(*button, Point::new(*x, *y));
            }
            ScriptEvent::Wheel { dx, dy } => self.connector.mouse_wheel(Vec2::new(*dx, *dy)),
            ScriptEvent::Wait { ms } => self.clock_ms += ms,
            ScriptEvent::DragEnter { x, y, payload } => {
                if !self.connector.drag_enter(Point::new(*x, *y), payload) {
                    log::info!("Payload '{payload}' refused");
                }
            }
            ScriptEvent::DragMove { x, y } => {
                self.connector.drag_move(Point::new(*x, *y));
            }
            ScriptEvent::DragLeave => self.connector.drag_leave(),
            ScriptEvent::Drop { x, y } => {
                if !self.connector.drag_drop(Point::new(*x, *y)) {
                    log::info!("Drop at {x} {y} not consumed");
                }
            }
            ScriptEvent::GestureStart => {
                self.connector.gesture_start();
            }
            ScriptEvent::GesturePan { dx, dy } => self.connector.gesture_pan(Vec2::new(*dx, *dy)),
            ScriptEvent::GestureZoom { zoom } => self.connector.gesture_zoom(*zoom),
            ScriptEvent::GestureRotate { degrees } => self.connector.gesture_rotate(degrees.to_radians()),
            ScriptEvent::GestureEnd => self.connector.gesture_end(),
            ScriptEvent::FocusLost => self.connector.focus_lost(),
            ScriptEvent::CaptureLost => self.connector.capture_lost(),
            ScriptEvent::WindowDeactivated => self.connector.window_deactivated(),
            ScriptEvent::FocusGained => self.connector.focus_gained(),
            ScriptEvent::Cancel => {
                if !self.connector.cancel() {
                    log::debug!("Nothing to cancel");
                }
            }
            ScriptEvent::Render => {
                let mut options = RenderOptions::default();
                let mut frame = Frame::default();
                self.connector.set_render_options(&mut options);
                self.connector.render(&mut options, &mut frame);
                frame.options = options;
                log::debug!("{frame}");
                self.frames.push(frame);
            }
        }
        Ok(())
    }

    pub fn report(&self) -> Report {
        let tool_box = self.connector.tool_box();
        let name = |id: ToolId| tool_box.tool(id).name().to_string();
        let tool_events = self
            .events
            .borrow()
            .iter()
            .map(|event| match *event {
                ToolBoxEvent::ToolActivated(id) => format!("activated {}", name(id)),
                ToolBoxEvent::ToolDeactivated(id) => format!("deactivated {}", name(id)),
                ToolBoxEvent::RefreshViews(id) => format!("refresh {}", name(id)),
            })
            .collect();

        Report {
            scene: self.scene(),
            active_tools: tool_box.modal_stack().iter().map(|&id| name(id)).collect(),
            tool_events,
            frames: self.frames.clone(),
        }
    }
}

/// Load a configuration and a script, replay it and report the result.
pub fn replay(config: &Path, script: &Path) -> ScriptResult<Report> {
    let config = DraglineConfig::load(config)?;
    let script = Script::load(script)?;
    log::info!("Replaying {} events", script.events.len());

    let mut session = Session::new(&config, script.scene)?;
    session.run(&script.events)?;
    Ok(session.report())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DVec3;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"{
        "tools": ["move", "rotate", "measure"],
        "exclusive_groups": [["move", "rotate"]],
        "suppressions": [{ "primary": "measure", "suppressed": ["move", "rotate"] }],
        "grid": { "size": 10.0 }
    }"#;

    fn session(handles: Vec<DVec3>) -> Session {
        let config = DraglineConfig::from_json(CONFIG).unwrap();
        Session::new(&config, Scene::new(handles)).unwrap()
    }

    fn events(json: &str) -> Vec<ScriptEvent> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_events() {
        let parsed = events(
            r#"[
                { "event": "activate", "tool": "move" },
                { "event": "down", "x": 1.0, "y": 2.0 },
                { "event": "up", "x": 1.0, "y": 2.0, "button": "right" },
                { "event": "modifiers", "shift": true },
                { "event": "cancel" }
            ]"#,
        );
        assert_eq!(parsed[1], ScriptEvent::Down {
            x: 1.0,
            y: 2.0,
            button: MouseButton::Left,
        });
        assert_eq!(parsed[2], ScriptEvent::Up {
            x: 1.0,
            y: 2.0,
            button: MouseButton::Right,
        });
        assert_eq!(parsed[3], ScriptEvent::Modifiers {
            shift: true,
            ctrl: false,
            alt: false,
            meta: false,
        });
        assert_eq!(parsed[4], ScriptEvent::Cancel);
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let err = Script::from_json(r#"{ "events": [{ "event": "teleport" }] }"#).unwrap_err();
        assert!(matches!(err, ScriptError::Serialization(_)));
    }

    #[test]
    fn test_replay_move_drag() {
        let mut session = session(vec![DVec3::ZERO]);
        session
            .run(&events(
                r#"[
                    { "event": "activate", "tool": "move" },
                    { "event": "down", "x": 0.0, "y": 0.0 },
                    { "event": "move", "x": 12.0, "y": 0.0 },
                    { "event": "wait", "ms": 200 },
                    { "event": "move", "x": 31.0, "y": 9.0 },
                    { "event": "up", "x": 31.0, "y": 9.0 }
                ]"#,
            ))
            .unwrap();

        assert_eq!(session.scene().handles, vec![DVec3::new(30.0, 10.0, 0.0)]);
        assert!(!session.connector().tool_box().dragging());
        assert_eq!(session.clock_ms(), 4 * FRAME_MS + 200);
    }

    #[test]
    fn test_quick_drag_is_cancelled() {
        let mut session = session(vec![DVec3::ZERO]);
        session
            .run(&events(
                r#"[
                    { "event": "activate", "tool": "move" },
                    { "event": "down", "x": 0.0, "y": 0.0 },
                    { "event": "move", "x": 20.0, "y": 0.0 },
                    { "event": "up", "x": 20.0, "y": 0.0 }
                ]"#,
            ))
            .unwrap();

        assert_eq!(session.scene().handles, vec![DVec3::ZERO]);
    }

    #[test]
    fn test_suppressing_tool_blocks_drag() {
        let mut session = session(vec![DVec3::ZERO]);
        session
            .run(&events(
                r#"[
                    { "event": "activate", "tool": "move" },
                    { "event": "activate", "tool": "measure" },
                    { "event": "activate", "tool": "move" },
                    { "event": "down", "x": 0.0, "y": 0.0 },
                    { "event": "move", "x": 20.0, "y": 0.0 }
                ]"#,
            ))
            .unwrap();
        assert!(!session.connector().tool_box().dragging());

        session.apply(&ScriptEvent::Cancel).unwrap();
        let report = session.report();
        assert_eq!(report.active_tools, vec!["move"]);
        assert_eq!(report.tool_events, vec![
            "activated move",
            "activated measure",
            "deactivated move",
            "deactivated measure",
            "activated move",
        ]);
    }

    #[test]
    fn test_gesture_rotation_in_degrees() {
        let mut session = session(vec![DVec3::new(10.0, 0.0, 0.0)]);
        session
            .run(&events(
                r#"[
                    { "event": "activate", "tool": "rotate" },
                    { "event": "gesture_start" },
                    { "event": "gesture_rotate", "degrees": 90.0 },
                    { "event": "gesture_end" }
                ]"#,
            ))
            .unwrap();

        let scene = session.scene();
        assert_relative_eq!(scene.handles[0].y, 10.0, epsilon = 1e-9);
        assert!(!session.connector().tool_box().gesture_in_progress());
    }

    #[test]
    fn test_mouse_drag_during_gesture_is_ignored() {
        let mut session = session(vec![DVec3::new(10.0, 0.0, 0.0)]);
        session
            .run(&events(
                r#"[
                    { "event": "activate", "tool": "rotate" },
                    { "event": "gesture_start" },
                    { "event": "down", "x": 20.0, "y": 0.0 },
                    { "event": "move", "x": 0.0, "y": 20.0 }
                ]"#,
            ))
            .unwrap();

        let tool_box = session.connector().tool_box();
        assert!(tool_box.gesture_in_progress());
        assert!(!tool_box.dragging());
        assert_eq!(session.scene().rotation, 0.0);
    }

    #[test]
    fn test_gesture_during_mouse_drag_is_ignored() {
        let mut session = session(vec![DVec3::new(10.0, 0.0, 0.0)]);
        session
            .run(&events(
                r#"[
                    { "event": "activate", "tool": "rotate" },
                    { "event": "down", "x": 20.0, "y": 0.0 },
                    { "event": "move", "x": 0.0, "y": 20.0 },
                    { "event": "gesture_start" },
                    { "event": "gesture_rotate", "degrees": 45.0 },
                    { "event": "gesture_end" }
                ]"#,
            ))
            .unwrap();

        let tool_box = session.connector().tool_box();
        assert!(tool_box.dragging());
        assert!(!tool_box.gesture_in_progress());
        assert_relative_eq!(session.scene().rotation, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_repeated_drag_enter_adds_one_handle() {
        let mut session = session(Vec::new());
        session
            .run(&events(
                r#"[
                    { "event": "activate", "tool": "move" },
                    { "event": "drag_enter", "x": 41.0, "y": 2.0, "payload": "handle" },
                    { "event": "drag_enter", "x": 41.0, "y": 2.0, "payload": "handle" },
                    { "event": "drop", "x": 41.0, "y": 2.0 }
                ]"#,
            ))
            .unwrap();

        assert_eq!(session.scene().handles, vec![DVec3::new(40.0, 0.0, 0.0)]);
        assert!(!session.connector().tool_box().drop_in_progress());
    }

    #[test]
    fn test_render_frames_are_recorded() {
        let mut session = session(vec![DVec3::ZERO]);
        session
            .run(&events(
                r#"[
                    { "event": "render" },
                    { "event": "activate", "tool": "move" },
                    { "event": "render" }
                ]"#,
            ))
            .unwrap();

        let frames = session.frames();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].primitives.is_empty());
        assert_eq!(frames[1].primitives.len(), 1);
        assert!(!frames[1].options.show_grid);
    }

    #[test]
    fn test_unknown_tool() {
        let mut session = session(Vec::new());
        let err = session
            .apply(&ScriptEvent::Activate {
                tool: "lasso".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ScriptError::UnknownTool(name) if name == "lasso"));
    }

    #[test]
    fn test_deactivate_inactive_tool() {
        let mut session = session(Vec::new());
        let err = session
            .apply(&ScriptEvent::Deactivate {
                tool: "move".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ScriptError::InactiveTool(_)));
    }

    #[test]
    fn test_replay_from_files() {
        let mut config = NamedTempFile::new().unwrap();
        config.write_all(CONFIG.as_bytes()).unwrap();
        let mut script = NamedTempFile::new().unwrap();
        script
            .write_all(
                br#"{
                    "scene": { "handles": [[0.0, 0.0, 0.0]] },
                    "events": [
                        { "event": "activate", "tool": "move" },
                        { "event": "drag_enter", "x": 41.0, "y": 2.0, "payload": "handle" },
                        { "event": "drop", "x": 41.0, "y": 2.0 }
                    ]
                }"#,
            )
            .unwrap();

        let report = replay(config.path(), script.path()).unwrap();
        assert_eq!(report.scene.handles, vec![DVec3::ZERO, DVec3::new(40.0, 0.0, 0.0)]);
        assert_eq!(report.active_tools, vec!["move"]);
        assert!(report.tool_events.contains(&"refresh move".to_string()));
    }

    #[test]
    fn test_demo_script() {
        let config = DraglineConfig::from_json(include_str!("../../../demos/config.json")).unwrap();
        let script = Script::from_json(include_str!("../../../demos/move_and_rotate.json")).unwrap();

        let mut session = Session::new(&config, script.scene).unwrap();
        session.run(&script.events).unwrap();

        let report = session.report();
        assert_eq!(report.scene.handles.len(), 4);
        assert_eq!(report.active_tools, vec!["rotate"]);
        assert_eq!(report.frames.len(), 3);
        assert!(report.frames[0].options.show_grid);
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = replay(&dir.path().join("config.json"), &dir.path().join("script.json")).unwrap_err();
        assert!(matches!(err, ScriptError::Config(ConfigError::Io(_))));
    }
}
