//! Input state shared by every tool during one dispatch.

use crate::math::Ray3;
use crate::pick::PickResult;
use glam::DVec3;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };

    /// Whether every key held in `other` is also held in `self`.
    pub fn contains(self, other: Modifiers) -> bool {
        (!other.shift || self.shift)
            && (!other.ctrl || self.ctrl)
            && (!other.alt || self.alt)
            && (!other.meta || self.meta)
    }

    pub fn is_empty(self) -> bool {
        self == Modifiers::NONE
    }
}

/// Accumulated values of the current touchpad/touch gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureState {
    /// Pan offset in screen pixels since the gesture started.
    pub pan: Vec2,
    /// Zoom factor relative to the start of the gesture.
    pub zoom: f64,
    /// Rotation in radians since the gesture started.
    pub rotation: f64,
}

/// Pointer, keyboard and pick state for the event currently being dispatched.
///
/// The embedding view (or [`crate::ViewConnector`]) updates this between
/// events; tools only ever see it through a shared reference.
#[derive(Debug, Clone)]
pub struct InputState {
    /// Pointer position in view coordinates.
    pointer_position: Point,
    /// Pointer movement of the last move event.
    pointer_delta: Vec2,
    /// Currently pressed mouse buttons.
    pressed_buttons: HashSet<MouseButton>,
    /// Current modifier keys state.
    modifiers: Modifiers,
    /// Scroll delta of the last scroll event.
    scroll_delta: Vec2,
    gesture: GestureState,
    /// World-space ray through the pointer position.
    pick_ray: Ray3,
    pick_result: PickResult,
    /// Set while a tool owns a mouse drag.
    any_tool_dragging: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            pointer_position: Point::ZERO,
            pointer_delta: Vec2::ZERO,
            pressed_buttons: HashSet::new(),
            modifiers: Modifiers::default(),
            scroll_delta: Vec2::ZERO,
            gesture: GestureState::default(),
            pick_ray: Ray3::new(DVec3::ZERO, DVec3::NEG_Z),
            pick_result: PickResult::new(),
            any_tool_dragging: false,
        }
    }
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input state with the given pick ray, e.g. for tests and
    /// synthetic events.
    pub fn with_pick_ray(ray: Ray3) -> Self {
        Self {
            pick_ray: ray,
            ..Self::default()
        }
    }

    pub fn pointer_position(&self) -> Point {
        self.pointer_position
    }

    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_delta
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }

    pub fn gesture(&self) -> GestureState {
        self.gesture
    }

    pub fn pick_ray(&self) -> &Ray3 {
        &self.pick_ray
    }

    pub fn pick_result(&self) -> &PickResult {
        &self.pick_result
    }

    pub fn any_tool_dragging(&self) -> bool {
        self.any_tool_dragging
    }

    /// Check if a button is currently pressed.
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Whether exactly `button` and no other button is pressed.
    pub fn is_only_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.len() == 1 && self.is_button_pressed(button)
    }

    pub fn any_button_pressed(&self) -> bool {
        !self.pressed_buttons.is_empty()
    }

    /// Whether exactly the given modifier keys are held.
    pub fn modifiers_pressed(&self, modifiers: Modifiers) -> bool {
        self.modifiers == modifiers
    }

    /// Whether at least the given modifier keys are held.
    pub fn modifiers_down(&self, modifiers: Modifiers) -> bool {
        self.modifiers.contains(modifiers)
    }

    pub fn mouse_down(&mut self, button: MouseButton) {
        self.pressed_buttons.insert(button);
    }

    pub fn mouse_up(&mut self, button: MouseButton) {
        self.pressed_buttons.remove(&button);
    }

    pub fn clear_mouse_buttons(&mut self) {
        self.pressed_buttons.clear();
    }

    /// Move the pointer, recording the delta from the previous position.
    pub fn mouse_move(&mut self, position: Point) {
        self.pointer_delta = position - self.pointer_position;
        self.pointer_position = position;
    }

    pub fn scroll(&mut self, delta: Vec2) {
        self.scroll_delta = delta;
    }

    /// Update modifier keys state. Returns whether anything changed.
    pub fn set_modifiers(&mut self, modifiers: Modifiers) -> bool {
        let changed = self.modifiers != modifiers;
        self.modifiers = modifiers;
        changed
    }

    pub fn start_gesture(&mut self) {
        self.gesture = GestureState {
            zoom: 1.0,
            ..GestureState::default()
        };
    }

    pub fn gesture_pan(&mut self, pan: Vec2) {
        self.gesture.pan = pan;
    }

    pub fn gesture_zoom(&mut self, zoom: f64) {
        self.gesture.zoom = zoom;
    }

    pub fn gesture_rotate(&mut self, rotation: f64) {
        self.gesture.rotation = rotation;
    }

    pub fn set_pick_ray(&mut self, ray: Ray3) {
        self.pick_ray = ray;
    }

    pub fn set_pick_result(&mut self, result: PickResult) {
        self.pick_result = result;
    }

    pub fn set_any_tool_dragging(&mut self, dragging: bool) {
        self.any_tool_dragging = dragging;
    }
}
