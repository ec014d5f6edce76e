//! Translation of raw view events into tool box calls.

use crate::chain::ToolChain;
use crate::controller::{RenderBatch, RenderContext, ToolController};
use crate::input::{InputState, Modifiers, MouseButton};
use crate::math::Ray3;
use crate::pick::PickResult;
use crate::toolbox::ToolBox;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Scene picking, provided by the embedding view.
pub trait Picker {
    /// World-space ray through a view position.
    fn pick_ray(&self, position: Point) -> Ray3;

    /// Everything the ray hits, in any order.
    fn pick(&self, ray: &Ray3) -> PickResult;
}

/// Click versus drag discrimination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    /// Max pointer travel per axis (pixels) for a release to count as a click.
    pub click_distance: f64,
    /// Pointer travel per axis (pixels) beyond which a held button starts a drag.
    pub drag_threshold: f64,
    /// A drag released within this many milliseconds counts as a click.
    pub quick_click_ms: u64,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            click_distance: 1.0,
            drag_threshold: 1.0,
            quick_click_ms: 100,
        }
    }
}

/// Connects one view to a tool box.
///
/// Owns the view's input state and tool chain, keeps the pick result up to
/// date and decides whether a press ends as a click or a drag.
pub struct ViewConnector<P> {
    tool_box: ToolBox,
    chain: ToolChain,
    input: InputState,
    picker: P,
    settings: ConnectorSettings,
    click_position: Point,
    click_time_ms: u64,
    /// Set once a press started (or ended) a drag; cleared on button events.
    ignore_next_drag: bool,
    window_deactivated: bool,
}

impl<P: Picker> ViewConnector<P> {
    pub fn new(tool_box: ToolBox, chain: ToolChain, picker: P, settings: ConnectorSettings) -> Self {
        Self {
            tool_box,
            chain,
            input: InputState::new(),
            picker,
            settings,
            click_position: Point::ZERO,
            click_time_ms: 0,
            ignore_next_drag: false,
            window_deactivated: false,
        }
    }

    pub fn tool_box(&self) -> &ToolBox {
        &self.tool_box
    }

    pub fn tool_box_mut(&mut self) -> &mut ToolBox {
        &mut self.tool_box
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    pub fn add_controller(&mut self, controller: impl ToolController + 'static) {
        self.chain.append(controller);
    }

    fn update_pick_result(&mut self) {
        let ray = self.picker.pick_ray(self.input.pointer_position());
        self.input.set_pick_ray(ray);
        let mut result = self.picker.pick(&ray);
        self.tool_box.pick(&mut self.chain, &self.input, &mut result);
        self.input.set_pick_result(result);
    }

    fn move_pointer(&mut self, position: Point) {
        self.input.mouse_move(position);
        self.update_pick_result();
    }

    fn within(&self, position: Point, distance: f64) -> bool {
        (position.x - self.click_position.x).abs() <= distance
            && (position.y - self.click_position.y).abs() <= distance
    }

    /// Send one drag update; ends the drag if the tracker asks to stop.
    fn drag_update(&mut self) {
        if !self.tool_box.mouse_drag(&self.input) {
            self.tool_box.end_mouse_drag(&self.input);
            self.input.set_any_tool_dragging(false);
            self.ignore_next_drag = true;
        }
    }

    // --- Keyboard ---

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        if self.input.set_modifiers(modifiers) {
            self.update_pick_result();
            self.tool_box.modifier_key_change(&mut self.chain, &self.input);
        }
    }

    // --- Mouse ---

    pub fn mouse_button_down(&mut self, button: MouseButton, position: Point, time_ms: u64) {
        if self.tool_box.ignore_next_click() && button == MouseButton::Left {
            log::debug!("Ignoring focus click");
            return;
        }

        if position != self.input.pointer_position() {
            self.move_pointer(position);
        }
        self.click_time_ms = time_ms;
        self.click_position = position;
        self.input.mouse_down(button);
        self.tool_box.mouse_down(&mut self.chain, &self.input, button);

        self.update_pick_result();
        self.ignore_next_drag = false;
    }

    pub fn mouse_button_up(&mut self, button: MouseButton, position: Point, time_ms: u64) {
        if self.tool_box.ignore_next_click() && button == MouseButton::Left {
            self.tool_box.clear_ignore_next_click();
            return;
        }
        self.tool_box.clear_ignore_next_click();

        if self.tool_box.dragging() {
            let held = time_ms.saturating_sub(self.click_time_ms);
            if held <= self.settings.quick_click_ms {
                log::debug!("Drag released after {held} ms, treating as click");
                self.tool_box.cancel_mouse_drag();
                self.tool_box.mouse_up(&mut self.chain, &self.input, button);
                self.tool_box.mouse_click(&mut self.chain, &self.input);
            } else {
                self.tool_box.end_mouse_drag(&self.input);
                self.tool_box.mouse_up(&mut self.chain, &self.input, button);
            }
            self.input.mouse_up(button);
            self.input.set_any_tool_dragging(false);
        } else if !self.ignore_next_drag {
            self.tool_box.mouse_up(&mut self.chain, &self.input, button);
            if self.within(position, self.settings.click_distance) {
                self.tool_box.mouse_click(&mut self.chain, &self.input);
            }
            self.input.mouse_up(button);
        } else {
            self.tool_box.mouse_up(&mut self.chain, &self.input, button);
            self.input.mouse_up(button);
        }

        self.update_pick_result();
        self.ignore_next_drag = false;
    }

    pub fn mouse_double_click(&mut self, button: MouseButton, position: Point) {
        self.click_position = position;
        if position != self.input.pointer_position() {
            self.move_pointer(position);
        }
        self.input.mouse_down(button);
        self.tool_box.mouse_double_click(&mut self.chain, &self.input);
        self.input.mouse_up(button);
        self.update_pick_result();
    }

    /// While a gesture is in progress the pointer is tracked but no drag
    /// starts.
    pub fn mouse_motion(&mut self, position: Point) {
        if self.tool_box.dragging() {
            self.move_pointer(position);
            self.drag_update();
        } else if self.tool_box.gesture_in_progress() {
            self.move_pointer(position);
        } else if !self.ignore_next_drag {
            if self.input.any_button_pressed() {
                if !self.within(position, self.settings.drag_threshold) {
                    // The drag starts from the press position; the pointer
                    // catches up with one update right after.
                    let started = self.tool_box.start_mouse_drag(&mut self.chain, &self.input);
                    if started {
                        self.ignore_next_drag = true;
                    }
                    self.move_pointer(position);
                    if started {
                        self.input.set_any_tool_dragging(true);
                        self.drag_update();
                    }
                }
            } else {
                self.move_pointer(position);
                self.tool_box.mouse_move(&mut self.chain, &self.input);
            }
        }
    }

    pub fn mouse_wheel(&mut self, delta: Vec2) {
        self.input.scroll(delta);
        self.tool_box.mouse_scroll(&mut self.chain, &self.input);
        self.update_pick_result();
    }

    // --- Focus ---

    pub fn capture_lost(&mut self) {
        self.cancel_drag();
    }

    pub fn focus_lost(&mut self) {
        self.cancel_drag();
    }

    /// The window lost activation; the click that re-activates it is ignored.
    pub fn window_deactivated(&mut self) {
        self.cancel_drag();
        self.window_deactivated = true;
    }

    pub fn focus_gained(&mut self) {
        if std::mem::take(&mut self.window_deactivated) {
            self.tool_box.set_ignore_next_click();
        }
    }

    fn cancel_drag(&mut self) {
        if self.tool_box.dragging() {
            self.tool_box.cancel_mouse_drag();
            self.input.set_any_tool_dragging(false);
            self.input.clear_mouse_buttons();
        }
    }

    /// Escape key.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.tool_box.cancel(&mut self.chain);
        self.input.set_any_tool_dragging(false);
        cancelled
    }

    // --- Drag and drop ---

    /// A payload entering again without a leave in between replaces the
    /// stale drop.
    pub fn drag_enter(&mut self, position: Point, payload: &str) -> bool {
        self.move_pointer(position);
        if self.tool_box.drop_in_progress() {
            log::debug!("Payload re-entered the view, leaving the previous drop");
            self.tool_box.drag_leave(&self.input);
        }
        self.tool_box.drag_enter(&mut self.chain, &self.input, payload)
    }

    pub fn drag_move(&mut self, position: Point) -> bool {
        self.move_pointer(position);
        self.tool_box.drag_move(&self.input)
    }

    pub fn drag_leave(&mut self) {
        self.tool_box.drag_leave(&self.input);
    }

    pub fn drag_drop(&mut self, position: Point) -> bool {
        self.move_pointer(position);
        self.tool_box.drag_drop(&self.input)
    }

    // --- Gestures ---

    /// Ignored while a mouse drag or another gesture is in progress.
    pub fn gesture_start(&mut self) -> bool {
        if self.tool_box.dragging() || self.tool_box.gesture_in_progress() {
            log::debug!("Ignoring gesture start: an interaction is in progress");
            return false;
        }
        self.input.start_gesture();
        self.tool_box.start_gesture(&mut self.chain, &self.input)
    }

    pub fn gesture_pan(&mut self, pan: Vec2) {
        self.input.gesture_pan(pan);
        self.tool_box.gesture_update(&self.input);
    }

    pub fn gesture_zoom(&mut self, zoom: f64) {
        self.input.gesture_zoom(zoom);
        self.tool_box.gesture_update(&self.input);
    }

    pub fn gesture_rotate(&mut self, rotation: f64) {
        self.input.gesture_rotate(rotation);
        self.tool_box.gesture_update(&self.input);
    }

    pub fn gesture_end(&mut self) {
        self.tool_box.end_gesture(&self.input);
    }

    // --- Rendering ---

    pub fn set_render_options(&mut self, render: &mut dyn RenderContext) {
        self.tool_box.set_render_options(&mut self.chain, &self.input, render);
    }

    pub fn render(&mut self, render: &mut dyn RenderContext, batch: &mut dyn RenderBatch) {
        self.tool_box.render(&mut self.chain, &self.input, render, batch);
    }
}
