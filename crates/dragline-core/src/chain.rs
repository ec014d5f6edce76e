//! Ordered dispatch of events to tool controllers.

use crate::controller::{DropTracker, GestureTracker, RenderBatch, RenderContext, ToolController};
use crate::input::{InputState, MouseButton};
use crate::pick::PickResult;
use crate::tool::{ToolContext, ToolId};

/// Controllers in registration order.
///
/// Registration order is priority order: for the claim operations
/// (`mouse_click`, `mouse_double_click`, `accept_mouse_drag`,
/// `accept_gesture`, `drag_enter`) the first active controller that answers
/// wins and no later controller is consulted. Every other event reaches all
/// active controllers. Controllers whose tool is inactive are skipped.
#[derive(Default)]
pub struct ToolChain {
    controllers: Vec<Box<dyn ToolController>>,
}

impl std::fmt::Debug for ToolChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolChain")
            .field("tools", &self.controllers.iter().map(|c| c.tool()).collect::<Vec<_>>())
            .finish()
    }
}

impl ToolChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a controller with the lowest priority so far.
    pub fn append(&mut self, controller: impl ToolController + 'static) {
        self.append_boxed(Box::new(controller));
    }

    pub fn append_boxed(&mut self, controller: Box<dyn ToolController>) {
        log::debug!("Appending controller for {} at position {}", controller.tool(), self.controllers.len());
        self.controllers.push(controller);
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Controllers whose tool is active, in priority order.
    fn active<'c>(
        &'c mut self,
        ctx: &ToolContext<'_>,
    ) -> impl Iterator<Item = &'c mut Box<dyn ToolController>> + use<'c> {
        let active: Vec<bool> = self.controllers.iter().map(|c| ctx.is_active(c.tool())).collect();
        self.controllers
            .iter_mut()
            .zip(active)
            .filter_map(|(controller, active)| active.then_some(controller))
    }

    pub fn pick(&mut self, ctx: &mut ToolContext<'_>, input: &InputState, result: &mut PickResult) {
        for controller in self.active(ctx) {
            if let Some(picking) = controller.picking() {
                picking.pick(ctx, input, result);
            }
        }
    }

    pub fn modifier_key_change(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        for controller in self.active(ctx) {
            if let Some(keys) = controller.keys() {
                keys.modifier_key_change(ctx, input);
            }
        }
    }

    pub fn mouse_down(&mut self, ctx: &mut ToolContext<'_>, input: &InputState, button: MouseButton) {
        for controller in self.active(ctx) {
            if let Some(mouse) = controller.mouse() {
                mouse.mouse_down(ctx, input, button);
            }
        }
    }

    pub fn mouse_up(&mut self, ctx: &mut ToolContext<'_>, input: &InputState, button: MouseButton) {
        for controller in self.active(ctx) {
            if let Some(mouse) = controller.mouse() {
                mouse.mouse_up(ctx, input, button);
            }
        }
    }

    /// Returns the tool that claimed the click.
    pub fn mouse_click(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> Option<ToolId> {
        for controller in self.active(ctx) {
            let tool = controller.tool();
            if let Some(mouse) = controller.mouse() {
                if mouse.mouse_click(ctx, input) {
                    log::debug!("Click claimed by {tool}");
                    return Some(tool);
                }
            }
        }
        None
    }

    /// Returns the tool that claimed the double click.
    pub fn mouse_double_click(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> Option<ToolId> {
        for controller in self.active(ctx) {
            let tool = controller.tool();
            if let Some(mouse) = controller.mouse() {
                if mouse.mouse_double_click(ctx, input) {
                    log::debug!("Double click claimed by {tool}");
                    return Some(tool);
                }
            }
        }
        None
    }

    pub fn mouse_move(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        for controller in self.active(ctx) {
            if let Some(mouse) = controller.mouse() {
                mouse.mouse_move(ctx, input);
            }
        }
    }

    pub fn mouse_scroll(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        for controller in self.active(ctx) {
            if let Some(mouse) = controller.mouse() {
                mouse.mouse_scroll(ctx, input);
            }
        }
    }

    pub fn accept_mouse_drag(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
    ) -> Option<(ToolId, Box<dyn GestureTracker>)> {
        for controller in self.active(ctx) {
            let tool = controller.tool();
            if let Some(tracker) = controller.drag().and_then(|drag| drag.accept_mouse_drag(ctx, input)) {
                log::debug!("Mouse drag claimed by {tool}");
                return Some((tool, tracker));
            }
        }
        None
    }

    pub fn accept_gesture(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
    ) -> Option<(ToolId, Box<dyn GestureTracker>)> {
        for controller in self.active(ctx) {
            let tool = controller.tool();
            if let Some(tracker) = controller.drag().and_then(|drag| drag.accept_gesture(ctx, input)) {
                log::debug!("Gesture claimed by {tool}");
                return Some((tool, tracker));
            }
        }
        None
    }

    /// Whether any active controller could take `payload`.
    pub fn should_accept_drop(&mut self, ctx: &mut ToolContext<'_>, input: &InputState, payload: &str) -> bool {
        let mut accept = false;
        for controller in self.active(ctx) {
            if let Some(target) = controller.drop_target() {
                accept |= target.should_accept_drop(ctx, input, payload);
            }
        }
        accept
    }

    pub fn drag_enter(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        payload: &str,
    ) -> Option<(ToolId, Box<dyn DropTracker>)> {
        for controller in self.active(ctx) {
            let tool = controller.tool();
            if let Some(tracker) = controller
                .drop_target()
                .and_then(|target| target.drag_enter(ctx, input, payload))
            {
                log::debug!("Drop claimed by {tool}");
                return Some((tool, tracker));
            }
        }
        None
    }

    pub fn set_render_options(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        render: &mut dyn RenderContext,
    ) {
        for controller in self.active(ctx) {
            if let Some(policy) = controller.render() {
                policy.set_render_options(ctx, input, render);
            }
        }
    }

    pub fn render(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        render: &mut dyn RenderContext,
        batch: &mut dyn RenderBatch,
    ) {
        for controller in self.active(ctx) {
            if let Some(policy) = controller.render() {
                policy.render(ctx, input, render, batch);
            }
        }
    }

    /// Stops at the first controller that consumes the cancellation.
    pub fn cancel(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        for controller in self.active(ctx) {
            if controller.cancel(ctx) {
                log::debug!("Cancel consumed by {}", controller.tool());
                return true;
            }
        }
        false
    }
}
