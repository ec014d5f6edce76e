//! Tool controllers: the event-handling side of a tool.
//!
//! A controller reports the tool it belongs to and exposes any subset of the
//! callback families below. Every family has no-op defaults, so a controller
//! only implements what it needs and returns `Some(self)` from the matching
//! accessor.

use crate::chain::ToolChain;
use crate::input::{InputState, MouseButton};
use crate::pick::PickResult;
use crate::tool::{ToolContext, ToolId};
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// Renderer state handed to tools. Opaque to this crate.
pub trait RenderContext: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> RenderContext for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn RenderContext {
    /// Recover the concrete renderer type, if it is `T`.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// Collection of render commands produced by tools. Opaque to this crate.
pub trait RenderBatch: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> RenderBatch for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn RenderBatch {
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// Receiver of a claimed mouse drag or touch gesture.
///
/// The tool box owns the tracker from the moment it is claimed until the
/// interaction ends or is cancelled.
pub trait GestureTracker {
    fn modifier_key_change(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) {}

    fn mouse_scroll(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) {}

    /// Pointer moved or gesture values changed. Returning `false` ends the
    /// interaction.
    fn update(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> bool;

    fn end(&mut self, ctx: &mut ToolContext<'_>, input: &InputState);

    fn cancel(&mut self, ctx: &mut ToolContext<'_>);

    fn set_render_options(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _render: &mut dyn RenderContext,
    ) {
    }

    fn render(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _render: &mut dyn RenderContext,
        _batch: &mut dyn RenderBatch,
    ) {
    }
}

/// Receiver of a claimed drag-and-drop operation.
pub trait DropTracker {
    /// Returns whether a drop at the current position would be accepted.
    fn drag_move(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> bool;

    fn leave(&mut self, ctx: &mut ToolContext<'_>, input: &InputState);

    /// Returns whether the payload was consumed.
    fn drag_drop(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> bool;
}

pub trait PickingPolicy {
    /// Contribute hits (for example tool handles) to the pick result.
    fn pick(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _result: &mut PickResult) {}
}

pub trait KeyPolicy {
    fn modifier_key_change(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) {}
}

pub trait MousePolicy {
    fn mouse_down(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _button: MouseButton) {}

    fn mouse_up(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _button: MouseButton) {}

    /// Returns `true` to claim the click.
    fn mouse_click(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) -> bool {
        false
    }

    /// Returns `true` to claim the double click.
    fn mouse_double_click(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) -> bool {
        false
    }

    fn mouse_move(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) {}

    fn mouse_scroll(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) {}
}

pub trait DragPolicy {
    fn accept_mouse_drag(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
    ) -> Option<Box<dyn GestureTracker>> {
        None
    }

    fn accept_gesture(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
    ) -> Option<Box<dyn GestureTracker>> {
        None
    }
}

pub trait RenderPolicy {
    fn set_render_options(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _render: &mut dyn RenderContext,
    ) {
    }

    fn render(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _render: &mut dyn RenderContext,
        _batch: &mut dyn RenderBatch,
    ) {
    }
}

pub trait DropPolicy {
    fn should_accept_drop(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _payload: &str) -> bool {
        false
    }

    fn drag_enter(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _payload: &str,
    ) -> Option<Box<dyn DropTracker>> {
        None
    }
}

/// Event handler backing one tool.
///
/// The chain only calls into a controller while its tool is active.
pub trait ToolController {
    fn tool(&self) -> ToolId;

    fn picking(&mut self) -> Option<&mut dyn PickingPolicy> {
        None
    }

    fn keys(&mut self) -> Option<&mut dyn KeyPolicy> {
        None
    }

    fn mouse(&mut self) -> Option<&mut dyn MousePolicy> {
        None
    }

    fn drag(&mut self) -> Option<&mut dyn DragPolicy> {
        None
    }

    fn render(&mut self) -> Option<&mut dyn RenderPolicy> {
        None
    }

    fn drop_target(&mut self) -> Option<&mut dyn DropPolicy> {
        None
    }

    /// Unwind an in-progress interaction. Returns `true` if consumed.
    fn cancel(&mut self, _ctx: &mut ToolContext<'_>) -> bool {
        false
    }
}

/// Decisions a [`ToolControllerGroup`] makes before its children are asked,
/// and observers of the mouse drags its children claim.
pub trait GroupHooks {
    fn should_handle_mouse_drag(&mut self, _ctx: &ToolContext<'_>, _input: &InputState) -> bool {
        true
    }

    fn should_handle_gesture(&mut self, _ctx: &ToolContext<'_>, _input: &InputState) -> bool {
        true
    }

    fn should_accept_drop(&mut self, _ctx: &ToolContext<'_>, _input: &InputState, _payload: &str) -> bool {
        true
    }

    /// Called after `child` claimed a mouse drag. The claim stands.
    fn mouse_drag_started(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _child: ToolId) {}

    /// Called after each drag update the child's tracker accepted.
    fn mouse_dragged(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _child: ToolId) {}

    fn mouse_drag_ended(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _child: ToolId) {}

    fn mouse_drag_cancelled(&mut self, _ctx: &mut ToolContext<'_>, _child: ToolId) {}
}

impl GroupHooks for () {}

/// A controller made of other controllers.
///
/// Every event is forwarded to a private chain, so the parent chain sees a
/// single controller regardless of nesting depth.
pub struct ToolControllerGroup<H = ()> {
    tool: ToolId,
    chain: ToolChain,
    /// Shared with the trackers of drags a child claimed.
    hooks: Rc<RefCell<H>>,
}

impl ToolControllerGroup<()> {
    pub fn new(tool: ToolId) -> Self {
        Self::with_hooks(tool, ())
    }
}

impl<H: GroupHooks + 'static> ToolControllerGroup<H> {
    pub fn with_hooks(tool: ToolId, hooks: H) -> Self {
        Self {
            tool,
            chain: ToolChain::new(),
            hooks: Rc::new(RefCell::new(hooks)),
        }
    }

    pub fn add_controller(&mut self, controller: impl ToolController + 'static) {
        self.chain.append(controller);
    }

    pub fn hooks(&self) -> Ref<'_, H> {
        self.hooks.borrow()
    }

    pub fn hooks_mut(&mut self) -> RefMut<'_, H> {
        self.hooks.borrow_mut()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl<H: GroupHooks + 'static> ToolController for ToolControllerGroup<H> {
    fn tool(&self) -> ToolId {
        self.tool
    }

    fn picking(&mut self) -> Option<&mut dyn PickingPolicy> {
        Some(self)
    }

    fn keys(&mut self) -> Option<&mut dyn KeyPolicy> {
        Some(self)
    }

    fn mouse(&mut self) -> Option<&mut dyn MousePolicy> {
        Some(self)
    }

    fn drag(&mut self) -> Option<&mut dyn DragPolicy> {
        Some(self)
    }

    fn render(&mut self) -> Option<&mut dyn RenderPolicy> {
        Some(self)
    }

    fn drop_target(&mut self) -> Option<&mut dyn DropPolicy> {
        Some(self)
    }

    fn cancel(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        self.chain.cancel(ctx)
    }
}

impl<H: GroupHooks + 'static> PickingPolicy for ToolControllerGroup<H> {
    fn pick(&mut self, ctx: &mut ToolContext<'_>, input: &InputState, result: &mut PickResult) {
        self.chain.pick(ctx, input, result);
    }
}

impl<H: GroupHooks + 'static> KeyPolicy for ToolControllerGroup<H> {
    fn modifier_key_change(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        self.chain.modifier_key_change(ctx, input);
    }
}

impl<H: GroupHooks + 'static> MousePolicy for ToolControllerGroup<H> {
    fn mouse_down(&mut self, ctx: &mut ToolContext<'_>, input: &InputState, button: MouseButton) {
        self.chain.mouse_down(ctx, input, button);
    }

    fn mouse_up(&mut self, ctx: &mut ToolContext<'_>, input: &InputState, button: MouseButton) {
        self.chain.mouse_up(ctx, input, button);
    }

    fn mouse_click(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> bool {
        self.chain.mouse_click(ctx, input).is_some()
    }

    fn mouse_double_click(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> bool {
        self.chain.mouse_double_click(ctx, input).is_some()
    }

    fn mouse_move(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        self.chain.mouse_move(ctx, input);
    }

    fn mouse_scroll(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        self.chain.mouse_scroll(ctx, input);
    }
}

impl<H: GroupHooks + 'static> DragPolicy for ToolControllerGroup<H> {
    fn accept_mouse_drag(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
    ) -> Option<Box<dyn GestureTracker>> {
        if !self.hooks.borrow_mut().should_handle_mouse_drag(ctx, input) {
            return None;
        }
        let (child, tracker) = self.chain.accept_mouse_drag(ctx, input)?;
        self.hooks.borrow_mut().mouse_drag_started(ctx, input, child);
        Some(Box::new(GroupDragTracker {
            child,
            tracker,
            hooks: Rc::clone(&self.hooks),
        }))
    }

    fn accept_gesture(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
    ) -> Option<Box<dyn GestureTracker>> {
        if !self.hooks.borrow_mut().should_handle_gesture(ctx, input) {
            return None;
        }
        self.chain.accept_gesture(ctx, input).map(|(_, tracker)| tracker)
    }
}

impl<H: GroupHooks + 'static> RenderPolicy for ToolControllerGroup<H> {
    fn set_render_options(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        render: &mut dyn RenderContext,
    ) {
        self.chain.set_render_options(ctx, input, render);
    }

    fn render(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        render: &mut dyn RenderContext,
        batch: &mut dyn RenderBatch,
    ) {
        self.chain.render(ctx, input, render, batch);
    }
}

impl<H: GroupHooks + 'static> DropPolicy for ToolControllerGroup<H> {
    fn should_accept_drop(&mut self, ctx: &mut ToolContext<'_>, input: &InputState, payload: &str) -> bool {
        self.hooks.borrow_mut().should_accept_drop(ctx, input, payload)
            && self.chain.should_accept_drop(ctx, input, payload)
    }

    fn drag_enter(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        payload: &str,
    ) -> Option<Box<dyn DropTracker>> {
        if !self.hooks.borrow_mut().should_accept_drop(ctx, input, payload) {
            return None;
        }
        self.chain.drag_enter(ctx, input, payload).map(|(_, tracker)| tracker)
    }
}

/// A child's drag tracker, reporting progress to the group's hooks.
struct GroupDragTracker<H> {
    child: ToolId,
    tracker: Box<dyn GestureTracker>,
    hooks: Rc<RefCell<H>>,
}

impl<H: GroupHooks> GestureTracker for GroupDragTracker<H> {
    fn modifier_key_change(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        self.tracker.modifier_key_change(ctx, input);
    }

    fn mouse_scroll(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        self.tracker.mouse_scroll(ctx, input);
    }

    fn update(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> bool {
        if !self.tracker.update(ctx, input) {
            return false;
        }
        self.hooks.borrow_mut().mouse_dragged(ctx, input, self.child);
        true
    }

    fn end(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        self.tracker.end(ctx, input);
        self.hooks.borrow_mut().mouse_drag_ended(ctx, input, self.child);
    }

    fn cancel(&mut self, ctx: &mut ToolContext<'_>) {
        self.tracker.cancel(ctx);
        self.hooks.borrow_mut().mouse_drag_cancelled(ctx, self.child);
    }

    fn set_render_options(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        render: &mut dyn RenderContext,
    ) {
        self.tracker.set_render_options(ctx, input, render);
    }

    fn render(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        render: &mut dyn RenderContext,
        batch: &mut dyn RenderBatch,
    ) {
        self.tracker.render(ctx, input, render, batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Tool;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Accepts updates until `updates_left` runs out.
    struct StepTracker {
        updates_left: usize,
    }

    impl GestureTracker for StepTracker {
        fn update(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) -> bool {
            if self.updates_left == 0 {
                return false;
            }
            self.updates_left -= 1;
            true
        }

        fn end(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) {}

        fn cancel(&mut self, _ctx: &mut ToolContext<'_>) {}
    }

    struct Dragger {
        tool: ToolId,
        updates: usize,
    }

    impl ToolController for Dragger {
        fn tool(&self) -> ToolId {
            self.tool
        }

        fn drag(&mut self) -> Option<&mut dyn DragPolicy> {
            Some(self)
        }
    }

    impl DragPolicy for Dragger {
        fn accept_mouse_drag(
            &mut self,
            _ctx: &mut ToolContext<'_>,
            _input: &InputState,
        ) -> Option<Box<dyn GestureTracker>> {
            Some(Box::new(StepTracker {
                updates_left: self.updates,
            }))
        }
    }

    #[derive(Default)]
    struct RecordingHooks {
        allow_drag: bool,
        events: Rc<RefCell<Vec<String>>>,
    }

    impl GroupHooks for RecordingHooks {
        fn should_handle_mouse_drag(&mut self, _ctx: &ToolContext<'_>, _input: &InputState) -> bool {
            self.allow_drag
        }

        fn mouse_drag_started(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, child: ToolId) {
            self.events.borrow_mut().push(format!("started {child}"));
        }

        fn mouse_dragged(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, child: ToolId) {
            self.events.borrow_mut().push(format!("dragged {child}"));
        }

        fn mouse_drag_ended(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, child: ToolId) {
            self.events.borrow_mut().push(format!("ended {child}"));
        }

        fn mouse_drag_cancelled(&mut self, _ctx: &mut ToolContext<'_>, child: ToolId) {
            self.events.borrow_mut().push(format!("cancelled {child}"));
        }
    }

    fn recording_group(
        allow_drag: bool,
        updates: usize,
    ) -> (ToolControllerGroup<RecordingHooks>, Rc<RefCell<Vec<String>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut group = ToolControllerGroup::with_hooks(
            ToolId(0),
            RecordingHooks {
                allow_drag,
                events: Rc::clone(&events),
            },
        );
        group.add_controller(Dragger {
            tool: ToolId(1),
            updates,
        });
        (group, events)
    }

    fn active_tools(count: usize) -> Vec<Tool> {
        (0..count)
            .map(|i| {
                let mut tool = Tool::new(ToolId(i), format!("tool{i}"));
                tool.set_active(true);
                tool
            })
            .collect()
    }

    #[test]
    fn test_default_controller_has_no_capabilities() {
        struct Bare;
        impl ToolController for Bare {
            fn tool(&self) -> ToolId {
                ToolId(0)
            }
        }

        let tools = active_tools(1);
        let mut ctx = ToolContext::new(&tools);
        let mut bare = Bare;
        assert!(bare.mouse().is_none());
        assert!(bare.drag().is_none());
        assert!(bare.drop_target().is_none());
        assert!(!bare.cancel(&mut ctx));
    }

    #[test]
    fn test_group_forwards_drag_and_reports_child() {
        let tools = active_tools(2);
        let (mut group, events) = recording_group(true, 5);

        let mut ctx = ToolContext::new(&tools);
        let input = InputState::new();
        assert!(group.accept_mouse_drag(&mut ctx, &input).is_some());
        assert_eq!(*events.borrow(), vec!["started tool#1".to_string()]);
    }

    #[test]
    fn test_group_observes_drag_lifecycle() {
        let tools = active_tools(2);
        let (mut group, events) = recording_group(true, 1);
        let mut ctx = ToolContext::new(&tools);
        let input = InputState::new();

        let mut tracker = group.accept_mouse_drag(&mut ctx, &input).unwrap();
        assert!(tracker.update(&mut ctx, &input));
        // The child refuses this update, so the group hears nothing.
        assert!(!tracker.update(&mut ctx, &input));
        tracker.end(&mut ctx, &input);

        let mut tracker = group.accept_mouse_drag(&mut ctx, &input).unwrap();
        tracker.cancel(&mut ctx);

        assert_eq!(
            *events.borrow(),
            vec![
                "started tool#1",
                "dragged tool#1",
                "ended tool#1",
                "started tool#1",
                "cancelled tool#1",
            ]
        );
        assert_eq!(group.hooks().events.borrow().len(), 5);
    }

    #[test]
    fn test_group_veto_skips_children() {
        let tools = active_tools(2);
        let (mut group, events) = recording_group(false, 5);

        let mut ctx = ToolContext::new(&tools);
        assert!(group.accept_mouse_drag(&mut ctx, &InputState::new()).is_none());
        assert!(events.borrow().is_empty());

        group.hooks_mut().allow_drag = true;
        assert!(group.accept_mouse_drag(&mut ctx, &InputState::new()).is_some());
    }

    #[test]
    fn test_render_context_downcast() {
        struct Frame(u32);
        let mut frame = Frame(3);
        let render: &mut dyn RenderContext = &mut frame;
        assert_eq!(render.downcast_mut::<Frame>().map(|f| f.0), Some(3));
        assert!(render.downcast_mut::<String>().is_none());
    }
}
