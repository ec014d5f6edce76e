//! Tool activation and the single entry point for input events.

use crate::chain::ToolChain;
use crate::controller::{DropTracker, GestureTracker, RenderBatch, RenderContext};
use crate::input::{InputState, MouseButton};
use crate::notifier::{Notifier, Subscription};
use crate::pick::PickResult;
use crate::tool::{Tool, ToolContext, ToolId, ToolRequest};
use std::collections::VecDeque;

/// Notifications emitted by a [`ToolBox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolBoxEvent {
    ToolActivated(ToolId),
    ToolDeactivated(ToolId),
    /// The views showing this tool should redraw.
    RefreshViews(ToolId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackerKind {
    MouseDrag,
    Gesture,
}

struct ActiveTracker {
    tool: ToolId,
    kind: TrackerKind,
    tracker: Box<dyn GestureTracker>,
}

struct ActiveDrop {
    tool: ToolId,
    tracker: Box<dyn DropTracker>,
    /// Input of the last drop event, replayed to `leave` when the drop is
    /// discarded.
    input: InputState,
}

/// Owns tool activation state and routes input to a [`ToolChain`].
///
/// Activation rules:
/// - activating a tool deactivates every other active member of each
///   exclusive group it belongs to;
/// - while a tool is active, every tool it suppresses is forced inactive and
///   refuses activation; once its last suppressor deactivates, a suppressed
///   tool returns to the state it had when suppression began;
/// - active tools form a modal stack in activation order and `cancel` pops
///   the top one.
///
/// While a drag, gesture or drop is claimed, the tool box holds its tracker
/// and routes the follow-up events to it directly.
pub struct ToolBox {
    tools: Vec<Tool>,
    exclusive_groups: Vec<Vec<ToolId>>,
    /// Indexed by the suppressing tool.
    suppressions: Vec<Vec<ToolId>>,
    modal_stack: Vec<ToolId>,
    tracker: Option<ActiveTracker>,
    drop: Option<ActiveDrop>,
    pending: VecDeque<ToolRequest>,
    enabled: bool,
    ignore_next_click: bool,
    notifier: Notifier<ToolBoxEvent>,
}

impl Default for ToolBox {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBox")
            .field("tools", &self.tools)
            .field("exclusive_groups", &self.exclusive_groups)
            .field("modal_stack", &self.modal_stack)
            .field("tracker", &self.tracker.as_ref().map(|t| (t.tool, t.kind)))
            .field("drop", &self.drop.as_ref().map(|d| d.tool))
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl ToolBox {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            exclusive_groups: Vec::new(),
            suppressions: Vec::new(),
            modal_stack: Vec::new(),
            tracker: None,
            drop: None,
            pending: VecDeque::new(),
            enabled: true,
            ignore_next_click: false,
            notifier: Notifier::new(),
        }
    }

    // --- Registration ---

    /// Register a tool. Tools start inactive.
    pub fn add_tool(&mut self, name: impl Into<String>) -> ToolId {
        let id = ToolId(self.tools.len());
        let tool = Tool::new(id, name);
        log::debug!("Registered tool '{}' as {id}", tool.name());
        self.tools.push(tool);
        self.suppressions.push(Vec::new());
        id
    }

    /// Declare that at most one of `tools` may be active at a time.
    pub fn add_exclusive_group(&mut self, tools: impl IntoIterator<Item = ToolId>) {
        let group: Vec<ToolId> = tools.into_iter().collect();
        assert!(!group.is_empty(), "exclusive group must not be empty");
        for &id in &group {
            self.tool(id);
        }
        self.exclusive_groups.push(group);
    }

    /// Declare that `suppressed` tools are forced off while `primary` is active.
    pub fn suppress_while_active(&mut self, primary: ToolId, suppressed: impl IntoIterator<Item = ToolId>) {
        self.tool(primary);
        for id in suppressed {
            self.tool(id);
            assert!(id != primary, "{primary} cannot suppress itself");
            if !self.suppressions[primary.0].contains(&id) {
                self.suppressions[primary.0].push(id);
            }
        }
    }

    // --- Queries ---

    /// Look up a tool.
    ///
    /// # Panics
    /// If `id` was not issued by this tool box.
    pub fn tool(&self, id: ToolId) -> &Tool {
        match self.tools.get(id.0) {
            Some(tool) => tool,
            None => panic!("unknown {id}: only {} tools are registered", self.tools.len()),
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn tool_by_name(&self, name: &str) -> Option<ToolId> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.id())
    }

    pub fn is_active(&self, id: ToolId) -> bool {
        self.tool(id).is_active()
    }

    /// Active tools, oldest activation first.
    pub fn modal_stack(&self) -> &[ToolId] {
        &self.modal_stack
    }

    pub fn top_tool(&self) -> Option<ToolId> {
        self.modal_stack.last().copied()
    }

    /// Whether a mouse drag is in progress.
    pub fn dragging(&self) -> bool {
        self.tracker.as_ref().is_some_and(|t| t.kind == TrackerKind::MouseDrag)
    }

    pub fn gesture_in_progress(&self) -> bool {
        self.tracker.as_ref().is_some_and(|t| t.kind == TrackerKind::Gesture)
    }

    pub fn drop_in_progress(&self) -> bool {
        self.drop.is_some()
    }

    /// Listen for activation changes and refresh requests.
    #[must_use = "dropping the subscription disconnects the listener immediately"]
    pub fn subscribe(&self, listener: impl FnMut(&ToolBoxEvent) + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }

    // --- Enabled state and click suppression ---

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop reacting to input. Any claimed interaction is cancelled.
    pub fn disable(&mut self) {
        if self.enabled {
            log::info!("Tool box disabled");
        }
        self.enabled = false;
        self.cancel_tracker();
        self.discard_drop();
        self.flush_requests();
    }

    pub fn ignore_next_click(&self) -> bool {
        self.ignore_next_click
    }

    /// Swallow the next click, e.g. the one that only focuses the view.
    pub fn set_ignore_next_click(&mut self) {
        self.ignore_next_click = true;
    }

    pub fn clear_ignore_next_click(&mut self) {
        self.ignore_next_click = false;
    }

    // --- Activation ---

    /// Activate a tool. Returns `false` if it is suppressed.
    pub fn activate(&mut self, id: ToolId) -> bool {
        let activated = self.activate_tool(id);
        self.flush_requests();
        activated
    }

    /// Deactivate an active tool.
    ///
    /// # Panics
    /// If the tool is not on the modal stack.
    pub fn deactivate(&mut self, id: ToolId) {
        self.deactivate_tool(id);
        self.flush_requests();
    }

    /// Flip a tool's activation. Returns whether it is active afterwards.
    pub fn toggle(&mut self, id: ToolId) -> bool {
        if self.is_active(id) {
            self.deactivate(id);
        } else {
            self.activate(id);
        }
        self.is_active(id)
    }

    fn activate_tool(&mut self, id: ToolId) -> bool {
        let tool = self.tool(id);
        if tool.is_active() {
            return true;
        }
        if tool.is_suppressed() {
            log::warn!(
                "Refusing to activate '{}': suppressed by {:?}",
                tool.name(),
                tool.suppressed_by()
            );
            return false;
        }

        let rivals: Vec<ToolId> = self
            .exclusive_groups
            .iter()
            .filter(|group| group.contains(&id))
            .flatten()
            .copied()
            .filter(|&other| other != id)
            .collect();
        for rival in rivals {
            if self.tools[rival.0].is_active() {
                self.deactivate_tool(rival);
            }
        }

        self.tools[id.0].set_active(true);
        self.modal_stack.push(id);
        log::info!("Activated tool '{}'", self.tools[id.0].name());
        self.notifier.notify(&ToolBoxEvent::ToolActivated(id));

        for suppressed in self.suppressions[id.0].clone() {
            let first = self.tools[suppressed.0].suppress(id);
            if first && self.tools[suppressed.0].is_active() {
                log::debug!(
                    "'{}' suppresses '{}'",
                    self.tools[id.0].name(),
                    self.tools[suppressed.0].name()
                );
                self.deactivate_tool(suppressed);
            }
        }
        true
    }

    fn deactivate_tool(&mut self, id: ToolId) {
        let name = self.tool(id).name().to_string();
        let Some(position) = self.modal_stack.iter().position(|&t| t == id) else {
            panic!("deactivating '{name}' ({id}) which is not on the modal tool stack");
        };

        if self.tracker.as_ref().is_some_and(|t| t.tool == id) {
            self.cancel_tracker();
        }
        if self.drop.as_ref().is_some_and(|d| d.tool == id) {
            self.discard_drop();
        }

        self.modal_stack.remove(position);
        self.tools[id.0].set_active(false);
        log::info!("Deactivated tool '{name}'");
        self.notifier.notify(&ToolBoxEvent::ToolDeactivated(id));

        for suppressed in self.suppressions[id.0].clone() {
            if let Some(restore) = self.tools[suppressed.0].release(id) {
                if restore {
                    log::debug!("Restoring '{}' after suppression", self.tools[suppressed.0].name());
                    self.activate_tool(suppressed);
                }
            }
        }
    }

    /// Apply activation requests queued by callbacks, including requests
    /// queued while applying earlier ones.
    fn flush_requests(&mut self) {
        while let Some(request) = self.pending.pop_front() {
            log::debug!("Applying deferred {request:?}");
            match request {
                ToolRequest::Activate(id) => {
                    self.activate_tool(id);
                }
                ToolRequest::Deactivate(id) => {
                    if self.is_active(id) {
                        self.deactivate_tool(id);
                    }
                }
                ToolRequest::Toggle(id) => {
                    if self.is_active(id) {
                        self.deactivate_tool(id);
                    } else {
                        self.activate_tool(id);
                    }
                }
                ToolRequest::RefreshViews(id) => {
                    self.tool(id);
                    self.notifier.notify(&ToolBoxEvent::RefreshViews(id));
                }
            }
        }
    }

    // --- Dispatch helpers ---

    /// Run `f` with a fresh context, then apply what it queued.
    fn dispatch<R>(&mut self, f: impl FnOnce(&mut ToolContext<'_>) -> R) -> R {
        let (result, requests) = {
            let mut ctx = ToolContext::new(&self.tools);
            let result = f(&mut ctx);
            (result, ctx.into_requests())
        };
        self.pending.extend(requests);
        self.flush_requests();
        result
    }

    /// Run `f` on the claimed gesture tracker, if any.
    fn with_tracker<R>(
        &mut self,
        f: impl FnOnce(&mut dyn GestureTracker, &mut ToolContext<'_>) -> R,
    ) -> Option<R> {
        let active = self.tracker.as_mut()?;
        let mut ctx = ToolContext::new(&self.tools);
        let result = f(active.tracker.as_mut(), &mut ctx);
        self.pending.extend(ctx.into_requests());
        self.flush_requests();
        Some(result)
    }

    fn with_drop<R>(
        &mut self,
        input: &InputState,
        f: impl FnOnce(&mut dyn DropTracker, &mut ToolContext<'_>) -> R,
    ) -> Option<R> {
        let active = self.drop.as_mut()?;
        active.input = input.clone();
        let mut ctx = ToolContext::new(&self.tools);
        let result = f(active.tracker.as_mut(), &mut ctx);
        self.pending.extend(ctx.into_requests());
        self.flush_requests();
        Some(result)
    }

    /// Cancel and release the claimed tracker. Queued requests are left for
    /// the caller to flush.
    fn cancel_tracker(&mut self) -> bool {
        let Some(mut active) = self.tracker.take() else {
            return false;
        };
        log::info!("Cancelling {:?} of '{}'", active.kind, self.tools[active.tool.0].name());
        let mut ctx = ToolContext::new(&self.tools);
        active.tracker.cancel(&mut ctx);
        self.pending.extend(ctx.into_requests());
        true
    }

    /// Release the claimed drop, telling its tracker the payload left.
    /// Queued requests are left for the caller to flush.
    fn discard_drop(&mut self) -> bool {
        let Some(mut active) = self.drop.take() else {
            return false;
        };
        log::debug!("Discarding drop claimed by '{}'", self.tools[active.tool.0].name());
        let mut ctx = ToolContext::new(&self.tools);
        active.tracker.leave(&mut ctx, &active.input);
        self.pending.extend(ctx.into_requests());
        true
    }

    fn accepts_input(&self, event: &str) -> bool {
        if !self.enabled {
            log::debug!("Ignoring {event}: tool box is disabled");
        }
        self.enabled
    }

    // --- Input events ---

    /// Let active tools contribute hits to `result`.
    pub fn pick(&mut self, chain: &mut ToolChain, input: &InputState, result: &mut PickResult) {
        if self.accepts_input("pick") {
            self.dispatch(|ctx| chain.pick(ctx, input, result));
        }
    }

    pub fn modifier_key_change(&mut self, chain: &mut ToolChain, input: &InputState) {
        if !self.accepts_input("modifier key change") {
            return;
        }
        if self.tracker.is_some() {
            self.with_tracker(|tracker, ctx| tracker.modifier_key_change(ctx, input));
        } else {
            self.dispatch(|ctx| chain.modifier_key_change(ctx, input));
        }
    }

    pub fn mouse_down(&mut self, chain: &mut ToolChain, input: &InputState, button: MouseButton) {
        if self.accepts_input("mouse down") {
            self.dispatch(|ctx| chain.mouse_down(ctx, input, button));
        }
    }

    pub fn mouse_up(&mut self, chain: &mut ToolChain, input: &InputState, button: MouseButton) {
        if self.accepts_input("mouse up") {
            self.dispatch(|ctx| chain.mouse_up(ctx, input, button));
        }
    }

    /// Returns whether a tool claimed the click.
    pub fn mouse_click(&mut self, chain: &mut ToolChain, input: &InputState) -> bool {
        self.accepts_input("mouse click") && self.dispatch(|ctx| chain.mouse_click(ctx, input)).is_some()
    }

    pub fn mouse_double_click(&mut self, chain: &mut ToolChain, input: &InputState) -> bool {
        self.accepts_input("double click") && self.dispatch(|ctx| chain.mouse_double_click(ctx, input)).is_some()
    }

    pub fn mouse_move(&mut self, chain: &mut ToolChain, input: &InputState) {
        if self.accepts_input("mouse move") {
            self.dispatch(|ctx| chain.mouse_move(ctx, input));
        }
    }

    /// Scrolling goes to the claimed tracker if there is one.
    pub fn mouse_scroll(&mut self, chain: &mut ToolChain, input: &InputState) {
        if !self.accepts_input("mouse scroll") {
            return;
        }
        if self.tracker.is_some() {
            self.with_tracker(|tracker, ctx| tracker.mouse_scroll(ctx, input));
        } else {
            self.dispatch(|ctx| chain.mouse_scroll(ctx, input));
        }
    }

    // --- Mouse drag ---

    /// Offer a mouse drag to the chain. Returns whether a tool claimed it.
    ///
    /// # Panics
    /// If a drag or gesture is already claimed. The view connector checks
    /// [`ToolBox::dragging`] and [`ToolBox::gesture_in_progress`] first.
    pub fn start_mouse_drag(&mut self, chain: &mut ToolChain, input: &InputState) -> bool {
        self.start_tracker(chain, input, TrackerKind::MouseDrag)
    }

    /// Forward a pointer move to the drag tracker. Returns `false` if the
    /// tracker wants the drag to end (or there is none).
    pub fn mouse_drag(&mut self, input: &InputState) -> bool {
        if !self.dragging() {
            return false;
        }
        self.with_tracker(|tracker, ctx| tracker.update(ctx, input))
            .unwrap_or(false)
    }

    pub fn end_mouse_drag(&mut self, input: &InputState) {
        self.end_tracker(input, TrackerKind::MouseDrag);
    }

    /// Returns whether there was a drag to cancel.
    pub fn cancel_mouse_drag(&mut self) -> bool {
        if !self.dragging() {
            return false;
        }
        let cancelled = self.cancel_tracker();
        self.flush_requests();
        cancelled
    }

    // --- Gestures ---

    /// # Panics
    /// If a drag or gesture is already claimed.
    pub fn start_gesture(&mut self, chain: &mut ToolChain, input: &InputState) -> bool {
        self.start_tracker(chain, input, TrackerKind::Gesture)
    }

    /// Forward updated pan, zoom or rotation values to the gesture tracker.
    pub fn gesture_update(&mut self, input: &InputState) -> bool {
        if !self.gesture_in_progress() {
            return false;
        }
        self.with_tracker(|tracker, ctx| tracker.update(ctx, input))
            .unwrap_or(false)
    }

    pub fn end_gesture(&mut self, input: &InputState) {
        self.end_tracker(input, TrackerKind::Gesture);
    }

    fn start_tracker(&mut self, chain: &mut ToolChain, input: &InputState, kind: TrackerKind) -> bool {
        if let Some(active) = &self.tracker {
            panic!(
                "cannot start a {kind:?}: {:?} of {} is still in progress",
                active.kind, active.tool
            );
        }
        if !self.accepts_input("drag start") {
            return false;
        }

        let claim = self.dispatch(|ctx| match kind {
            TrackerKind::MouseDrag => chain.accept_mouse_drag(ctx, input),
            TrackerKind::Gesture => chain.accept_gesture(ctx, input),
        });
        let Some((tool, tracker)) = claim else {
            return false;
        };
        // A deferred request applied during the claim may already have
        // deactivated the claiming tool.
        if !self.is_active(tool) {
            log::debug!("Dropping {kind:?} of {tool}: tool was deactivated while claiming");
            let mut tracker = tracker;
            self.dispatch(|ctx| tracker.cancel(ctx));
            return false;
        }

        log::info!("{kind:?} started by '{}'", self.tools[tool.0].name());
        self.tracker = Some(ActiveTracker { tool, kind, tracker });
        true
    }

    fn end_tracker(&mut self, input: &InputState, kind: TrackerKind) {
        let Some(mut active) = self.tracker.take_if(|t| t.kind == kind) else {
            return;
        };
        log::info!("{:?} of '{}' ended", active.kind, self.tools[active.tool.0].name());
        self.dispatch(|ctx| active.tracker.end(ctx, input));
    }

    // --- Drag and drop ---

    /// Offer a drag-and-drop payload entering the view. Refused while
    /// another drop is claimed.
    pub fn drag_enter(&mut self, chain: &mut ToolChain, input: &InputState, payload: &str) -> bool {
        if !self.accepts_input("drag enter") {
            return false;
        }
        if let Some(active) = &self.drop {
            log::warn!(
                "Refusing payload '{payload}': a drop claimed by '{}' is in progress",
                self.tools[active.tool.0].name()
            );
            return false;
        }
        if !self.dispatch(|ctx| chain.should_accept_drop(ctx, input, payload)) {
            return false;
        }
        match self.dispatch(|ctx| chain.drag_enter(ctx, input, payload)) {
            Some((tool, tracker)) => {
                self.drop = Some(ActiveDrop {
                    tool,
                    tracker,
                    input: input.clone(),
                });
                true
            }
            None => false,
        }
    }

    pub fn drag_move(&mut self, input: &InputState) -> bool {
        self.enabled
            && self
                .with_drop(input, |tracker, ctx| tracker.drag_move(ctx, input))
                .unwrap_or(false)
    }

    pub fn drag_leave(&mut self, input: &InputState) {
        let Some(mut active) = self.drop.take() else {
            return;
        };
        self.dispatch(|ctx| active.tracker.leave(ctx, input));
    }

    /// Returns whether the payload was consumed. A drop arriving while the
    /// tool box is disabled is discarded.
    pub fn drag_drop(&mut self, input: &InputState) -> bool {
        if !self.accepts_input("drop") {
            if self.discard_drop() {
                self.flush_requests();
            }
            return false;
        }
        let Some(mut active) = self.drop.take() else {
            return false;
        };
        log::info!("Payload dropped on '{}'", self.tools[active.tool.0].name());
        self.dispatch(|ctx| active.tracker.drag_drop(ctx, input))
    }

    // --- Rendering ---

    pub fn set_render_options(&mut self, chain: &mut ToolChain, input: &InputState, render: &mut dyn RenderContext) {
        self.dispatch(|ctx| chain.set_render_options(ctx, input, render));
        self.with_tracker(|tracker, ctx| tracker.set_render_options(ctx, input, render));
    }

    pub fn render(
        &mut self,
        chain: &mut ToolChain,
        input: &InputState,
        render: &mut dyn RenderContext,
        batch: &mut dyn RenderBatch,
    ) {
        self.dispatch(|ctx| chain.render(ctx, input, render, batch));
        self.with_tracker(|tracker, ctx| tracker.render(ctx, input, render, batch));
    }

    // --- Cancellation ---

    /// Escape: cancel the claimed drag or gesture, else let the chain unwind
    /// an interaction, else deactivate the most recently activated tool.
    /// Returns `false` if there was nothing to cancel.
    pub fn cancel(&mut self, chain: &mut ToolChain) -> bool {
        if self.cancel_tracker() {
            self.flush_requests();
            return true;
        }
        if self.discard_drop() {
            self.flush_requests();
            return true;
        }
        if self.dispatch(|ctx| chain.cancel(ctx)) {
            return true;
        }
        match self.top_tool() {
            Some(top) => {
                self.deactivate(top);
                true
            }
            None => false,
        }
    }
}
