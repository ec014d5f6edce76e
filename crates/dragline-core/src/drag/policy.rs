//! The restricted drag lifecycle shared by drag-based tools.

use super::restricter::DragRestricter;
use super::snapper::DragSnapper;
use crate::controller::{GestureTracker, RenderBatch, RenderContext};
use crate::input::InputState;
use crate::tool::ToolContext;
use glam::DVec3;

/// Positions of one drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub initial_handle_position: DVec3,
    pub current_handle_position: DVec3,
    /// Raw restricted hit at the start of the drag.
    pub initial_mouse_position: DVec3,
    /// Last raw restricted hit.
    pub current_mouse_position: DVec3,
}

impl DragState {
    pub fn starting_at(handle: DVec3, mouse: DVec3) -> Self {
        Self {
            initial_handle_position: handle,
            current_handle_position: handle,
            initial_mouse_position: mouse,
            current_mouse_position: mouse,
        }
    }

    /// Handle offset accumulated since the drag started.
    pub fn handle_delta(&self) -> DVec3 {
        self.current_handle_position - self.initial_handle_position
    }
}

/// What a tool answers when asked to start a restricted drag.
pub enum DragInfo {
    /// Refuse the drag.
    Skip,
    Restrict {
        restricter: Box<dyn DragRestricter>,
        snapper: Box<dyn DragSnapper>,
        /// Use this as the initial handle position instead of the snapped hit.
        initial_handle_position: Option<DVec3>,
    },
}

impl DragInfo {
    pub fn new(restricter: impl DragRestricter + 'static, snapper: impl DragSnapper + 'static) -> Self {
        DragInfo::Restrict {
            restricter: Box::new(restricter),
            snapper: Box::new(snapper),
            initial_handle_position: None,
        }
    }

    pub fn with_initial_handle(self, position: DVec3) -> Self {
        match self {
            DragInfo::Skip => DragInfo::Skip,
            DragInfo::Restrict {
                restricter, snapper, ..
            } => DragInfo::Restrict {
                restricter,
                snapper,
                initial_handle_position: Some(position),
            },
        }
    }
}

impl std::fmt::Debug for DragInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DragInfo::Skip => f.write_str("Skip"),
            DragInfo::Restrict {
                initial_handle_position,
                ..
            } => f
                .debug_struct("Restrict")
                .field("initial_handle_position", initial_handle_position)
                .finish_non_exhaustive(),
        }
    }
}

/// Outcome of one drag step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragResult {
    /// Accept the new handle position.
    Continue,
    /// Reject this step and keep dragging.
    Deny,
    /// Abort the drag.
    Cancel,
}

/// Constraint swap requested by a tool when the modifier keys change.
pub struct DragUpdate {
    pub restricter: Option<Box<dyn DragRestricter>>,
    pub snapper: Option<Box<dyn DragSnapper>>,
    /// Re-anchor the initial handle position at the swap point.
    pub reset_initial: bool,
}

impl DragUpdate {
    pub fn restrict(restricter: impl DragRestricter + 'static) -> Self {
        Self {
            restricter: Some(Box::new(restricter)),
            snapper: None,
            reset_initial: false,
        }
    }

    pub fn snap(snapper: impl DragSnapper + 'static) -> Self {
        Self {
            restricter: None,
            snapper: Some(Box::new(snapper)),
            reset_initial: false,
        }
    }

    pub fn with_snapper(mut self, snapper: impl DragSnapper + 'static) -> Self {
        self.snapper = Some(Box::new(snapper));
        self
    }

    pub fn reset_initial(mut self) -> Self {
        self.reset_initial = true;
        self
    }
}

/// Tool-specific half of a restricted drag.
pub trait RestrictedDrag {
    fn start_drag(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> DragInfo;

    /// Move the handle from `last` to `next`.
    fn drag(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        state: &DragState,
        last: DVec3,
        next: DVec3,
    ) -> DragResult;

    fn end_drag(&mut self, ctx: &mut ToolContext<'_>, input: &InputState, state: &DragState);

    /// Roll back whatever the drag did so far.
    fn cancel_drag(&mut self, ctx: &mut ToolContext<'_>);

    fn modifier_key_change(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _state: &DragState,
    ) -> Option<DragUpdate> {
        None
    }

    fn mouse_scroll(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _state: &DragState) {}

    fn set_render_options(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _state: &DragState,
        _render: &mut dyn RenderContext,
    ) {
    }

    fn render(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _state: &DragState,
        _render: &mut dyn RenderContext,
        _batch: &mut dyn RenderBatch,
    ) {
    }
}

struct DragSession {
    restricter: Box<dyn DragRestricter>,
    snapper: Box<dyn DragSnapper>,
    state: DragState,
}

impl DragSession {
    /// Resolve the pointer, snap it and hand it to the delegate.
    fn step<D: RestrictedDrag + ?Sized>(
        &mut self,
        delegate: &mut D,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        force: bool,
    ) -> bool {
        let Some(hit) = self.restricter.hit_point(input) else {
            log::debug!("Skipping drag frame: pointer cannot be restricted");
            return true;
        };
        self.state.current_mouse_position = hit;

        let Some(next) = self.snapper.snap(input, &self.state, hit) else {
            log::debug!("Skipping drag frame: snapping failed");
            return true;
        };
        let last = self.state.current_handle_position;
        if !force && next == last {
            return true;
        }

        match delegate.drag(ctx, input, &self.state, last, next) {
            DragResult::Continue => {
                self.state.current_handle_position = next;
                true
            }
            DragResult::Deny => true,
            DragResult::Cancel => false,
        }
    }
}

/// Drag lifecycle: Idle until [`start`](Self::start) succeeds, Dragging until
/// [`end`](Self::end) or [`cancel`](Self::cancel).
#[derive(Default)]
pub struct RestrictedDragPolicy {
    session: Option<DragSession>,
}

impl std::fmt::Debug for RestrictedDragPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestrictedDragPolicy")
            .field("state", &self.state())
            .finish()
    }
}

impl RestrictedDragPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn state(&self) -> Option<&DragState> {
        self.session.as_ref().map(|s| &s.state)
    }

    /// Ask the delegate for a restricter and snapper and start dragging.
    ///
    /// Returns `false` if the delegate skipped or the pointer could not be
    /// restricted, in which case the policy stays idle.
    pub fn start<D: RestrictedDrag + ?Sized>(
        &mut self,
        delegate: &mut D,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
    ) -> bool {
        assert!(self.session.is_none(), "start called while a restricted drag is in progress");

        let (restricter, snapper, initial_handle_position) = match delegate.start_drag(ctx, input) {
            DragInfo::Skip => return false,
            DragInfo::Restrict {
                restricter,
                snapper,
                initial_handle_position,
            } => (restricter, snapper, initial_handle_position),
        };

        let Some(hit) = restricter.hit_point(input) else {
            log::debug!("Drag start cancelled: pointer cannot be restricted");
            delegate.cancel_drag(ctx);
            return false;
        };

        let handle = match initial_handle_position {
            Some(handle) => handle,
            None => snapper
                .snap(input, &DragState::starting_at(hit, hit), hit)
                .unwrap_or(hit),
        };

        log::info!("Restricted drag started at {handle}");
        self.session = Some(DragSession {
            restricter,
            snapper,
            state: DragState::starting_at(handle, hit),
        });
        true
    }

    /// Process a pointer move. Returns `false` if the delegate asked to
    /// cancel; the owner is then expected to call [`cancel`](Self::cancel).
    pub fn drag<D: RestrictedDrag + ?Sized>(
        &mut self,
        delegate: &mut D,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            panic!("drag called while no restricted drag is in progress");
        };
        session.step(delegate, ctx, input, false)
    }

    /// Replace the restricter mid-drag and run one drag step with it.
    pub fn set_restricter<D: RestrictedDrag + ?Sized>(
        &mut self,
        delegate: &mut D,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        restricter: Box<dyn DragRestricter>,
        reset_initial: bool,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            panic!("set_restricter called while no restricted drag is in progress");
        };
        session.restricter = restricter;
        Self::reanchor_and_step(session, delegate, ctx, input, reset_initial)
    }

    /// Replace the snapper mid-drag and run one drag step with it.
    pub fn set_snapper<D: RestrictedDrag + ?Sized>(
        &mut self,
        delegate: &mut D,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        snapper: Box<dyn DragSnapper>,
        reset_initial: bool,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            panic!("set_snapper called while no restricted drag is in progress");
        };
        session.snapper = snapper;
        Self::reanchor_and_step(session, delegate, ctx, input, reset_initial)
    }

    /// Apply a [`DragUpdate`]: swap whatever it carries and run one step.
    pub fn apply_update<D: RestrictedDrag + ?Sized>(
        &mut self,
        delegate: &mut D,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        update: DragUpdate,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            panic!("apply_update called while no restricted drag is in progress");
        };
        if let Some(restricter) = update.restricter {
            session.restricter = restricter;
        }
        if let Some(snapper) = update.snapper {
            session.snapper = snapper;
        }
        Self::reanchor_and_step(session, delegate, ctx, input, update.reset_initial)
    }

    fn reanchor_and_step<D: RestrictedDrag + ?Sized>(
        session: &mut DragSession,
        delegate: &mut D,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        reset_initial: bool,
    ) -> bool {
        if reset_initial {
            match session.restricter.hit_point(input) {
                Some(hit) => {
                    let anchor = DragState::starting_at(hit, hit);
                    let handle = session.snapper.snap(input, &anchor, hit).unwrap_or(hit);
                    session.state.initial_handle_position = handle;
                    session.state.initial_mouse_position = hit;
                }
                None => log::debug!("Keeping drag anchor: pointer cannot be restricted"),
            }
        }
        session.step(delegate, ctx, input, true)
    }

    /// Finish the drag. Does nothing while idle.
    pub fn end<D: RestrictedDrag + ?Sized>(
        &mut self,
        delegate: &mut D,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
    ) {
        if let Some(session) = self.session.take() {
            log::info!("Restricted drag ended at {}", session.state.current_handle_position);
            delegate.end_drag(ctx, input, &session.state);
        }
    }

    /// Abort the drag. Does nothing while idle.
    pub fn cancel<D: RestrictedDrag + ?Sized>(&mut self, delegate: &mut D, ctx: &mut ToolContext<'_>) {
        if self.session.take().is_some() {
            log::info!("Restricted drag cancelled");
            delegate.cancel_drag(ctx);
        }
    }
}

/// Runs a [`RestrictedDrag`] delegate as the tracker of a claimed drag.
pub struct RestrictedDragTracker<D> {
    policy: RestrictedDragPolicy,
    delegate: D,
}

impl<D: RestrictedDrag> RestrictedDragTracker<D> {
    /// Start the drag. Returns `None` (dropping the delegate) if the delegate
    /// refused or the pointer could not be restricted.
    pub fn start(mut delegate: D, ctx: &mut ToolContext<'_>, input: &InputState) -> Option<Self> {
        let mut policy = RestrictedDragPolicy::new();
        policy.start(&mut delegate, ctx, input).then_some(Self { policy, delegate })
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn policy(&self) -> &RestrictedDragPolicy {
        &self.policy
    }
}

impl<D: RestrictedDrag> GestureTracker for RestrictedDragTracker<D> {
    fn modifier_key_change(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        let Some(state) = self.policy.state().copied() else {
            return;
        };
        if let Some(update) = self.delegate.modifier_key_change(ctx, input, &state) {
            if !self.policy.apply_update(&mut self.delegate, ctx, input, update) {
                self.policy.cancel(&mut self.delegate, ctx);
            }
        }
    }

    fn mouse_scroll(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        if let Some(state) = self.policy.state().copied() {
            self.delegate.mouse_scroll(ctx, input, &state);
        }
    }

    fn update(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> bool {
        if !self.policy.is_dragging() {
            return false;
        }
        if self.policy.drag(&mut self.delegate, ctx, input) {
            return true;
        }
        self.policy.cancel(&mut self.delegate, ctx);
        false
    }

    fn end(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) {
        self.policy.end(&mut self.delegate, ctx, input);
    }

    fn cancel(&mut self, ctx: &mut ToolContext<'_>) {
        self.policy.cancel(&mut self.delegate, ctx);
    }

    fn set_render_options(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        render: &mut dyn RenderContext,
    ) {
        if let Some(state) = self.policy.state().copied() {
            self.delegate.set_render_options(ctx, input, &state, render);
        }
    }

    fn render(
        &mut self,
        ctx: &mut ToolContext<'_>,
        input: &InputState,
        render: &mut dyn RenderContext,
        batch: &mut dyn RenderBatch,
    ) {
        if let Some(state) = self.policy.state().copied() {
            self.delegate.render(ctx, input, &state, render, batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::restricter::{CircleRestricter, LineRestricter, PlaneRestricter};
    use crate::drag::snapper::{AbsoluteSnapper, CircleSnapper, DeltaSnapper, IdentitySnapper};
    use crate::grid::Grid;
    use crate::math::{Line3, Plane3, Ray3};
    use crate::tool::{Tool, ToolId};
    use approx::assert_relative_eq;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Call {
        Drag(DVec3, DVec3),
        End,
        Cancel,
    }

    /// Test delegate restricted to the z = 0 plane.
    struct Recorder {
        grid: Grid,
        skip: bool,
        result: DragResult,
        initial_override: Option<DVec3>,
        calls: Vec<Call>,
        panic_on_end: bool,
    }

    impl Recorder {
        fn new(grid: Grid) -> Self {
            Self {
                grid,
                skip: false,
                result: DragResult::Continue,
                initial_override: None,
                calls: Vec::new(),
                panic_on_end: false,
            }
        }
    }

    impl RestrictedDrag for Recorder {
        fn start_drag(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) -> DragInfo {
            if self.skip {
                return DragInfo::Skip;
            }
            let info = DragInfo::new(
                PlaneRestricter::new(Plane3::from_point_normal(DVec3::ZERO, DVec3::Z)),
                AbsoluteSnapper::new(self.grid),
            );
            match self.initial_override {
                Some(p) => info.with_initial_handle(p),
                None => info,
            }
        }

        fn drag(
            &mut self,
            _ctx: &mut ToolContext<'_>,
            _input: &InputState,
            _state: &DragState,
            last: DVec3,
            next: DVec3,
        ) -> DragResult {
            self.calls.push(Call::Drag(last, next));
            self.result
        }

        fn end_drag(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _state: &DragState) {
            self.calls.push(Call::End);
            if self.panic_on_end {
                panic!("end hook failed");
            }
        }

        fn cancel_drag(&mut self, _ctx: &mut ToolContext<'_>) {
            self.calls.push(Call::Cancel);
        }
    }

    /// Pick ray from above hitting the z = 0 plane at (x, y).
    fn pointer_at(x: f64, y: f64) -> InputState {
        InputState::with_pick_ray(Ray3::new(DVec3::new(x, y, 10.0), DVec3::NEG_Z))
    }

    fn tools() -> Vec<Tool> {
        vec![Tool::new(ToolId(0), "move")]
    }

    #[test]
    fn test_plane_grid_drag_scenario() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        let mut policy = RestrictedDragPolicy::new();

        assert!(policy.start(&mut delegate, &mut ctx, &pointer_at(1.3, 2.7)));
        let state = *policy.state().unwrap();
        assert_relative_eq!(state.initial_handle_position.x, 1.0);
        assert_relative_eq!(state.initial_handle_position.y, 3.0);
        assert_relative_eq!(state.initial_handle_position.z, 0.0);
        assert_relative_eq!(state.initial_mouse_position.x, 1.3, epsilon = 1e-12);

        assert!(policy.drag(&mut delegate, &mut ctx, &pointer_at(1.4, 2.6)));
        assert!(delegate.calls.is_empty());

        assert!(policy.drag(&mut delegate, &mut ctx, &pointer_at(2.6, 2.6)));
        assert_eq!(
            delegate.calls,
            vec![Call::Drag(DVec3::new(1.0, 3.0, 0.0), DVec3::new(3.0, 3.0, 0.0))]
        );
        assert_eq!(policy.state().unwrap().current_handle_position, DVec3::new(3.0, 3.0, 0.0));
    }

    #[test]
    fn test_skip_stays_idle() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        delegate.skip = true;
        let mut policy = RestrictedDragPolicy::new();

        assert!(!policy.start(&mut delegate, &mut ctx, &pointer_at(0.0, 0.0)));
        assert!(!policy.is_dragging());
        assert!(delegate.calls.is_empty());
    }

    #[test]
    fn test_unresolvable_start_cancels() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        let mut policy = RestrictedDragPolicy::new();

        // Looking away from the plane.
        let input = InputState::with_pick_ray(Ray3::new(DVec3::new(0.0, 0.0, 10.0), DVec3::Z));
        assert!(!policy.start(&mut delegate, &mut ctx, &input));
        assert!(!policy.is_dragging());
        assert_eq!(delegate.calls, vec![Call::Cancel]);
    }

    #[test]
    fn test_unresolvable_frame_is_skipped() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        let mut policy = RestrictedDragPolicy::new();
        assert!(policy.start(&mut delegate, &mut ctx, &pointer_at(0.0, 0.0)));

        let away = InputState::with_pick_ray(Ray3::new(DVec3::new(0.0, 0.0, 10.0), DVec3::X));
        assert!(policy.drag(&mut delegate, &mut ctx, &away));
        assert!(policy.is_dragging());
        assert!(delegate.calls.is_empty());
    }

    #[test]
    fn test_deny_keeps_handle() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        delegate.result = DragResult::Deny;
        let mut policy = RestrictedDragPolicy::new();
        assert!(policy.start(&mut delegate, &mut ctx, &pointer_at(0.0, 0.0)));

        assert!(policy.drag(&mut delegate, &mut ctx, &pointer_at(2.0, 0.0)));
        let state = policy.state().unwrap();
        assert_eq!(state.current_handle_position, DVec3::ZERO);
        assert_relative_eq!(state.current_mouse_position.x, 2.0);
    }

    #[test]
    fn test_cancel_result_stops_drag() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        delegate.result = DragResult::Cancel;
        let mut policy = RestrictedDragPolicy::new();
        assert!(policy.start(&mut delegate, &mut ctx, &pointer_at(0.0, 0.0)));

        assert!(!policy.drag(&mut delegate, &mut ctx, &pointer_at(2.0, 0.0)));
        policy.cancel(&mut delegate, &mut ctx);
        assert!(!policy.is_dragging());
        assert_eq!(delegate.calls.last(), Some(&Call::Cancel));
    }

    #[test]
    fn test_initial_handle_override() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        delegate.initial_override = Some(DVec3::new(5.0, 5.0, 0.0));
        let mut policy = RestrictedDragPolicy::new();

        assert!(policy.start(&mut delegate, &mut ctx, &pointer_at(1.3, 2.7)));
        assert_eq!(policy.state().unwrap().initial_handle_position, DVec3::new(5.0, 5.0, 0.0));
    }

    #[test]
    fn test_swap_forces_one_step() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        let mut policy = RestrictedDragPolicy::new();
        let input = pointer_at(1.0, 1.0);
        assert!(policy.start(&mut delegate, &mut ctx, &input));

        // Same pointer, same snapped position: a swap still reaches the tool.
        policy.set_snapper(&mut delegate, &mut ctx, &input, Box::new(IdentitySnapper), false);
        assert_eq!(delegate.calls.len(), 1);
        assert!(policy.drag(&mut delegate, &mut ctx, &input));
        assert_eq!(delegate.calls.len(), 1);
    }

    #[test]
    fn test_swap_with_reset_reanchors() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        let mut policy = RestrictedDragPolicy::new();
        assert!(policy.start(&mut delegate, &mut ctx, &pointer_at(0.0, 0.0)));

        let input = pointer_at(4.2, 0.0);
        let line = LineRestricter::new(Line3::new(DVec3::ZERO, DVec3::X));
        policy.set_restricter(&mut delegate, &mut ctx, &input, Box::new(line), true);

        let state = policy.state().unwrap();
        assert_eq!(state.initial_handle_position, DVec3::new(4.0, 0.0, 0.0));
        assert_eq!(state.current_handle_position, DVec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_cancel_resets_after_swaps() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        let mut policy = RestrictedDragPolicy::new();
        let input = pointer_at(1.0, 2.0);
        assert!(policy.start(&mut delegate, &mut ctx, &input));

        for i in 0..5 {
            policy.set_snapper(&mut delegate, &mut ctx, &input, Box::new(DeltaSnapper::new(Grid::new(1.0))), i % 2 == 0);
            let circle = CircleRestricter::new(DVec3::ZERO, DVec3::Z, 3.0);
            policy.set_restricter(&mut delegate, &mut ctx, &input, Box::new(circle), i % 2 == 1);
        }

        policy.cancel(&mut delegate, &mut ctx);
        assert!(!policy.is_dragging());
        assert!(policy.state().is_none());
        assert_eq!(delegate.calls.last(), Some(&Call::Cancel));

        // Idle again: a fresh drag can start.
        assert!(policy.start(&mut delegate, &mut ctx, &input));
    }

    #[test]
    fn test_end_releases_session_when_hook_panics() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        delegate.panic_on_end = true;
        let mut policy = RestrictedDragPolicy::new();
        let input = pointer_at(0.0, 0.0);
        assert!(policy.start(&mut delegate, &mut ctx, &input));

        let result = catch_unwind(AssertUnwindSafe(|| policy.end(&mut delegate, &mut ctx, &input)));
        assert!(result.is_err());
        assert!(!policy.is_dragging());
    }

    #[test]
    #[should_panic(expected = "set_restricter called while no restricted drag is in progress")]
    fn test_swap_while_idle_panics() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        let mut policy = RestrictedDragPolicy::new();
        let restricter = PlaneRestricter::new(Plane3::from_point_normal(DVec3::ZERO, DVec3::Z));
        policy.set_restricter(&mut delegate, &mut ctx, &pointer_at(0.0, 0.0), Box::new(restricter), false);
    }

    /// Rotates a handle on a circle of radius 4 around the origin.
    struct Rotator {
        angles: Vec<f64>,
    }

    impl RestrictedDrag for Rotator {
        fn start_drag(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) -> DragInfo {
            let grid = Grid::new(1.0).with_snap_angle_degrees(15.0);
            let start = DVec3::new(4.0, 0.0, 0.0);
            DragInfo::new(
                CircleRestricter::new(DVec3::ZERO, DVec3::Z, 4.0),
                CircleSnapper::new(grid, start, DVec3::ZERO, DVec3::Z, 4.0),
            )
            .with_initial_handle(start)
        }

        fn drag(
            &mut self,
            _ctx: &mut ToolContext<'_>,
            _input: &InputState,
            _state: &DragState,
            _last: DVec3,
            next: DVec3,
        ) -> DragResult {
            self.angles.push(next.y.atan2(next.x).to_degrees());
            DragResult::Continue
        }

        fn end_drag(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _state: &DragState) {}

        fn cancel_drag(&mut self, _ctx: &mut ToolContext<'_>) {}
    }

    #[test]
    fn test_circle_angle_snap_scenario() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let at = |degrees: f64| {
            let r = degrees.to_radians();
            pointer_at(4.0 * r.cos(), 4.0 * r.sin())
        };

        let mut tracker = RestrictedDragTracker::start(Rotator { angles: Vec::new() }, &mut ctx, &at(0.0)).unwrap();
        assert!(tracker.update(&mut ctx, &at(20.0)));
        assert!(tracker.update(&mut ctx, &at(7.0)));
        tracker.end(&mut ctx, &at(7.0));

        let angles = &tracker.delegate().angles;
        assert_eq!(angles.len(), 2);
        assert_relative_eq!(angles[0], 15.0, epsilon = 1e-9);
        assert_relative_eq!(angles[1], 0.0, epsilon = 1e-9);
        assert!(!tracker.policy().is_dragging());
    }

    #[test]
    fn test_tracker_cancels_on_cancel_result() {
        let tools = tools();
        let mut ctx = ToolContext::new(&tools);
        let mut delegate = Recorder::new(Grid::new(1.0));
        delegate.result = DragResult::Cancel;

        let mut tracker = RestrictedDragTracker::start(delegate, &mut ctx, &pointer_at(0.0, 0.0)).unwrap();
        assert!(!tracker.update(&mut ctx, &pointer_at(3.0, 0.0)));
        assert!(!tracker.policy().is_dragging());
        assert_eq!(tracker.delegate().calls.last(), Some(&Call::Cancel));

        // The owner ending the drag afterwards is harmless.
        tracker.end(&mut ctx, &pointer_at(3.0, 0.0));
        assert_eq!(tracker.delegate().calls.last(), Some(&Call::Cancel));
    }
}
