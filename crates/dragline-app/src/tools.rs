//! Demonstration tools: a handle mover and a rotate tool.
//!
//! Both drive their drags through [`RestrictedDragTracker`]: the mover slides
//! a handle on the ground plane (or along the x axis while Shift is held), the
//! rotate tool turns every handle around the scene pivot on a circle.

use crate::render::{Frame, Primitive, RenderOptions};
use crate::scene::{GROUND, HANDLE, Scene, SharedScene};
use dragline_core::drag::{
    CircleRestricter, CircleSnapper, DeltaSnapper, LineRestricter, LineSnapper, PlaneRestricter,
};
use dragline_core::math::{EPSILON, Line3, Plane3, signed_angle};
use dragline_core::{
    DragInfo, DragPolicy, DragResult, DragState, DragUpdate, DropPolicy, DropTracker, GestureTracker, Grid, Hit,
    HitQuery, InputState, MouseButton, PickResult, PickingPolicy, RenderBatch, RenderContext, RenderPolicy,
    RestrictedDrag, RestrictedDragTracker, ToolContext, ToolController, ToolId,
};
use glam::DVec3;
use std::rc::Rc;

/// Drop payload that creates a new handle.
pub const HANDLE_PAYLOAD: &str = "handle";

fn ground_point(input: &InputState) -> Option<DVec3> {
    HitQuery::new().of_type(GROUND).first(input.pick_result()).map(|hit| hit.point)
}

fn boxed(tracker: impl GestureTracker + 'static) -> Box<dyn GestureTracker> {
    Box::new(tracker)
}

// --- Move tool ---

/// Drags single handles around the ground plane and accepts dropped handles.
pub struct MoveTool {
    tool: ToolId,
    scene: SharedScene,
    grid: Grid,
}

impl MoveTool {
    pub fn new(tool: ToolId, scene: SharedScene, grid: Grid) -> Self {
        Self { tool, scene, grid }
    }
}

impl ToolController for MoveTool {
    fn tool(&self) -> ToolId {
        self.tool
    }

    fn picking(&mut self) -> Option<&mut dyn PickingPolicy> {
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
}

impl PickingPolicy for MoveTool {
    fn pick(&mut self, _ctx: &mut ToolContext<'_>, input: &InputState, result: &mut PickResult) {
        let ray = input.pick_ray();
        let Some(distance) = Plane3::from_point_normal(DVec3::ZERO, DVec3::Z).intersect_ray(ray) else {
            return;
        };
        let scene = self.scene.borrow();
        if let Some((index, error)) = scene.handle_near(ray.point_at(distance)) {
            result.add_hit(
                Hit::new(HANDLE, distance, scene.handles[index], index as u64)
                    .with_error(error)
                    .with_pickable(true),
            );
        }
    }
}

impl DragPolicy for MoveTool {
    fn accept_mouse_drag(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> Option<Box<dyn GestureTracker>> {
        if !input.is_only_button_pressed(MouseButton::Left) {
            return None;
        }
        let hit = HitQuery::new().of_type(HANDLE).pickable().first(input.pick_result())?;
        let drag = MoveDrag {
            tool: self.tool,
            scene: Rc::clone(&self.scene),
            grid: self.grid,
            index: hit.target as usize,
            original: hit.point,
        };
        RestrictedDragTracker::start(drag, ctx, input).map(boxed)
    }
}

impl RenderPolicy for MoveTool {
    fn render(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        input: &InputState,
        _render: &mut dyn RenderContext,
        batch: &mut dyn RenderBatch,
    ) {
        let Some(frame) = batch.downcast_mut::<Frame>() else {
            return;
        };
        let hovered = HitQuery::new().of_type(HANDLE).first(input.pick_result()).map(|hit| hit.target);
        for (index, position) in self.scene.borrow().handles.iter().enumerate() {
            frame.push(Primitive::Handle {
                position: *position,
                highlighted: hovered == Some(index as u64),
            });
        }
    }
}

impl DropPolicy for MoveTool {
    fn should_accept_drop(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, payload: &str) -> bool {
        payload == HANDLE_PAYLOAD
    }

    fn drag_enter(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        input: &InputState,
        _payload: &str,
    ) -> Option<Box<dyn DropTracker>> {
        ground_point(input)?;
        Some(Box::new(HandleDrop {
            tool: self.tool,
            scene: Rc::clone(&self.scene),
            grid: self.grid,
        }))
    }
}

/// One handle being moved.
pub struct MoveDrag {
    tool: ToolId,
    scene: SharedScene,
    grid: Grid,
    index: usize,
    original: DVec3,
}

impl MoveDrag {
    fn free(&self) -> DragUpdate {
        DragUpdate::restrict(PlaneRestricter::new(Plane3::from_point_normal(self.original, DVec3::Z)))
            .with_snapper(DeltaSnapper::new(self.grid))
    }

    fn along_x(&self) -> DragUpdate {
        let line = Line3::new(self.original, DVec3::X);
        DragUpdate::restrict(LineRestricter::new(line)).with_snapper(LineSnapper::relative(self.grid, line))
    }
}

impl RestrictedDrag for MoveDrag {
    fn start_drag(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) -> DragInfo {
        log::info!("Moving handle {}", self.index);
        DragInfo::new(
            PlaneRestricter::new(Plane3::from_point_normal(self.original, DVec3::Z)),
            DeltaSnapper::new(self.grid),
        )
        .with_initial_handle(self.original)
    }

    fn drag(
        &mut self,
        ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _state: &DragState,
        _last: DVec3,
        next: DVec3,
    ) -> DragResult {
        let mut scene = self.scene.borrow_mut();
        let Some(handle) = scene.handles.get_mut(self.index) else {
            return DragResult::Cancel;
        };
        *handle = next;
        ctx.refresh_views(self.tool);
        DragResult::Continue
    }

    fn end_drag(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, state: &DragState) {
        log::info!("Handle {} moved by {}", self.index, state.handle_delta());
    }

    fn cancel_drag(&mut self, ctx: &mut ToolContext<'_>) {
        if let Some(handle) = self.scene.borrow_mut().handles.get_mut(self.index) {
            *handle = self.original;
        }
        ctx.refresh_views(self.tool);
    }

    fn modifier_key_change(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        input: &InputState,
        _state: &DragState,
    ) -> Option<DragUpdate> {
        if input.modifiers().shift {
            Some(self.along_x())
        } else {
            Some(self.free())
        }
    }

    fn set_render_options(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _state: &DragState,
        render: &mut dyn RenderContext,
    ) {
        if let Some(options) = render.downcast_mut::<RenderOptions>() {
            options.show_grid = true;
        }
    }

    fn render(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        state: &DragState,
        _render: &mut dyn RenderContext,
        batch: &mut dyn RenderBatch,
    ) {
        if let Some(frame) = batch.downcast_mut::<Frame>() {
            frame.push(Primitive::Guide {
                from: state.initial_handle_position,
                to: state.current_handle_position,
            });
        }
    }
}

/// Places a new, grid-snapped handle where a payload is dropped.
struct HandleDrop {
    tool: ToolId,
    scene: SharedScene,
    grid: Grid,
}

impl DropTracker for HandleDrop {
    fn drag_move(&mut self, _ctx: &mut ToolContext<'_>, input: &InputState) -> bool {
        ground_point(input).is_some()
    }

    fn leave(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) {
        log::debug!("Handle drop left the view");
    }

    fn drag_drop(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> bool {
        let Some(point) = ground_point(input) else {
            return false;
        };
        let position = self.grid.snap(point);
        self.scene.borrow_mut().handles.push(position);
        log::info!("Dropped handle at {position}");
        ctx.refresh_views(self.tool);
        true
    }
}

// --- Rotate tool ---

/// Rotates the whole scene around its pivot, by mouse drag or by a rotation
/// gesture.
pub struct RotateTool {
    tool: ToolId,
    scene: SharedScene,
    grid: Grid,
}

impl RotateTool {
    pub fn new(tool: ToolId, scene: SharedScene, grid: Grid) -> Self {
        Self { tool, scene, grid }
    }
}

impl ToolController for RotateTool {
    fn tool(&self) -> ToolId {
        self.tool
    }

    fn drag(&mut self) -> Option<&mut dyn DragPolicy> {
        Some(self)
    }
}

impl DragPolicy for RotateTool {
    fn accept_mouse_drag(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> Option<Box<dyn GestureTracker>> {
        if !input.is_only_button_pressed(MouseButton::Left) {
            return None;
        }
        let drag = RotateDrag {
            tool: self.tool,
            scene: Rc::clone(&self.scene),
            grid: self.grid,
            snapshot: self.scene.borrow().clone(),
            radius: 0.0,
        };
        RestrictedDragTracker::start(drag, ctx, input).map(boxed)
    }

    fn accept_gesture(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) -> Option<Box<dyn GestureTracker>> {
        Some(boxed(RotateGesture {
            tool: self.tool,
            scene: Rc::clone(&self.scene),
            applied: 0.0,
        }))
    }
}

/// Rotation by dragging on a circle around the pivot.
pub struct RotateDrag {
    tool: ToolId,
    scene: SharedScene,
    grid: Grid,
    snapshot: Scene,
    radius: f64,
}

impl RotateDrag {
    fn snapper(&self, grid: Grid, start: DVec3) -> CircleSnapper {
        CircleSnapper::new(grid, start, self.snapshot.pivot, DVec3::Z, self.radius)
    }
}

impl RestrictedDrag for RotateDrag {
    fn start_drag(&mut self, _ctx: &mut ToolContext<'_>, input: &InputState) -> DragInfo {
        let Some(start) = ground_point(input) else {
            return DragInfo::Skip;
        };
        let pivot = self.snapshot.pivot;
        self.radius = start.truncate().distance(pivot.truncate());
        if self.radius < EPSILON {
            log::debug!("Not rotating: drag starts on the pivot");
            return DragInfo::Skip;
        }
        let start = DVec3::new(start.x, start.y, pivot.z);
        DragInfo::new(
            CircleRestricter::new(pivot, DVec3::Z, self.radius),
            self.snapper(self.grid, start),
        )
    }

    fn drag(
        &mut self,
        ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _state: &DragState,
        last: DVec3,
        next: DVec3,
    ) -> DragResult {
        let pivot = self.snapshot.pivot;
        let angle = signed_angle((last - pivot).normalize(), (next - pivot).normalize(), DVec3::Z);
        self.scene.borrow_mut().rotate(angle);
        ctx.refresh_views(self.tool);
        DragResult::Continue
    }

    fn end_drag(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState, _state: &DragState) {
        let turned = self.scene.borrow().rotation - self.snapshot.rotation;
        log::info!("Rotated by {:.1} degrees", turned.to_degrees());
    }

    fn cancel_drag(&mut self, ctx: &mut ToolContext<'_>) {
        *self.scene.borrow_mut() = self.snapshot.clone();
        ctx.refresh_views(self.tool);
    }

    /// Ctrl turns angle snapping off.
    fn modifier_key_change(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        input: &InputState,
        state: &DragState,
    ) -> Option<DragUpdate> {
        let grid = self.grid.with_snap(!input.modifiers().ctrl);
        Some(DragUpdate::snap(self.snapper(grid, state.initial_mouse_position)))
    }

    fn render(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _input: &InputState,
        _state: &DragState,
        _render: &mut dyn RenderContext,
        batch: &mut dyn RenderBatch,
    ) {
        if let Some(frame) = batch.downcast_mut::<Frame>() {
            frame.push(Primitive::Circle {
                center: self.snapshot.pivot,
                radius: self.radius,
            });
        }
    }
}

/// Follows the rotation of a touchpad gesture.
struct RotateGesture {
    tool: ToolId,
    scene: SharedScene,
    /// Rotation applied so far; gesture values are relative to its start.
    applied: f64,
}

impl GestureTracker for RotateGesture {
    fn update(&mut self, ctx: &mut ToolContext<'_>, input: &InputState) -> bool {
        let rotation = input.gesture().rotation;
        self.scene.borrow_mut().rotate(rotation - self.applied);
        self.applied = rotation;
        ctx.refresh_views(self.tool);
        true
    }

    fn end(&mut self, _ctx: &mut ToolContext<'_>, _input: &InputState) {
        log::info!("Gesture rotated by {:.1} degrees", self.applied.to_degrees());
    }

    fn cancel(&mut self, ctx: &mut ToolContext<'_>) {
        self.scene.borrow_mut().rotate(-self.applied);
        self.applied = 0.0;
        ctx.refresh_views(self.tool);
    }
}
