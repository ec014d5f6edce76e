//! Snappers quantize restricted points.

use super::DragState;
use crate::grid::Grid;
use crate::input::InputState;
use crate::math::{EPSILON, Line3, Plane3, signed_angle};
use crate::pick::{Hit, HitQuery};
use glam::{DQuat, DVec3};

/// Maps a restricted point onto a discrete set of positions.
pub trait DragSnapper {
    fn snap(&self, input: &InputState, state: &DragState, candidate: DVec3) -> Option<DVec3>;
}

/// Passes the candidate through.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IdentitySnapper;

impl DragSnapper for IdentitySnapper {
    fn snap(&self, _input: &InputState, _state: &DragState, candidate: DVec3) -> Option<DVec3> {
        Some(candidate)
    }
}

/// Snaps absolute coordinates to the grid, optionally shifted by an offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsoluteSnapper {
    grid: Grid,
    offset: DVec3,
}

impl AbsoluteSnapper {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            offset: DVec3::ZERO,
        }
    }

    /// Snap `candidate - offset` and add the offset back.
    pub fn with_offset(mut self, offset: DVec3) -> Self {
        self.offset = offset;
        self
    }
}

impl DragSnapper for AbsoluteSnapper {
    fn snap(&self, _input: &InputState, _state: &DragState, candidate: DVec3) -> Option<DVec3> {
        Some(self.grid.snap(candidate - self.offset) + self.offset)
    }
}

/// Snaps the displacement from the initial handle position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaSnapper {
    grid: Grid,
}

impl DeltaSnapper {
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }
}

impl DragSnapper for DeltaSnapper {
    fn snap(&self, _input: &InputState, state: &DragState, candidate: DVec3) -> Option<DVec3> {
        let initial = state.initial_handle_position;
        Some(initial + self.grid.snap(candidate - initial))
    }
}

/// Snaps the angle between `start` and the candidate, both seen from the
/// circle center, to the grid's angle increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleSnapper {
    grid: Grid,
    start: DVec3,
    center: DVec3,
    normal: DVec3,
    radius: f64,
}

impl CircleSnapper {
    pub fn new(grid: Grid, start: DVec3, center: DVec3, normal: DVec3, radius: f64) -> Self {
        Self {
            grid,
            start,
            center,
            normal: normal.normalize_or_zero(),
            radius,
        }
    }
}

impl DragSnapper for CircleSnapper {
    fn snap(&self, _input: &InputState, _state: &DragState, candidate: DVec3) -> Option<DVec3> {
        let plane = Plane3::from_point_normal(self.center, self.normal);
        let from = plane.project_point(self.start) - self.center;
        let to = plane.project_point(candidate) - self.center;
        if from.length() < EPSILON || to.length() < EPSILON {
            return None;
        }

        let from = from.normalize();
        let angle = self.grid.snap_to_angle(signed_angle(from, to.normalize(), self.normal));
        let rotated = DQuat::from_axis_angle(self.normal, angle) * from;
        Some(self.center + rotated * self.radius)
    }
}

/// Whether a line snapper quantizes world coordinates or the distance
/// travelled along the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSnapMode {
    Absolute,
    Relative,
}

/// Keeps the candidate on a line while snapping it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSnapper {
    grid: Grid,
    line: Line3,
    mode: LineSnapMode,
}

impl LineSnapper {
    pub fn absolute(grid: Grid, line: Line3) -> Self {
        Self {
            grid,
            line,
            mode: LineSnapMode::Absolute,
        }
    }

    pub fn relative(grid: Grid, line: Line3) -> Self {
        Self {
            grid,
            line,
            mode: LineSnapMode::Relative,
        }
    }
}

impl DragSnapper for LineSnapper {
    fn snap(&self, _input: &InputState, state: &DragState, candidate: DVec3) -> Option<DVec3> {
        let snapped = match self.mode {
            LineSnapMode::Absolute => self.grid.snap_on_line(candidate, &self.line),
            LineSnapMode::Relative => {
                self.grid
                    .snap_along_line(state.initial_handle_position, candidate, &self.line)
            }
        };
        Some(snapped)
    }
}

/// Chooses the plane a surface hit is snapped onto.
pub trait SurfacePlane {
    fn plane(&self, hit: &Hit) -> Option<Plane3>;
}

impl<F> SurfacePlane for F
where
    F: Fn(&Hit) -> Option<Plane3>,
{
    fn plane(&self, hit: &Hit) -> Option<Plane3> {
        self(hit)
    }
}

/// Uses the plane through the hit point orthogonal to the hit normal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HitNormalPlane;

impl SurfacePlane for HitNormalPlane {
    fn plane(&self, hit: &Hit) -> Option<Plane3> {
        hit.normal.map(|normal| Plane3::from_point_normal(hit.point, normal))
    }
}

/// Re-runs a pick query and snaps the hit onto the surface plane.
///
/// The candidate itself is ignored: the hit under the pointer decides which
/// surface is snapped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSnapper<P = HitNormalPlane> {
    grid: Grid,
    query: HitQuery,
    plane: P,
}

impl SurfaceSnapper<HitNormalPlane> {
    pub fn new(grid: Grid, query: HitQuery) -> Self {
        Self::with_plane(grid, query, HitNormalPlane)
    }
}

impl<P: SurfacePlane> SurfaceSnapper<P> {
    pub fn with_plane(grid: Grid, query: HitQuery, plane: P) -> Self {
        Self { grid, query, plane }
    }
}

impl<P: SurfacePlane> DragSnapper for SurfaceSnapper<P> {
    fn snap(&self, input: &InputState, _state: &DragState, _candidate: DVec3) -> Option<DVec3> {
        let hit = self.query.first(input.pick_result())?;
        let plane = self.plane.plane(hit)?;
        Some(self.grid.snap_on_plane(hit.point, &plane))
    }
}

/// Tries each snapper in turn; the first success wins.
#[derive(Default)]
pub struct MultiSnapper {
    snappers: Vec<Box<dyn DragSnapper>>,
}

impl MultiSnapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, snapper: impl DragSnapper + 'static) -> Self {
        self.snappers.push(Box::new(snapper));
        self
    }
}

impl DragSnapper for MultiSnapper {
    fn snap(&self, input: &InputState, state: &DragState, candidate: DVec3) -> Option<DVec3> {
        self.snappers
            .iter()
            .find_map(|snapper| snapper.snap(input, state, candidate))
    }
}
