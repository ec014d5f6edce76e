//! Restricters turn the pick ray into a point on reference geometry.

use crate::input::InputState;
use crate::math::{EPSILON, Line3, Plane3};
use crate::pick::HitQuery;
use glam::DVec3;

/// Projects the current pointer onto a piece of reference geometry.
///
/// Returning `None` means the pointer cannot be resolved this frame; a drag
/// in progress simply skips the frame.
pub trait DragRestricter {
    fn hit_point(&self, input: &InputState) -> Option<DVec3>;
}

/// Restricts to a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneRestricter {
    plane: Plane3,
}

impl PlaneRestricter {
    pub fn new(plane: Plane3) -> Self {
        Self { plane }
    }

    pub fn plane(&self) -> &Plane3 {
        &self.plane
    }
}

impl DragRestricter for PlaneRestricter {
    fn hit_point(&self, input: &InputState) -> Option<DVec3> {
        let ray = input.pick_ray();
        self.plane.intersect_ray(ray).map(|t| ray.point_at(t))
    }
}

/// Restricts to the point on a line closest to the pick ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRestricter {
    line: Line3,
}

impl LineRestricter {
    pub fn new(line: Line3) -> Self {
        Self { line }
    }

    pub fn line(&self) -> &Line3 {
        &self.line
    }
}

impl DragRestricter for LineRestricter {
    fn hit_point(&self, input: &InputState) -> Option<DVec3> {
        input
            .pick_ray()
            .closest_on_line(&self.line)
            .map(|distance| self.line.point_at(distance))
    }
}

/// Restricts to a circle: the ray is intersected with the circle's plane and
/// the hit is pushed radially onto the circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleRestricter {
    center: DVec3,
    normal: DVec3,
    radius: f64,
}

impl CircleRestricter {
    pub fn new(center: DVec3, normal: DVec3, radius: f64) -> Self {
        Self {
            center,
            normal: normal.normalize_or_zero(),
            radius,
        }
    }
}

impl DragRestricter for CircleRestricter {
    fn hit_point(&self, input: &InputState) -> Option<DVec3> {
        let plane = Plane3::from_point_normal(self.center, self.normal);
        let ray = input.pick_ray();
        let hit = ray.point_at(plane.intersect_ray(ray)?);
        let offset = hit - self.center;
        if offset.length() < EPSILON {
            return None;
        }
        Some(self.center + offset.normalize() * self.radius)
    }
}

/// Restricts to whatever the pick result reports first for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRestricter {
    query: HitQuery,
}

impl SurfaceRestricter {
    pub fn new(query: HitQuery) -> Self {
        Self { query }
    }

    pub fn query(&self) -> &HitQuery {
        &self.query
    }
}

impl DragRestricter for SurfaceRestricter {
    fn hit_point(&self, input: &InputState) -> Option<DVec3> {
        self.query.first(input.pick_result()).map(|hit| hit.point)
    }
}
