//! The demo scene: a set of point handles on a ground plane, seen from above.

use dragline_core::math::{Plane3, Ray3};
use dragline_core::{Hit, HitType, PickResult, Picker};
use glam::{DQuat, DVec3};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// The ground plane (z = 0).
pub const GROUND: HitType = HitType::bit(0);

/// A point handle contributed by the move tool.
pub const HANDLE: HitType = HitType::bit(1);

/// Height of the camera above the ground.
pub const CAMERA_HEIGHT: f64 = 100.0;

/// Pick radius of a handle in world units.
pub const HANDLE_RADIUS: f64 = 4.0;

/// Editable state touched by the demo tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub handles: Vec<DVec3>,
    /// Center of rotation.
    pub pivot: DVec3,
    /// Total rotation applied around the pivot, in radians.
    pub rotation: f64,
}

pub type SharedScene = Rc<RefCell<Scene>>;

impl Scene {
    pub fn new(handles: Vec<DVec3>) -> Self {
        Self {
            handles,
            ..Self::default()
        }
    }

    pub fn into_shared(self) -> SharedScene {
        Rc::new(RefCell::new(self))
    }

    /// Index and distance of the handle closest to `point` within the pick
    /// radius, ignoring height.
    pub fn handle_near(&self, point: DVec3) -> Option<(usize, f64)> {
        self.handles
            .iter()
            .enumerate()
            .map(|(index, handle)| (index, handle.truncate().distance(point.truncate())))
            .filter(|(_, distance)| *distance <= HANDLE_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Rotate every handle around the pivot's vertical axis.
    pub fn rotate(&mut self, angle: f64) {
        let rotation = DQuat::from_rotation_z(angle);
        let pivot = self.pivot;
        for handle in &mut self.handles {
            *handle = pivot + rotation * (*handle - pivot);
        }
        self.rotation += angle;
    }
}

/// Orthographic top view: view coordinates map 1:1 onto world x/y.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanView;

impl Picker for PlanView {
    fn pick_ray(&self, position: Point) -> Ray3 {
        Ray3::new(DVec3::new(position.x, position.y, CAMERA_HEIGHT), DVec3::NEG_Z)
    }

    fn pick(&self, ray: &Ray3) -> PickResult {
        let mut result = PickResult::new();
        let ground = Plane3::from_point_normal(DVec3::ZERO, DVec3::Z);
        if let Some(distance) = ground.intersect_ray(ray) {
            result.add_hit(
                Hit::new(GROUND, distance, ray.point_at(distance), 0)
                    .with_normal(DVec3::Z)
                    .with_pickable(true),
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dragline_core::HitQuery;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_plan_view_hits_ground_below_pointer() {
        let view = PlanView;
        let ray = view.pick_ray(Point::new(12.0, -3.0));
        let result = view.pick(&ray);

        let hit = HitQuery::new().of_type(GROUND).first(&result).unwrap();
        assert_eq!(hit.point, DVec3::new(12.0, -3.0, 0.0));
        assert_eq!(hit.distance, CAMERA_HEIGHT);
    }

    #[test]
    fn test_handle_near_picks_closest() {
        let scene = Scene::new(vec![DVec3::new(0.0, 0.0, 0.0), DVec3::new(3.0, 0.0, 0.0)]);
        assert_eq!(scene.handle_near(DVec3::new(2.5, 0.0, 0.0)).map(|(i, _)| i), Some(1));
        assert_eq!(scene.handle_near(DVec3::new(50.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_rotate_around_pivot() {
        let mut scene = Scene::new(vec![DVec3::new(20.0, 10.0, 0.0)]);
        scene.pivot = DVec3::new(10.0, 10.0, 0.0);
        scene.rotate(FRAC_PI_2);

        assert_relative_eq!(scene.handles[0].x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(scene.handles[0].y, 20.0, epsilon = 1e-9);
        assert_relative_eq!(scene.rotation, FRAC_PI_2);
    }
}
