//! World-space geometry for drag restricters and snappers.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Tolerance for parallelism and coincidence tests.
pub const EPSILON: f64 = 1e-9;

/// A half line starting at `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray3 {
    /// Ray origin (usually the camera position).
    pub origin: DVec3,
    /// Unit direction.
    pub direction: DVec3,
}

impl Ray3 {
    /// Create a ray, normalizing the direction.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at the given distance from the origin.
    pub fn point_at(&self, distance: f64) -> DVec3 {
        self.origin + self.direction * distance
    }

    /// Distance along `line` of the point closest to this ray.
    ///
    /// Returns `None` if the ray runs parallel to the line. When the closest
    /// approach lies behind the ray origin, the origin itself is projected onto
    /// the line instead.
    pub fn closest_on_line(&self, line: &Line3) -> Option<f64> {
        let u = line.direction;
        let v = self.direction;
        let w0 = line.point - self.origin;
        let a = u.dot(u);
        let b = u.dot(v);
        let c = v.dot(v);
        let d = u.dot(w0);
        let e = v.dot(w0);
        let denom = a * c - b * b;
        if denom.abs() < EPSILON {
            return None;
        }

        let ray_distance = (a * e - b * d) / denom;
        if ray_distance < 0.0 {
            return Some(u.dot(self.origin - line.point) / a);
        }
        Some((b * e - c * d) / denom)
    }
}

/// An infinite line through `point`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line3 {
    pub point: DVec3,
    /// Unit direction.
    pub direction: DVec3,
}

impl Line3 {
    /// Create a line, normalizing the direction.
    pub fn new(point: DVec3, direction: DVec3) -> Self {
        Self {
            point,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at the given signed distance from `point`.
    pub fn point_at(&self, distance: f64) -> DVec3 {
        self.point + self.direction * distance
    }

    /// Signed distance along the line of the orthogonal projection of `p`.
    pub fn distance_to_projected(&self, p: DVec3) -> f64 {
        (p - self.point).dot(self.direction)
    }

    /// Orthogonal projection of `p` onto the line.
    pub fn project_point(&self, p: DVec3) -> DVec3 {
        self.point_at(self.distance_to_projected(p))
    }
}

/// A plane in Hessian normal form: `normal · x = distance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane3 {
    /// Unit normal.
    pub normal: DVec3,
    pub distance: f64,
}

impl Plane3 {
    /// Create a plane containing `point` with the given normal.
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            distance: normal.dot(point),
        }
    }

    /// A point on the plane (the projection of the world origin).
    pub fn anchor(&self) -> DVec3 {
        self.normal * self.distance
    }

    /// Signed distance of `p` from the plane.
    pub fn point_distance(&self, p: DVec3) -> f64 {
        self.normal.dot(p) - self.distance
    }

    /// Orthogonal projection of `p` onto the plane.
    pub fn project_point(&self, p: DVec3) -> DVec3 {
        p - self.normal * self.point_distance(p)
    }

    /// Project a direction vector into the plane.
    pub fn project_vector(&self, v: DVec3) -> DVec3 {
        v - self.normal * self.normal.dot(v)
    }

    /// Distance along `ray` at which it hits the plane.
    ///
    /// `None` if the ray is parallel to the plane or the plane lies behind the
    /// ray origin.
    pub fn intersect_ray(&self, ray: &Ray3) -> Option<f64> {
        let denom = self.normal.dot(ray.direction);
        if denom.abs() < EPSILON {
            return None;
        }
        let t = (self.distance - self.normal.dot(ray.origin)) / denom;
        if t < -EPSILON {
            return None;
        }
        Some(t.max(0.0))
    }

    /// Index (0 = x, 1 = y, 2 = z) of the largest normal component.
    pub fn major_axis(&self) -> usize {
        let n = self.normal.abs();
        if n.x >= n.y && n.x >= n.z {
            0
        } else if n.y >= n.z {
            1
        } else {
            2
        }
    }

    /// Solve the plane equation for coordinate `axis`, keeping the other two
    /// coordinates of `p`.
    pub fn solve_for_axis(&self, p: DVec3, axis: usize) -> DVec3 {
        let n = self.normal;
        let mut result = p;
        let rest = (0..3)
            .filter(|&i| i != axis)
            .map(|i| n[i] * p[i])
            .sum::<f64>();
        result[axis] = (self.distance - rest) / n[axis];
        result
    }
}

/// Signed angle in radians from `from` to `to`, measured counter-clockwise
/// around `axis`. Both vectors are expected to lie in the plane orthogonal to
/// `axis`.
pub fn signed_angle(from: DVec3, to: DVec3, axis: DVec3) -> f64 {
    let sin = axis.dot(from.cross(to));
    let cos = from.dot(to);
    sin.atan2(cos)
}
