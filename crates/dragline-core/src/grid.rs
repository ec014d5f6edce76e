//! Grid snapping for drag positions and angles.

use crate::math::{EPSILON, Line3, Plane3};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Default grid spacing in world units.
pub const DEFAULT_GRID_SIZE: f64 = 16.0;

/// Default angle snap increment in degrees.
pub const DEFAULT_SNAP_ANGLE_DEGREES: f64 = 15.0;

/// Grid settings as they appear in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Grid spacing in world units.
    pub size: f64,
    /// Angle snap increment in degrees.
    pub snap_angle_degrees: f64,
    /// Whether snapping is enabled at all.
    pub snap: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_SIZE,
            snap_angle_degrees: DEFAULT_SNAP_ANGLE_DEGREES,
            snap: true,
        }
    }
}

/// A regular cubic lattice plus an angular increment.
///
/// When snapping is disabled every snap function returns its input unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    size: f64,
    snap_angle: f64,
    snap: bool,
}

impl Default for Grid {
    fn default() -> Self {
        Self::from_settings(&GridSettings::default())
    }
}

impl Grid {
    /// Create a grid with the given spacing and the default angle increment.
    pub fn new(size: f64) -> Self {
        assert!(size > 0.0, "grid size must be positive");
        Self {
            size,
            snap_angle: DEFAULT_SNAP_ANGLE_DEGREES.to_radians(),
            snap: true,
        }
    }

    pub fn from_settings(settings: &GridSettings) -> Self {
        Self::new(settings.size)
            .with_snap_angle_degrees(settings.snap_angle_degrees)
            .with_snap(settings.snap)
    }

    /// Set the angle increment in degrees.
    pub fn with_snap_angle_degrees(mut self, degrees: f64) -> Self {
        assert!(degrees > 0.0, "snap angle must be positive");
        self.snap_angle = degrees.to_radians();
        self
    }

    pub fn with_snap(mut self, snap: bool) -> Self {
        self.snap = snap;
        self
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    /// Angle increment in radians.
    pub fn snap_angle(&self) -> f64 {
        self.snap_angle
    }

    pub fn snaps(&self) -> bool {
        self.snap
    }

    pub fn set_snap(&mut self, snap: bool) {
        self.snap = snap;
    }

    /// Snap a scalar to the nearest multiple of the grid size.
    pub fn snap_scalar(&self, value: f64) -> f64 {
        if !self.snap {
            return value;
        }
        (value / self.size).round() * self.size
    }

    /// Snap every coordinate of `p` to the grid.
    pub fn snap(&self, p: DVec3) -> DVec3 {
        DVec3::new(
            self.snap_scalar(p.x),
            self.snap_scalar(p.y),
            self.snap_scalar(p.z),
        )
    }

    /// Snap an angle (radians) to the nearest multiple of the angle increment.
    pub fn snap_to_angle(&self, angle: f64) -> f64 {
        snap_angle(angle, self.snap_angle, self.snap)
    }

    /// Snap `p` onto `plane`.
    ///
    /// The two coordinates that are not dominated by the plane normal are
    /// snapped; the third is recomputed so the result lies on the plane.
    pub fn snap_on_plane(&self, p: DVec3, plane: &Plane3) -> DVec3 {
        let axis = plane.major_axis();
        let mut snapped = self.snap(p);
        snapped[axis] = p[axis];
        plane.solve_for_axis(snapped, axis)
    }

    /// Snap `p` to the closest point on `line` at which at least one
    /// coordinate lies on the grid.
    pub fn snap_on_line(&self, p: DVec3, line: &Line3) -> DVec3 {
        let projected = line.distance_to_projected(p);
        if !self.snap {
            return line.point_at(projected);
        }

        let mut best: Option<f64> = None;
        for axis in 0..3 {
            let dir = line.direction[axis];
            if dir.abs() < EPSILON {
                continue;
            }
            let coord = line.point[axis] + projected * dir;
            let distance = (self.snap_scalar(coord) - line.point[axis]) / dir;
            best = match best {
                Some(b) if (b - projected).abs() <= (distance - projected).abs() => Some(b),
                _ => Some(distance),
            };
        }
        line.point_at(best.unwrap_or(projected))
    }

    /// Snap `p` to the point on `line` whose distance from the projection of
    /// `origin` is a multiple of the grid size.
    pub fn snap_along_line(&self, origin: DVec3, p: DVec3, line: &Line3) -> DVec3 {
        let start = line.distance_to_projected(origin);
        let delta = line.distance_to_projected(p) - start;
        line.point_at(start + self.snap_scalar(delta))
    }
}

/// Snap an angle (radians) to the nearest multiple of `increment`.
pub fn snap_angle(angle: f64, increment: f64, enabled: bool) -> f64 {
    if !enabled {
        return angle;
    }
    (angle / increment).round() * increment
}
