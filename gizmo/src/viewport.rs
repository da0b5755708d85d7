//! Viewport: screen points, unprojection and pointer rays.
//!
//! Screen coordinates are pixels with the origin at the top-left corner and
//! `y` growing downward. Depth is normalized device depth in `[0, 1]`, where
//! `0` is the near plane.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

use crate::math::Ray;

/// A pointer position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Maps screen positions back into the world.
pub trait Viewport: Send + Sync {
    /// World point under `screen` at normalized `depth`, or `None` if the
    /// viewport cannot unproject (zero size, singular camera).
    fn unproject(&self, screen: ScreenPoint, depth: f64) -> Option<DVec3>;

    /// Unit direction the camera looks along.
    fn view_direction(&self) -> DVec3;
}

/// Pointer ray through `screen`, sampled at `near_depth` and `mid_depth`.
#[must_use]
pub fn pointer_ray(viewport: &dyn Viewport, screen: ScreenPoint, near_depth: f64, mid_depth: f64) -> Option<Ray> {
    let near = viewport.unproject(screen, near_depth)?;
    let mid = viewport.unproject(screen, mid_depth)?;
    Ray::through(near, mid)
}

/// A fixed camera over a `width × height` pixel viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraViewport {
    inverse_view_projection: DMat4,
    view_direction: DVec3,
    width: f64,
    height: f64,
}

impl CameraViewport {
    /// Right-handed orthographic camera at `eye` looking at `target`.
    ///
    /// `half_width`/`half_height` are the world extents of the view volume.
    #[must_use]
    pub fn orthographic(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        half_width: f64,
        half_height: f64,
        depth_range: (f64, f64),
        size: (f64, f64),
    ) -> Self {
        let view = DMat4::look_at_rh(eye, target, up);
        let projection =
            DMat4::orthographic_rh(-half_width, half_width, -half_height, half_height, depth_range.0, depth_range.1);
        Self::from_matrices(view, projection, eye, target, size)
    }

    /// Right-handed perspective camera at `eye` looking at `target`.
    #[must_use]
    pub fn perspective(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y_radians: f64,
        depth_range: (f64, f64),
        size: (f64, f64),
    ) -> Self {
        let aspect = if size.1 > 0.0 { size.0 / size.1 } else { 1.0 };
        let view = DMat4::look_at_rh(eye, target, up);
        let projection = DMat4::perspective_rh(fov_y_radians, aspect, depth_range.0, depth_range.1);
        Self::from_matrices(view, projection, eye, target, size)
    }

    fn from_matrices(view: DMat4, projection: DMat4, eye: DVec3, target: DVec3, size: (f64, f64)) -> Self {
        Self {
            inverse_view_projection: (projection * view).inverse(),
            view_direction: (target - eye).normalize_or_zero(),
            width: size.0,
            height: size.1,
        }
    }

    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

impl Viewport for CameraViewport {
    fn unproject(&self, screen: ScreenPoint, depth: f64) -> Option<DVec3> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let ndc = DVec3::new(2.0 * screen.x / self.width - 1.0, 1.0 - 2.0 * screen.y / self.height, depth);
        let world = self.inverse_view_projection.project_point3(ndc);
        world.is_finite().then_some(world)
    }

    fn view_direction(&self) -> DVec3 {
        self.view_direction
    }
}
