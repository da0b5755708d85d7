//! Geometry helpers shared by the registry and the controller.
//!
//! All math is done in `f64` glam types. Matrices follow glam's column-vector
//! convention: a point `p` is transformed as `m * p`, translation lives in
//! `w_axis`, and `a * b` applies `b` first.

#[cfg(test)]
#[path = "math_test.rs"]
mod math_test;

use glam::{DMat3, DMat4, DVec3};

use crate::consts::{PARALLEL_EPSILON, RAY_EPSILON, SINGULAR_EPSILON};

/// A half-line through world space, used for pointer rays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    /// Unit direction.
    pub direction: DVec3,
}

impl Ray {
    /// Build a ray starting at `from` and passing through `to`.
    ///
    /// Returns `None` when the two samples coincide.
    #[must_use]
    pub fn through(from: DVec3, to: DVec3) -> Option<Self> {
        let direction = (to - from).normalize_or_zero();
        if direction == DVec3::ZERO {
            return None;
        }
        Some(Self { origin: from, direction })
    }

    #[must_use]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

/// Build an orthonormal frame whose second column is `axis`.
///
/// The helper vector is `reference` when supplied and not parallel to `axis`;
/// otherwise +X, or +Y when +X is nearly parallel. Columns are
/// `[normalize(helper × n) | n | normalize(x × n)]`.
///
/// Returns `None` for a zero-length axis.
#[must_use]
pub fn orthonormal_basis(axis: DVec3, reference: Option<DVec3>) -> Option<DMat3> {
    let n = axis.normalize_or_zero();
    if n == DVec3::ZERO {
        return None;
    }
    let helper = reference
        .filter(|r| r.cross(n).length_squared() >= PARALLEL_EPSILON)
        .unwrap_or_else(|| canonical_helper(n));
    let x = helper.cross(n).normalize();
    let z = x.cross(n).normalize();
    Some(DMat3::from_cols(x, n, z))
}

fn canonical_helper(n: DVec3) -> DVec3 {
    if DVec3::X.cross(n).length_squared() < PARALLEL_EPSILON { DVec3::Y } else { DVec3::X }
}

/// Intersect `ray` with the plane through `point` with normal `normal`.
///
/// The ray is treated as a full line, so hits behind the origin are returned.
/// Returns `None` when the ray is parallel to the plane.
#[must_use]
pub fn intersect_plane(ray: &Ray, point: DVec3, normal: DVec3) -> Option<DVec3> {
    let n = normal.normalize_or_zero();
    let denom = n.dot(ray.direction);
    if denom.abs() < RAY_EPSILON {
        return None;
    }
    let t = (point - ray.origin).dot(n) / denom;
    Some(ray.at(t))
}

/// The point on the line `line_point + s * line_dir` closest to `ray`.
///
/// Returns `None` when the line is parallel to the ray or `line_dir` is zero.
#[must_use]
pub fn closest_point_on_line(ray: &Ray, line_point: DVec3, line_dir: DVec3) -> Option<DVec3> {
    let a = line_dir.normalize_or_zero();
    if a == DVec3::ZERO {
        return None;
    }
    let b = a.dot(ray.direction);
    let denom = 1.0 - b * b;
    if denom.abs() < RAY_EPSILON {
        return None;
    }
    let w0 = line_point - ray.origin;
    let s = (b * ray.direction.dot(w0) - a.dot(w0)) / denom;
    Some(line_point + a * s)
}

/// Angle in degrees from `from` to `to`, signed by the right-hand rule
/// around `normal`.
///
/// Returns `None` if either vector is zero.
#[must_use]
pub fn signed_angle_deg(from: DVec3, to: DVec3, normal: DVec3) -> Option<f64> {
    let v1 = from.normalize_or_zero();
    let v2 = to.normalize_or_zero();
    if v1 == DVec3::ZERO || v2 == DVec3::ZERO {
        return None;
    }
    let angle = v1.dot(v2).clamp(-1.0, 1.0).acos().to_degrees();
    if v1.cross(v2).dot(normal) < 0.0 { Some(-angle) } else { Some(angle) }
}

/// Rotation by `angle_rad` about the line through `pivot` along `axis`.
///
/// A zero axis or zero angle yields the exact identity.
#[must_use]
pub fn rotation_about(pivot: DVec3, axis: DVec3, angle_rad: f64) -> DMat4 {
    let axis = axis.normalize_or_zero();
    if axis == DVec3::ZERO || angle_rad.abs() < f64::EPSILON {
        return DMat4::IDENTITY;
    }
    DMat4::from_translation(pivot) * DMat4::from_axis_angle(axis, angle_rad) * DMat4::from_translation(-pivot)
}

/// Rotate `point` about `pivot` by the linear map `rotation`.
#[must_use]
pub fn rotate_point(point: DVec3, pivot: DVec3, rotation: &DMat3) -> DVec3 {
    pivot + *rotation * (point - pivot)
}

/// Whether the 3×3 block of `m` flips handedness.
#[must_use]
pub fn has_reflection(m: &DMat4) -> bool {
    DMat3::from_mat4(*m).determinant() < 0.0
}

/// Inverse of `m`, or `None` when `m` is singular.
#[must_use]
pub fn try_inverse(m: &DMat4) -> Option<DMat4> {
    if m.determinant().abs() < SINGULAR_EPSILON {
        return None;
    }
    Some(m.inverse())
}
