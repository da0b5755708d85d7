#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn vec_approx_eq(a: DVec3, b: DVec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn down_ray(x: f64, y: f64) -> Ray {
    Ray { origin: DVec3::new(x, y, 10.0), direction: DVec3::NEG_Z }
}

// --- Ray ---

#[test]
fn ray_through_normalizes_direction() {
    let ray = Ray::through(DVec3::ZERO, DVec3::new(0.0, 0.0, -4.0)).unwrap();
    assert!(vec_approx_eq(ray.direction, DVec3::NEG_Z));
    assert!(vec_approx_eq(ray.at(2.0), DVec3::new(0.0, 0.0, -2.0)));
}

#[test]
fn ray_through_coincident_samples_is_none() {
    let p = DVec3::new(1.0, 2.0, 3.0);
    assert!(Ray::through(p, p).is_none());
}

// --- orthonormal_basis ---

#[test]
fn basis_z_axis_uses_x_helper() {
    let m = orthonormal_basis(DVec3::Z, None).unwrap();
    assert!(vec_approx_eq(m.x_axis, DVec3::NEG_Y));
    assert!(vec_approx_eq(m.y_axis, DVec3::Z));
    assert!(vec_approx_eq(m.z_axis, DVec3::NEG_X));
}

#[test]
fn basis_x_axis_falls_back_to_y_helper() {
    let m = orthonormal_basis(DVec3::X, None).unwrap();
    assert!(vec_approx_eq(m.y_axis, DVec3::X));
    // helper is +Y: x = normalize(Y × X) = -Z
    assert!(vec_approx_eq(m.x_axis, DVec3::NEG_Z));
}

#[test]
fn basis_is_orthonormal_and_right_handed() {
    for axis in [DVec3::new(1.0, 2.0, 3.0), DVec3::new(-0.3, 0.1, 0.0), DVec3::new(0.0, -5.0, 0.0)] {
        let m = orthonormal_basis(axis, None).unwrap();
        assert!((m.determinant() - 1.0).abs() < EPSILON);
        assert!((m * m.transpose()).abs_diff_eq(DMat3::IDENTITY, EPSILON));
        assert!(vec_approx_eq(m.y_axis, axis.normalize()));
    }
}

#[test]
fn basis_honors_reference_vector() {
    let m = orthonormal_basis(DVec3::Z, Some(DVec3::Y)).unwrap();
    // x = normalize(Y × Z) = +X
    assert!(vec_approx_eq(m.x_axis, DVec3::X));
}

#[test]
fn basis_ignores_parallel_reference() {
    let with_ref = orthonormal_basis(DVec3::Z, Some(DVec3::new(0.0, 0.0, 3.0))).unwrap();
    let without = orthonormal_basis(DVec3::Z, None).unwrap();
    assert!(with_ref.abs_diff_eq(without, EPSILON));
}

#[test]
fn basis_zero_axis_is_none() {
    assert!(orthonormal_basis(DVec3::ZERO, None).is_none());
}

// --- intersect_plane ---

#[test]
fn plane_hit_straight_down() {
    let hit = intersect_plane(&down_ray(3.0, -2.0), DVec3::ZERO, DVec3::Z).unwrap();
    assert!(vec_approx_eq(hit, DVec3::new(3.0, -2.0, 0.0)));
}

#[test]
fn plane_hit_offset_plane() {
    let hit = intersect_plane(&down_ray(1.0, 1.0), DVec3::new(0.0, 0.0, 4.0), DVec3::NEG_Z).unwrap();
    assert!(vec_approx_eq(hit, DVec3::new(1.0, 1.0, 4.0)));
}

#[test]
fn plane_parallel_is_none() {
    assert!(intersect_plane(&down_ray(0.0, 0.0), DVec3::ZERO, DVec3::X).is_none());
}

#[test]
fn plane_behind_origin_still_hits() {
    let hit = intersect_plane(&down_ray(0.0, 0.0), DVec3::new(0.0, 0.0, 20.0), DVec3::Z).unwrap();
    assert!(vec_approx_eq(hit, DVec3::new(0.0, 0.0, 20.0)));
}

// --- closest_point_on_line ---

#[test]
fn line_closest_point_on_x_axis() {
    let p = closest_point_on_line(&down_ray(5.0, 3.0), DVec3::ZERO, DVec3::X).unwrap();
    assert!(vec_approx_eq(p, DVec3::new(5.0, 0.0, 0.0)));
}

#[test]
fn line_closest_point_with_unnormalized_direction() {
    let p = closest_point_on_line(&down_ray(-2.0, 7.0), DVec3::new(0.0, 0.0, 1.0), DVec3::new(0.0, 4.0, 0.0)).unwrap();
    assert!(vec_approx_eq(p, DVec3::new(0.0, 7.0, 1.0)));
}

#[test]
fn line_closest_point_oblique_ray() {
    let ray = Ray::through(DVec3::new(0.0, 0.0, 10.0), DVec3::new(10.0, 0.0, 0.0)).unwrap();
    let p = closest_point_on_line(&ray, DVec3::ZERO, DVec3::X).unwrap();
    assert!(vec_approx_eq(p, DVec3::new(10.0, 0.0, 0.0)));
}

#[test]
fn line_parallel_to_ray_is_none() {
    assert!(closest_point_on_line(&down_ray(0.0, 0.0), DVec3::ZERO, DVec3::Z).is_none());
}

#[test]
fn line_zero_direction_is_none() {
    assert!(closest_point_on_line(&down_ray(0.0, 0.0), DVec3::ZERO, DVec3::ZERO).is_none());
}

// --- signed_angle_deg ---

#[test]
fn signed_angle_counter_clockwise_is_positive() {
    let a = signed_angle_deg(DVec3::X, DVec3::Y, DVec3::Z).unwrap();
    assert!((a - 90.0).abs() < EPSILON);
}

#[test]
fn signed_angle_clockwise_is_negative() {
    let a = signed_angle_deg(DVec3::X, DVec3::NEG_Y, DVec3::Z).unwrap();
    assert!((a + 90.0).abs() < EPSILON);
}

#[test]
fn signed_angle_flips_with_normal() {
    let a = signed_angle_deg(DVec3::X, DVec3::Y, DVec3::NEG_Z).unwrap();
    assert!((a + 90.0).abs() < EPSILON);
}

#[test]
fn signed_angle_ignores_magnitude() {
    let a = signed_angle_deg(DVec3::new(3.0, 0.0, 0.0), DVec3::new(2.0, 2.0, 0.0), DVec3::Z).unwrap();
    assert!((a - 45.0).abs() < EPSILON);
}

#[test]
fn signed_angle_zero_vector_is_none() {
    assert!(signed_angle_deg(DVec3::ZERO, DVec3::Y, DVec3::Z).is_none());
}

// --- rotation_about / rotate_point ---

#[test]
fn rotation_about_zero_angle_is_exact_identity() {
    assert_eq!(rotation_about(DVec3::new(4.0, 5.0, 6.0), DVec3::Z, 0.0), DMat4::IDENTITY);
}

#[test]
fn rotation_about_pivot_keeps_pivot_fixed() {
    let pivot = DVec3::new(2.0, 1.0, 0.0);
    let m = rotation_about(pivot, DVec3::Z, std::f64::consts::FRAC_PI_2);
    assert!(vec_approx_eq(m.transform_point3(pivot), pivot));
    assert!(vec_approx_eq(m.transform_point3(DVec3::new(3.0, 1.0, 0.0)), DVec3::new(2.0, 2.0, 0.0)));
}

#[test]
fn rotate_point_matches_rotation_about() {
    let pivot = DVec3::new(-1.0, 0.5, 2.0);
    let axis = DVec3::new(1.0, 1.0, 0.0).normalize();
    let angle = 0.7;
    let p = DVec3::new(3.0, -2.0, 1.0);
    let by_mat4 = rotation_about(pivot, axis, angle).transform_point3(p);
    let by_mat3 = rotate_point(p, pivot, &DMat3::from_axis_angle(axis, angle));
    assert!(vec_approx_eq(by_mat4, by_mat3));
}

// --- has_reflection / try_inverse ---

#[test]
fn mirror_has_reflection() {
    assert!(has_reflection(&DMat4::from_scale(DVec3::new(-1.0, 1.0, 1.0))));
    assert!(!has_reflection(&DMat4::from_scale(DVec3::new(-1.0, -1.0, 1.0))));
    assert!(!has_reflection(&DMat4::IDENTITY));
}

#[test]
fn singular_matrix_has_no_inverse() {
    assert!(try_inverse(&DMat4::from_scale(DVec3::new(1.0, 0.0, 1.0))).is_none());
}

#[test]
fn inverse_round_trips() {
    let m = DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0)) * DMat4::from_rotation_z(0.3);
    let inv = try_inverse(&m).unwrap();
    assert!((m * inv).abs_diff_eq(DMat4::IDENTITY, EPSILON));
}
