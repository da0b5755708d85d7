use std::f64::consts::FRAC_PI_2;

use super::*;

const EPSILON: f64 = 1e-9;

/// 200×200 px top-down view of `[-10, 10]²`, eye on +Z.
fn top_down() -> CameraViewport {
    CameraViewport::orthographic(DVec3::new(0.0, 0.0, 10.0), DVec3::ZERO, DVec3::Y, 10.0, 10.0, (0.1, 100.0), (200.0, 200.0))
}

// =============================================================
// Orthographic
// =============================================================

#[test]
fn center_unprojects_onto_view_axis() {
    let vp = top_down();
    let near = vp.unproject(ScreenPoint::new(100.0, 100.0), 0.0).unwrap();
    assert!(near.abs_diff_eq(DVec3::new(0.0, 0.0, 9.9), EPSILON));
}

#[test]
fn screen_y_grows_downward() {
    let vp = top_down();
    let p = vp.unproject(ScreenPoint::new(150.0, 50.0), 0.5).unwrap();
    assert!((p.x - 5.0).abs() < EPSILON);
    assert!((p.y - 5.0).abs() < EPSILON);
}

#[test]
fn depth_moves_along_view_direction() {
    let vp = top_down();
    let a = vp.unproject(ScreenPoint::new(30.0, 170.0), 0.0).unwrap();
    let b = vp.unproject(ScreenPoint::new(30.0, 170.0), 0.5).unwrap();
    let dir = (b - a).normalize();
    assert!(dir.abs_diff_eq(vp.view_direction(), EPSILON));
    assert!(vp.view_direction().abs_diff_eq(DVec3::NEG_Z, EPSILON));
}

#[test]
fn zero_size_viewport_cannot_unproject() {
    let vp = CameraViewport::orthographic(DVec3::Z, DVec3::ZERO, DVec3::Y, 1.0, 1.0, (0.1, 10.0), (0.0, 0.0));
    assert!(vp.unproject(ScreenPoint::new(0.0, 0.0), 0.0).is_none());
    assert!(pointer_ray(&vp, ScreenPoint::new(0.0, 0.0), 0.0, 0.5).is_none());
}

// =============================================================
// Perspective
// =============================================================

#[test]
fn perspective_rays_diverge_from_eye() {
    let eye = DVec3::new(0.0, 0.0, 10.0);
    let vp = CameraViewport::perspective(eye, DVec3::ZERO, DVec3::Y, FRAC_PI_2, (1.0, 100.0), (200.0, 200.0));

    let center = pointer_ray(&vp, ScreenPoint::new(100.0, 100.0), 0.0, 0.5).unwrap();
    assert!(center.direction.abs_diff_eq(DVec3::NEG_Z, EPSILON));
    assert!(center.origin.abs_diff_eq(DVec3::new(0.0, 0.0, 9.0), EPSILON));

    // right edge at the near plane: x = near * tan(45°)
    let edge = vp.unproject(ScreenPoint::new(200.0, 100.0), 0.0).unwrap();
    assert!(edge.abs_diff_eq(DVec3::new(1.0, 0.0, 9.0), EPSILON));

    let edge_ray = pointer_ray(&vp, ScreenPoint::new(200.0, 100.0), 0.0, 0.5).unwrap();
    // extended back, the ray passes through the eye
    let back = edge_ray.at(-(edge_ray.origin - eye).length());
    assert!(back.abs_diff_eq(eye, 1e-6));
}

// =============================================================
// pointer_ray
// =============================================================

#[test]
fn pointer_ray_is_unit_and_starts_at_near_sample() {
    let vp = top_down();
    let ray = pointer_ray(&vp, ScreenPoint::new(120.0, 80.0), 0.0, 0.5).unwrap();
    assert!((ray.direction.length() - 1.0).abs() < EPSILON);
    assert!(ray.origin.abs_diff_eq(DVec3::new(2.0, 2.0, 9.9), EPSILON));
}

#[test]
fn screen_point_round_trips_through_serde() {
    let p = ScreenPoint::new(1.5, -2.0);
    let json = serde_json::to_string(&p).unwrap();
    assert_eq!(json, r#"{"x":1.5,"y":-2.0}"#);
    assert_eq!(serde_json::from_str::<ScreenPoint>(&json).unwrap(), p);
}
