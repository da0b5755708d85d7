use super::*;

const EPSILON: f64 = 1e-12;

/// Fails to compile when a kind is added without deciding its manipulation.
fn describe(kind: HandleKind) -> &'static str {
    match kind {
        HandleKind::AxisTranslate => "axis",
        HandleKind::PlaneTranslate => "plane",
        HandleKind::ViewPlaneTranslate => "view-plane",
        HandleKind::Rotate => "rotate",
    }
}

#[test]
fn all_kinds_are_listed_once() {
    let names: Vec<&str> = HandleKind::ALL.iter().map(|k| describe(*k)).collect();
    assert_eq!(names, vec!["axis", "plane", "view-plane", "rotate"]);
}

#[test]
fn manipulation_kind_per_handle_kind() {
    assert_eq!(HandleKind::AxisTranslate.manipulation(), ManipulationKind::Translate);
    assert_eq!(HandleKind::PlaneTranslate.manipulation(), ManipulationKind::Translate);
    assert_eq!(HandleKind::ViewPlaneTranslate.manipulation(), ManipulationKind::Translate);
    assert_eq!(HandleKind::Rotate.manipulation(), ManipulationKind::Rotate);
}

#[test]
fn only_view_plane_is_axis_free() {
    for kind in HandleKind::ALL {
        assert_eq!(kind.requires_axis(), kind != HandleKind::ViewPlaneTranslate);
    }
}

#[test]
fn kind_serde_is_snake_case() {
    let json = serde_json::to_string(&HandleKind::ViewPlaneTranslate).unwrap();
    assert_eq!(json, "\"view_plane_translate\"");
    let back: HandleKind = serde_json::from_str("\"axis_translate\"").unwrap();
    assert_eq!(back, HandleKind::AxisTranslate);
}

#[test]
fn new_axis_handle_normalizes_axis() {
    let group = Uuid::new_v4();
    let h = HandleInstance::new(HandleKind::AxisTranslate, DVec3::ONE, Some(DVec3::new(0.0, 0.0, 2.0)), None, group)
        .unwrap();
    assert!(h.axis.unwrap().abs_diff_eq(DVec3::Z, EPSILON));
    assert!(h.orientation.y_axis.abs_diff_eq(DVec3::Z, EPSILON));
    assert_eq!(h.group_id, group);
    assert_eq!(h.offset, DVec3::ZERO);
}

#[test]
fn new_view_plane_handle_has_identity_frame() {
    let h = HandleInstance::new(HandleKind::ViewPlaneTranslate, DVec3::ZERO, Some(DVec3::X), None, Uuid::new_v4())
        .unwrap();
    assert!(h.axis.is_none());
    assert_eq!(h.orientation, DMat3::IDENTITY);
}

#[test]
fn new_rotate_handle_without_axis_errors() {
    let err = HandleInstance::new(HandleKind::Rotate, DVec3::ZERO, None, None, Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, HandleError::MissingAxis { kind: HandleKind::Rotate }));
}

#[test]
fn new_plane_handle_with_zero_axis_errors() {
    let err = HandleInstance::new(HandleKind::PlaneTranslate, DVec3::ZERO, Some(DVec3::ZERO), None, Uuid::new_v4())
        .unwrap_err();
    assert!(err.to_string().contains("non-zero axis"));
}

#[test]
fn world_axis_follows_group_rotation() {
    let h = HandleInstance::new(HandleKind::AxisTranslate, DVec3::ZERO, Some(DVec3::X), None, Uuid::new_v4())
        .unwrap();
    let quarter_turn = DMat3::from_rotation_z(std::f64::consts::FRAC_PI_2);
    assert!(h.world_axis(&quarter_turn).unwrap().abs_diff_eq(DVec3::Y, 1e-9));
}

#[test]
fn default_layout_has_ten_handles() {
    let layout = default_handle_layout();
    assert_eq!(layout.len(), 10);
    let count = |kind| layout.iter().filter(|(k, _)| *k == kind).count();
    assert_eq!(count(HandleKind::ViewPlaneTranslate), 1);
    assert_eq!(count(HandleKind::AxisTranslate), 3);
    assert_eq!(count(HandleKind::PlaneTranslate), 3);
    assert_eq!(count(HandleKind::Rotate), 3);
}
