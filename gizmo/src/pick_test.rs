use uuid::Uuid;

use super::*;

fn origin() -> ScreenPoint {
    ScreenPoint::new(0.0, 0.0)
}

#[test]
fn empty_picker_misses() {
    let picker = QueuedPicker::new();
    assert_eq!(picker.pick_handle(origin()), None);
}

#[test]
fn armed_hits_are_consumed_in_order() {
    let picker = QueuedPicker::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    picker.arm_handle(a);
    picker.arm(PickHit { handle_id: b, position: Some(DVec3::X) });
    assert_eq!(picker.pending(), 2);

    assert_eq!(picker.pick_handle(origin()).map(|h| h.handle_id), Some(a));
    let second = picker.pick_handle(origin()).unwrap();
    assert_eq!(second.handle_id, b);
    assert_eq!(second.position, Some(DVec3::X));
    assert_eq!(picker.pick_handle(origin()), None);
}

#[test]
fn clear_drops_pending_hits() {
    let picker = QueuedPicker::new();
    picker.arm_handle(Uuid::new_v4());
    picker.clear();
    assert_eq!(picker.pending(), 0);
    assert_eq!(picker.pick_handle(origin()), None);
}

#[test]
fn hit_position_defaults_to_none_in_json() {
    let id = Uuid::new_v4();
    let hit: PickHit = serde_json::from_str(&format!(r#"{{"handle_id":"{id}"}}"#)).unwrap();
    assert_eq!(hit, PickHit { handle_id: id, position: None });
}
