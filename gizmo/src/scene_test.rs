use glam::DVec3;

use super::*;

const EPSILON: f64 = 1e-12;

#[tokio::test]
async fn add_node_is_readable() {
    let scene = MemoryScene::new();
    let local = DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0));
    let id = scene.add_node(None, local).await;
    assert_eq!(scene.local_transform(id).await.unwrap(), local);
    assert_eq!(scene.parent(id).await.unwrap(), None);
    assert_eq!(scene.len().await, 1);
    assert!(!scene.is_empty().await);
}

#[tokio::test]
async fn unknown_node_errors() {
    let scene = MemoryScene::new();
    let missing = Uuid::new_v4();
    assert!(matches!(scene.local_transform(missing).await, Err(SceneError::NodeNotFound(id)) if id == missing));
    assert!(matches!(scene.parent(missing).await, Err(SceneError::NodeNotFound(_))));
    assert!(matches!(scene.net_transform(missing).await, Err(SceneError::NodeNotFound(_))));
    assert!(scene.set_local_transform(missing, DMat4::IDENTITY).await.is_err());
}

#[tokio::test]
async fn set_local_transform_replaces_value() {
    let scene = MemoryScene::new();
    let id = scene.add_node(None, DMat4::IDENTITY).await;
    let next = DMat4::from_rotation_z(0.5);
    scene.set_local_transform(id, next).await.unwrap();
    assert_eq!(scene.local_transform(id).await.unwrap(), next);
}

#[tokio::test]
async fn net_transform_composes_ancestors() {
    let scene = MemoryScene::new();
    let root = scene
        .add_node(None, DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0)))
        .await;
    let mid = scene
        .add_node(Some(root), DMat4::from_scale(DVec3::splat(2.0)))
        .await;
    let leaf = scene
        .add_node(Some(mid), DMat4::from_translation(DVec3::new(1.0, 0.0, 0.0)))
        .await;

    let net = scene.net_transform(leaf).await.unwrap();
    // leaf origin: (1,0,0) scaled by 2 then shifted by 10 on x
    assert!(net.transform_point3(DVec3::ZERO).abs_diff_eq(DVec3::new(12.0, 0.0, 0.0), EPSILON));
}

#[tokio::test]
async fn net_transform_detects_cycles() {
    let scene = MemoryScene::new();
    let a = scene.add_node(None, DMat4::IDENTITY).await;
    let b = scene.add_node(Some(a), DMat4::IDENTITY).await;
    scene.set_parent(a, Some(b)).await.unwrap();
    assert!(matches!(scene.net_transform(a).await, Err(SceneError::HierarchyCycle(_))));
}

#[tokio::test]
async fn net_transform_reports_missing_parent() {
    let scene = MemoryScene::new();
    let ghost = Uuid::new_v4();
    let child = scene.add_node(Some(ghost), DMat4::IDENTITY).await;
    assert!(matches!(scene.net_transform(child).await, Err(SceneError::NodeNotFound(id)) if id == ghost));
}

#[tokio::test]
async fn node_ids_are_sorted() {
    let scene = MemoryScene::new();
    for _ in 0..5 {
        scene.add_node(None, DMat4::IDENTITY).await;
    }
    let ids = scene.node_ids().await;
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 5);
}

#[test]
fn error_codes_are_stable() {
    use crate::error::ErrorCode;
    assert_eq!(SceneError::NodeNotFound(Uuid::nil()).error_code(), "E_NODE_NOT_FOUND");
    assert_eq!(SceneError::HierarchyCycle(Uuid::nil()).error_code(), "E_HIERARCHY_CYCLE");
    let rejected = SceneError::WriteRejected { node: Uuid::nil(), reason: "locked".into() };
    assert_eq!(rejected.error_code(), "E_WRITE_REJECTED");
    assert!(rejected.to_string().contains("locked"));
}
