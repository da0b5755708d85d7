//! Scene store: the external owner of node transforms and hierarchy.
//!
//! DESIGN
//! ======
//! The controller never holds node transforms of its own beyond a drag
//! session. It reads local and net transforms and the parent of each node
//! through [`SceneStore`], and writes new local transforms back through the
//! same trait. Writes are `async` and may complete in any order.
//!
//! [`MemoryScene`] is the in-process reference store used by tests and the
//! replay CLI.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;

use glam::DMat4;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::consts::MAX_HIERARCHY_DEPTH;

/// Unique identifier for a scene node.
pub type NodeId = Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("hierarchy cycle at node {0}")]
    HierarchyCycle(NodeId),
    #[error("write rejected for node {node}: {reason}")]
    WriteRejected { node: NodeId, reason: String },
}

impl crate::error::ErrorCode for SceneError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NodeNotFound(_) => "E_NODE_NOT_FOUND",
            Self::HierarchyCycle(_) => "E_HIERARCHY_CYCLE",
            Self::WriteRejected { .. } => "E_WRITE_REJECTED",
        }
    }
}

/// Async access to node transforms and hierarchy.
///
/// Callers must tolerate a hierarchy that changes between calls; each call
/// reports the value current at call time.
#[async_trait::async_trait]
pub trait SceneStore: Send + Sync {
    /// Local (parent-relative) transform of a node.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for unknown nodes.
    async fn local_transform(&self, node: NodeId) -> Result<DMat4, SceneError>;

    /// Replace a node's local transform.
    ///
    /// # Errors
    ///
    /// Returns a [`SceneError`] if the node is unknown or the write is refused.
    async fn set_local_transform(&self, node: NodeId, transform: DMat4) -> Result<(), SceneError>;

    /// Parent of a node; `None` for roots.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for unknown nodes.
    async fn parent(&self, node: NodeId) -> Result<Option<NodeId>, SceneError>;

    /// World transform: the node's local transform composed with every ancestor's.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for unknown nodes and `HierarchyCycle` for cyclic chains.
    async fn net_transform(&self, node: NodeId) -> Result<DMat4, SceneError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SceneNode {
    parent: Option<NodeId>,
    local: DMat4,
}

/// In-memory scene graph.
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: RwLock<HashMap<NodeId, SceneNode>>,
}

impl MemoryScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node.
    pub async fn insert(&self, node: NodeId, parent: Option<NodeId>, local: DMat4) {
        self.nodes.write().await.insert(node, SceneNode { parent, local });
    }

    /// Add a new node and return its id.
    pub async fn add_node(&self, parent: Option<NodeId>, local: DMat4) -> NodeId {
        let id = Uuid::new_v4();
        self.insert(id, parent, local).await;
        id
    }

    /// Re-parent a node, keeping its local transform.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `node` is unknown.
    pub async fn set_parent(&self, node: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        let mut nodes = self.nodes.write().await;
        let entry = nodes.get_mut(&node).ok_or(SceneError::NodeNotFound(node))?;
        entry.parent = parent;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }

    /// Every node id, sorted for stable output.
    pub async fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.read().await.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[async_trait::async_trait]
impl SceneStore for MemoryScene {
    async fn local_transform(&self, node: NodeId) -> Result<DMat4, SceneError> {
        let nodes = self.nodes.read().await;
        nodes
            .get(&node)
            .map(|n| n.local)
            .ok_or(SceneError::NodeNotFound(node))
    }

    async fn set_local_transform(&self, node: NodeId, transform: DMat4) -> Result<(), SceneError> {
        let mut nodes = self.nodes.write().await;
        let entry = nodes.get_mut(&node).ok_or(SceneError::NodeNotFound(node))?;
        entry.local = transform;
        Ok(())
    }

    async fn parent(&self, node: NodeId) -> Result<Option<NodeId>, SceneError> {
        let nodes = self.nodes.read().await;
        nodes
            .get(&node)
            .map(|n| n.parent)
            .ok_or(SceneError::NodeNotFound(node))
    }

    async fn net_transform(&self, node: NodeId) -> Result<DMat4, SceneError> {
        let nodes = self.nodes.read().await;
        let mut current = *nodes.get(&node).ok_or(SceneError::NodeNotFound(node))?;
        let mut net = current.local;
        let mut depth = 0;
        while let Some(parent_id) = current.parent {
            depth += 1;
            if depth > MAX_HIERARCHY_DEPTH {
                return Err(SceneError::HierarchyCycle(node));
            }
            current = *nodes
                .get(&parent_id)
                .ok_or(SceneError::NodeNotFound(parent_id))?;
            net = current.local * net;
        }
        Ok(net)
    }
}
