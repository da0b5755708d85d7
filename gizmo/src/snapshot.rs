//! Serializable manipulation session state.
//!
//! A snapshot carries only what is needed to rebuild the registry and the
//! tracked points: ids, kinds, committed positions, axes, orientations and
//! accumulated rotations. Drag sessions are transient and never captured.

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::handle::{GroupId, HandleId, HandleInstance, HandleKind};
use crate::scene::NodeId;
use crate::tracked::TrackedPointId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleRecord {
    pub id: HandleId,
    pub kind: HandleKind,
    pub position: DVec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<DVec3>,
    pub orientation: DMat3,
}

impl From<&HandleInstance> for HandleRecord {
    fn from(h: &HandleInstance) -> Self {
        Self { id: h.id, kind: h.kind, position: h.position, axis: h.axis, orientation: h.orientation }
    }
}

impl HandleRecord {
    /// Rebuild the handle under `group_id`, with no provisional offset.
    #[must_use]
    pub fn into_instance(self, group_id: GroupId) -> HandleInstance {
        HandleInstance {
            id: self.id,
            kind: self.kind,
            position: self.position,
            axis: self.axis,
            orientation: self.orientation,
            group_id,
            offset: DVec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub node_ids: Vec<NodeId>,
    pub rotation: DMat3,
    pub handles: Vec<HandleRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPointRecord {
    pub id: TrackedPointId,
    pub original: DVec3,
    pub live: DVec3,
}

/// Everything needed to resume a manipulation session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub groups: Vec<GroupRecord>,
    #[serde(default)]
    pub tracked_points: Vec<TrackedPointRecord>,
    #[serde(default)]
    pub committed_translation: DVec3,
}

impl SessionSnapshot {
    /// # Errors
    ///
    /// Returns a serde error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// # Errors
    ///
    /// Returns a serde error if `json` is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
