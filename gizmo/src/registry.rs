//! Group registry: the handle/group arena and hierarchical handle fan-out.
//!
//! DESIGN
//! ======
//! One aggregate owns every group and every handle. Groups map to their owned
//! node ids, their accumulated rotation and the ids of their handles; handles
//! live in a separate arena keyed by id and point back to their group by id
//! only. Removing a group removes its handle records in the same call, so no
//! handle can outlive its group.
//!
//! The registry has no knowledge of pointer input. It receives a
//! [`HandleDelta`] and repositions the visuals of the active group and of its
//! child groups through the [`HandleOverlay`].
//!
//! Node membership is exclusive: assigning a node to a group moves it out of
//! whichever group held it before.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::HashMap;
use std::sync::Arc;

use glam::{DMat3, DVec3};
use tracing::debug;

use crate::handle::{GroupId, HandleError, HandleId, HandleInstance, HandleKind, HandlePlacement, default_handle_layout};
use crate::math::rotate_point;
use crate::overlay::HandleOverlay;
use crate::scene::NodeId;
use crate::snapshot::{GroupRecord, HandleRecord};

/// A named set of scene nodes that move together under one set of handles.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Owned nodes, in insertion order, without duplicates.
    pub node_ids: Vec<NodeId>,
    /// Rotation accumulated over all committed drags.
    pub rotation: DMat3,
    pub handle_ids: Vec<HandleId>,
}

impl Default for Group {
    fn default() -> Self {
        Self { node_ids: Vec::new(), rotation: DMat3::IDENTITY, handle_ids: Vec::new() }
    }
}

/// A delta to fan out across handle visuals.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleDelta {
    /// World translation since drag start.
    pub translation: DVec3,
    /// World rotation since drag start.
    pub rotation: DMat3,
    /// Position of the active handle; child-group handles orbit it.
    pub pivot: DVec3,
    /// Bake the result into positions and group rotations.
    pub finalize: bool,
    pub active_group: GroupId,
    pub child_groups: Vec<GroupId>,
}

/// Arena of groups and handles.
pub struct GroupRegistry {
    groups: HashMap<GroupId, Group>,
    /// Group ids in creation order.
    order: Vec<GroupId>,
    handles: HashMap<HandleId, HandleInstance>,
    in_progress_offset: DVec3,
    overlay: Arc<dyn HandleOverlay>,
}

impl GroupRegistry {
    #[must_use]
    pub fn new(overlay: Arc<dyn HandleOverlay>) -> Self {
        Self { groups: HashMap::new(), order: Vec::new(), handles: HashMap::new(), in_progress_offset: DVec3::ZERO, overlay }
    }

    // --- Groups ---

    /// Return the group, creating an empty one if it does not exist yet.
    pub fn ensure_group(&mut self, group_id: GroupId) -> &mut Group {
        if !self.groups.contains_key(&group_id) {
            self.order.push(group_id);
        }
        self.groups.entry(group_id).or_default()
    }

    #[must_use]
    pub fn group(&self, group_id: &GroupId) -> Option<&Group> {
        self.groups.get(group_id)
    }

    /// Group ids in creation order.
    #[must_use]
    pub fn group_ids(&self) -> &[GroupId] {
        &self.order
    }

    /// Nodes owned by a group. Unknown groups own nothing.
    #[must_use]
    pub fn node_ids(&self, group_id: &GroupId) -> Vec<NodeId> {
        self.group(group_id)
            .map(|g| g.node_ids.clone())
            .unwrap_or_default()
    }

    /// Replace a group's node list, creating the group if needed.
    ///
    /// Duplicates are dropped keeping the first occurrence. Nodes owned by
    /// other groups are moved into this one.
    pub fn set_node_ids(&mut self, group_id: GroupId, node_ids: Vec<NodeId>) {
        let mut unique: Vec<NodeId> = Vec::with_capacity(node_ids.len());
        for id in node_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        for (other_id, other) in &mut self.groups {
            if *other_id == group_id {
                continue;
            }
            let before = other.node_ids.len();
            other.node_ids.retain(|n| !unique.contains(n));
            if other.node_ids.len() != before {
                debug!(from = %other_id, to = %group_id, moved = before - other.node_ids.len(), "nodes moved between groups");
            }
        }

        self.ensure_group(group_id).node_ids = unique;
    }

    /// The group that owns `node_id`, if any.
    #[must_use]
    pub fn group_of(&self, node_id: &NodeId) -> Option<GroupId> {
        self.order
            .iter()
            .find(|gid| self.group(gid).is_some_and(|g| g.node_ids.contains(node_id)))
            .copied()
    }

    /// Accumulated rotation of a group; identity if never rotated or unknown.
    #[must_use]
    pub fn group_rotation(&self, group_id: &GroupId) -> DMat3 {
        self.group(group_id)
            .map_or(DMat3::IDENTITY, |g| g.rotation)
    }

    // --- Handles ---

    /// Add a handle to a group, creating the group if needed.
    ///
    /// # Errors
    ///
    /// Returns `MissingAxis` if `kind` needs an axis and none (or zero) is given.
    pub fn add_handle(
        &mut self,
        kind: HandleKind,
        position: DVec3,
        axis: Option<DVec3>,
        reference: Option<DVec3>,
        group_id: GroupId,
    ) -> Result<HandleId, HandleError> {
        let handle = HandleInstance::new(kind, position, axis, reference, group_id)?;
        let id = handle.id;
        let group = self.ensure_group(group_id);
        group.handle_ids.push(id);
        let placement = handle.placement(position, group.rotation * handle.orientation);
        self.handles.insert(id, handle);

        self.overlay.place(placement);
        self.overlay.set_visible(true);
        debug!(%id, %group_id, ?kind, "handle added");
        Ok(id)
    }

    /// Add the ten-handle default set at `position`.
    ///
    /// # Errors
    ///
    /// Propagates `add_handle` errors; the default layout never produces one.
    pub fn add_default_handle_set(&mut self, position: DVec3, group_id: GroupId) -> Result<Vec<HandleId>, HandleError> {
        default_handle_layout()
            .into_iter()
            .map(|(kind, axis)| self.add_handle(kind, position, axis, None, group_id))
            .collect()
    }

    #[must_use]
    pub fn handle(&self, handle_id: &HandleId) -> Option<&HandleInstance> {
        self.handles.get(handle_id)
    }

    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Remove handles. `None` clears every group and hides the overlay;
    /// `Some(group)` removes only that group and its handles.
    ///
    /// Returns the ids of the removed handles.
    pub fn remove_handles(&mut self, group_id: Option<GroupId>) -> Vec<HandleId> {
        let Some(group_id) = group_id else {
            let removed: Vec<HandleId> = self.handles.keys().copied().collect();
            for id in &removed {
                self.overlay.remove(*id);
            }
            self.groups.clear();
            self.order.clear();
            self.handles.clear();
            self.in_progress_offset = DVec3::ZERO;
            self.overlay.set_visible(false);
            debug!(count = removed.len(), "all handles removed");
            return removed;
        };

        let Some(group) = self.groups.remove(&group_id) else {
            return Vec::new();
        };
        self.order.retain(|g| *g != group_id);
        for id in &group.handle_ids {
            self.handles.remove(id);
            self.overlay.remove(*id);
        }
        debug!(%group_id, count = group.handle_ids.len(), "group handles removed");
        group.handle_ids
    }

    // --- Fan-out ---

    /// Reposition the handles of the active group and its child groups.
    ///
    /// Active-group handles move by `translation`. Child-group handles orbit
    /// `pivot` by `rotation` and then move by `translation`. Every affected
    /// handle is oriented by `rotation * group_rotation * orientation`.
    ///
    /// With `finalize`, positions are baked, offsets reset and each affected
    /// group's rotation becomes `rotation * group_rotation`. Otherwise the
    /// change is provisional. Placements are issued to the overlay without
    /// waiting and returned.
    pub fn apply_delta(&mut self, delta: &HandleDelta) -> Vec<HandlePlacement> {
        let mut affected = vec![delta.active_group];
        for gid in &delta.child_groups {
            if !affected.contains(gid) {
                affected.push(*gid);
            }
        }

        let mut placements = Vec::new();
        for gid in &affected {
            let Some(group) = self.groups.get_mut(gid) else {
                continue;
            };
            let composed = delta.rotation * group.rotation;
            let is_child = *gid != delta.active_group;

            for hid in &group.handle_ids {
                let Some(handle) = self.handles.get_mut(hid) else {
                    continue;
                };
                let position = if is_child {
                    rotate_point(handle.position, delta.pivot, &delta.rotation) + delta.translation
                } else {
                    handle.position + delta.translation
                };
                let placement = handle.placement(position, composed * handle.orientation);
                if delta.finalize {
                    handle.position = position;
                    handle.offset = DVec3::ZERO;
                } else {
                    handle.offset = position - handle.position;
                }
                self.overlay.place(placement);
                placements.push(placement);
            }

            if delta.finalize {
                group.rotation = composed;
            }
        }

        self.in_progress_offset = delta.translation;
        placements
    }

    /// Put the handles of `groups` back at their committed placement and
    /// discard any provisional offset.
    pub fn revert_provisional(&mut self, groups: &[GroupId]) -> Vec<HandlePlacement> {
        let mut placements = Vec::new();
        for gid in groups {
            let Some(group) = self.groups.get(gid) else {
                continue;
            };
            for hid in &group.handle_ids {
                let Some(handle) = self.handles.get_mut(hid) else {
                    continue;
                };
                handle.offset = DVec3::ZERO;
                let placement = handle.placement(handle.position, group.rotation * handle.orientation);
                self.overlay.place(placement);
                placements.push(placement);
            }
        }
        self.in_progress_offset = DVec3::ZERO;
        placements
    }

    /// Translation applied since the last reset.
    #[must_use]
    pub fn in_progress_offset(&self) -> DVec3 {
        self.in_progress_offset
    }

    pub fn reset_in_progress_offset(&mut self) {
        self.in_progress_offset = DVec3::ZERO;
    }

    // --- Snapshots ---

    /// Serializable view of every group, in creation order.
    #[must_use]
    pub fn records(&self) -> Vec<GroupRecord> {
        self.order
            .iter()
            .filter_map(|gid| {
                let group = self.groups.get(gid)?;
                let handles = group
                    .handle_ids
                    .iter()
                    .filter_map(|hid| self.handles.get(hid).map(HandleRecord::from))
                    .collect();
                Some(GroupRecord { id: *gid, node_ids: group.node_ids.clone(), rotation: group.rotation, handles })
            })
            .collect()
    }

    /// Replace all state with `records` and re-place every handle visual.
    pub fn restore(&mut self, records: Vec<GroupRecord>) {
        self.groups.clear();
        self.order.clear();
        self.handles.clear();
        self.in_progress_offset = DVec3::ZERO;

        for record in records {
            let mut group = Group { node_ids: record.node_ids, rotation: record.rotation, handle_ids: Vec::new() };
            for h in record.handles {
                let handle = h.into_instance(record.id);
                self.overlay.place(handle.placement(handle.position, group.rotation * handle.orientation));
                group.handle_ids.push(handle.id);
                self.handles.insert(handle.id, handle);
            }
            self.order.push(record.id);
            self.groups.insert(record.id, group);
        }
        self.overlay.set_visible(!self.handles.is_empty());
    }
}
