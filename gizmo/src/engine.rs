//! Manipulation controller: pointer-driven drags and the apply-and-propagate step.
//!
//! DESIGN
//! ======
//! `Manipulator` owns the group registry, the tracked points, the controller
//! state and the event bus behind one async mutex (`inner`). That mutex is
//! only ever held across synchronous sections; it is never held while a
//! scene call is awaited.
//!
//! A second mutex, the step guard, serializes steps. A step computes a
//! delta, repositions handle visuals and tracked points, then issues one
//! write per owned node concurrently and joins them all before the guard is
//! released. Pointer-move uses `try_lock` and drops the move if a step is in
//! flight; pointer-down, pointer-up and explicit steps wait for the guard.
//!
//! Cancellation does not take the step guard. It discards the session under
//! `inner` immediately. Each session carries an epoch; a step that finishes
//! against a different epoch (or none) publishes nothing and reports
//! `Cancelled`. Writes it already issued still complete.
//!
//! Node writes are corrected for the parent's net transform: the delta's
//! axis, translation and pivot are re-expressed in parent space and the
//! angle is negated under a reflecting parent. The new local transform is
//! the pivot rotation applied to the initial local transform with the
//! parent-space translation added to the translation column afterwards.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use glam::{DMat3, DMat4, DVec3};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::consts::MAX_HIERARCHY_DEPTH;
use crate::error::{DisabledReason, ManipulationError};
use crate::events::{EventBus, ManipulationEvent};
use crate::handle::{GroupId, HandleId, HandleInstance, HandleKind};
use crate::input::{ControllerState, Delta, DragAnchor, DragSession, PointerOutcome};
use crate::math::{Ray, has_reflection, rotation_about, try_inverse};
use crate::overlay::HandleOverlay;
use crate::pick::Picker;
use crate::registry::{GroupRegistry, HandleDelta};
use crate::scene::{NodeId, SceneError, SceneStore};
use crate::snapshot::SessionSnapshot;
use crate::tracked::{TrackedPoint, TrackedPointId, TrackedPoints};
use crate::viewport::{ScreenPoint, Viewport, pointer_ray};

// =============================================================================
// PROPAGATION
// =============================================================================

/// New local transform for a node after `delta` about `pivot`.
///
/// `parent_net` is the parent's world transform, `None` for roots. Returns
/// `None` when the parent transform is singular.
#[must_use]
pub fn propagate_local(initial: DMat4, parent_net: Option<DMat4>, delta: &Delta, pivot: DVec3) -> Option<DMat4> {
    let (axis, translation, pivot, angle_deg) = match parent_net {
        None => (delta.axis, delta.translation, pivot, delta.angle_deg),
        Some(parent) => {
            let inverse = try_inverse(&parent)?;
            let angle = if has_reflection(&parent) { -delta.angle_deg } else { delta.angle_deg };
            (
                inverse.transform_vector3(delta.axis),
                inverse.transform_vector3(delta.translation),
                inverse.transform_point3(pivot),
                angle,
            )
        }
    };
    let rotation = rotation_about(pivot, axis, angle_deg.to_radians());
    let mut local = rotation * initial;
    local.w_axis += translation.extend(0.0);
    Some(local)
}

async fn propagate_node(
    scene: &dyn SceneStore,
    node: NodeId,
    initial: DMat4,
    delta: &Delta,
    pivot: DVec3,
) -> Result<Option<DMat4>, SceneError> {
    let parent_net = match scene.parent(node).await? {
        Some(parent) => Some(scene.net_transform(parent).await?),
        None => None,
    };
    let Some(local) = propagate_local(initial, parent_net, delta, pivot) else {
        warn!(%node, "parent transform is singular; skipping node for this step");
        return Ok(None);
    };
    scene.set_local_transform(node, local).await?;
    Ok(Some(local))
}

// =============================================================================
// CONTROLLER
// =============================================================================

struct Inner {
    registry: GroupRegistry,
    state: ControllerState,
    tracked: TrackedPoints,
    /// Active disabling modes.
    blockers: BTreeSet<DisabledReason>,
    committed_translation: DVec3,
    events: EventBus,
    next_epoch: u64,
}

impl Inner {
    fn gate(&self) -> Result<(), ManipulationError> {
        match self.blockers.iter().next() {
            Some(reason) => Err(ManipulationError::Disabled(*reason)),
            None => Ok(()),
        }
    }

    /// Discard the open session without committing.
    fn cancel_session(&mut self) -> bool {
        let ControllerState::Dragging(session) = std::mem::take(&mut self.state) else {
            return false;
        };
        self.registry.revert_provisional(&session.affected_groups());
        self.tracked.restore();
        info!(handle_id = %session.handle_id, group_id = %session.group_id, "drag cancelled");
        true
    }
}

/// Where a step's delta comes from.
enum StepSource {
    Pointer(ScreenPoint),
    Explicit(Delta),
}

/// Everything a step needs once `inner` is released.
struct StepPlan {
    epoch: u64,
    pivot: DVec3,
    delta: Delta,
    nodes: Vec<(NodeId, DMat4)>,
}

/// The handle a pointer-down resolved to.
struct DragTarget {
    handle_id: HandleId,
    handle_kind: HandleKind,
    group_id: GroupId,
    pivot: DVec3,
    world_axis: Option<DVec3>,
    node_ids: Vec<NodeId>,
    other_groups: Vec<(GroupId, Vec<NodeId>)>,
}

/// Interactive manipulation controller.
pub struct Manipulator {
    scene: Arc<dyn SceneStore>,
    viewport: Arc<dyn Viewport>,
    picker: Arc<dyn Picker>,
    config: ControllerConfig,
    inner: Mutex<Inner>,
    step_guard: Mutex<()>,
}

impl Manipulator {
    #[must_use]
    pub fn new(
        scene: Arc<dyn SceneStore>,
        viewport: Arc<dyn Viewport>,
        picker: Arc<dyn Picker>,
        overlay: Arc<dyn HandleOverlay>,
        config: ControllerConfig,
    ) -> Self {
        let inner = Inner {
            registry: GroupRegistry::new(overlay),
            state: ControllerState::Idle,
            tracked: TrackedPoints::new(),
            blockers: BTreeSet::new(),
            committed_translation: DVec3::ZERO,
            events: EventBus::new(config.event_capacity),
            next_epoch: 0,
        };
        Self { scene, viewport, picker, config, inner: Mutex::new(inner), step_guard: Mutex::new(()) }
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // --- Handles and groups ---

    /// Create the default ten-handle set for a group at `position`.
    ///
    /// # Errors
    ///
    /// Returns `Disabled` while any disabling mode is active.
    pub async fn create_handle_set(&self, position: DVec3, group_id: GroupId) -> Result<Vec<HandleId>, ManipulationError> {
        let mut inner = self.inner.lock().await;
        inner.gate()?;
        let ids = inner.registry.add_default_handle_set(position, group_id)?;
        info!(%group_id, count = ids.len(), "handle set created");
        Ok(ids)
    }

    /// Add one handle to a group.
    ///
    /// # Errors
    ///
    /// Returns `Disabled` while any disabling mode is active, or a handle
    /// error if `kind` needs an axis and none is given.
    pub async fn add_handle(
        &self,
        kind: HandleKind,
        position: DVec3,
        axis: Option<DVec3>,
        group_id: GroupId,
    ) -> Result<HandleId, ManipulationError> {
        self.add_handle_with_reference(kind, position, axis, None, group_id).await
    }

    /// Add one handle whose frame is built around `reference` instead of
    /// the canonical helper axis. A reference parallel to `axis` is ignored.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_handle`].
    pub async fn add_handle_with_reference(
        &self,
        kind: HandleKind,
        position: DVec3,
        axis: Option<DVec3>,
        reference: Option<DVec3>,
        group_id: GroupId,
    ) -> Result<HandleId, ManipulationError> {
        let mut inner = self.inner.lock().await;
        inner.gate()?;
        Ok(inner.registry.add_handle(kind, position, axis, reference, group_id)?)
    }

    /// Remove one group's handles, or every handle when `group_id` is `None`.
    ///
    /// An open drag on an affected group is cancelled first.
    pub async fn remove_handles(&self, group_id: Option<GroupId>) -> Vec<HandleId> {
        let mut inner = self.inner.lock().await;
        let affects_drag = inner
            .state
            .session()
            .is_some_and(|s| group_id.is_none_or(|g| s.affected_groups().contains(&g)));
        if affects_drag {
            inner.cancel_session();
        }
        inner.registry.remove_handles(group_id)
    }

    pub async fn handle(&self, handle_id: HandleId) -> Option<HandleInstance> {
        self.inner.lock().await.registry.handle(&handle_id).cloned()
    }

    pub async fn group_ids(&self) -> Vec<GroupId> {
        self.inner.lock().await.registry.group_ids().to_vec()
    }

    /// Nodes owned by a group; empty for unknown groups.
    pub async fn node_ids(&self, group_id: GroupId) -> Vec<NodeId> {
        self.inner.lock().await.registry.node_ids(&group_id)
    }

    pub async fn set_node_ids(&self, group_id: GroupId, node_ids: Vec<NodeId>) {
        self.inner.lock().await.registry.set_node_ids(group_id, node_ids);
    }

    /// The group that owns `node_id`, if any.
    pub async fn group_of(&self, node_id: NodeId) -> Option<GroupId> {
        self.inner.lock().await.registry.group_of(&node_id)
    }

    pub async fn group_rotation(&self, group_id: GroupId) -> DMat3 {
        self.inner.lock().await.registry.group_rotation(&group_id)
    }

    /// Translation shown by the open drag and not yet committed.
    pub async fn in_progress_offset(&self) -> DVec3 {
        self.inner.lock().await.registry.in_progress_offset()
    }

    pub async fn reset_in_progress_offset(&self) {
        self.inner.lock().await.registry.reset_in_progress_offset();
    }

    // --- Tracked points ---

    pub async fn register_tracked_point(&self, position: DVec3) -> TrackedPointId {
        self.inner.lock().await.tracked.register(position)
    }

    pub async fn clear_tracked_points(&self) {
        self.inner.lock().await.tracked.clear();
    }

    /// Live position of a tracked point.
    pub async fn tracked_point(&self, id: TrackedPointId) -> Option<DVec3> {
        self.inner.lock().await.tracked.get(&id).map(|p| p.live)
    }

    pub async fn tracked_points(&self) -> Vec<TrackedPoint> {
        self.inner.lock().await.tracked.all().to_vec()
    }

    /// Sum of every committed translation.
    pub async fn committed_translation(&self) -> DVec3 {
        self.inner.lock().await.committed_translation
    }

    // --- Enabled gate ---

    pub async fn is_enabled(&self) -> bool {
        self.inner.lock().await.blockers.is_empty()
    }

    /// The first active disabling mode, if any.
    pub async fn disabled_reason(&self) -> Option<DisabledReason> {
        self.inner.lock().await.blockers.iter().next().copied()
    }

    /// Turn a disabling mode on or off. Turning one on cancels an open drag.
    pub async fn set_mode(&self, reason: DisabledReason, active: bool) {
        let mut inner = self.inner.lock().await;
        let changed = if active { inner.blockers.insert(reason) } else { inner.blockers.remove(&reason) };
        if !changed {
            return;
        }
        info!(%reason, active, "manipulation mode changed");
        if active {
            inner.cancel_session();
        }
    }

    // --- Drag lifecycle ---

    pub async fn is_dragging(&self) -> bool {
        self.inner.lock().await.state.is_dragging()
    }

    /// A copy of the open drag session.
    pub async fn drag_session(&self) -> Option<DragSession> {
        self.inner.lock().await.state.session().cloned()
    }

    /// Start a drag if the pointer is on a handle.
    ///
    /// # Errors
    ///
    /// Returns `Disabled` while any disabling mode is active, or a scene
    /// error if the owned nodes' transforms cannot be read.
    pub async fn pointer_down(&self, screen: ScreenPoint) -> Result<PointerOutcome, ManipulationError> {
        let _guard = self.step_guard.lock().await;

        let target = {
            let inner = self.inner.lock().await;
            inner.gate()?;
            if inner.state.is_dragging() {
                return Ok(PointerOutcome::Ignored);
            }
            let Some(hit) = self.picker.pick_handle(screen) else {
                return Ok(PointerOutcome::Missed);
            };
            let Some(handle) = inner.registry.handle(&hit.handle_id) else {
                debug!(handle_id = %hit.handle_id, "pick resolved to no known handle");
                return Ok(PointerOutcome::Missed);
            };
            let registry = &inner.registry;
            let group_rotation = registry.group_rotation(&handle.group_id);
            DragTarget {
                handle_id: handle.id,
                handle_kind: handle.kind,
                group_id: handle.group_id,
                pivot: handle.position,
                world_axis: handle.world_axis(&group_rotation),
                node_ids: registry.node_ids(&handle.group_id),
                other_groups: registry
                    .group_ids()
                    .iter()
                    .filter(|g| **g != handle.group_id)
                    .map(|g| (*g, registry.node_ids(g)))
                    .collect(),
            }
        };

        let scene = self.scene.as_ref();
        let initial = join_all(target.node_ids.iter().map(|node| scene.local_transform(*node)))
            .await
            .into_iter()
            .collect::<Result<Vec<DMat4>, SceneError>>()?;
        let child_groups = self.discover_child_groups(&target.node_ids, &target.other_groups).await;

        let anchor = self.ray_at(screen).and_then(|ray| {
            DragAnchor::begin(
                target.handle_kind,
                target.pivot,
                target.world_axis,
                self.viewport.view_direction(),
                &ray,
                self.config.parallel_epsilon,
            )
        });

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        inner.gate()?;
        if inner.registry.handle(&target.handle_id).is_none() {
            return Ok(PointerOutcome::Missed);
        }

        inner.next_epoch += 1;
        let session = DragSession {
            epoch: inner.next_epoch,
            handle_id: target.handle_id,
            handle_kind: target.handle_kind,
            kind: target.handle_kind.manipulation(),
            group_id: target.group_id,
            pivot: target.pivot,
            world_axis: target.world_axis,
            node_ids: target.node_ids,
            current: initial.clone(),
            initial,
            child_groups,
            anchor,
            last_delta: Delta::IDENTITY,
        };
        inner.tracked.begin();
        inner.registry.reset_in_progress_offset();
        inner.events.publish(&ManipulationEvent::Started {
            kind: session.kind,
            handle_id: session.handle_id,
            group_id: session.group_id,
            node_ids: session.node_ids.clone(),
            initial: session.initial.clone(),
        });
        info!(
            handle_id = %session.handle_id,
            group_id = %session.group_id,
            kind = ?session.handle_kind,
            nodes = session.node_ids.len(),
            child_groups = session.child_groups.len(),
            "drag started"
        );
        let handle_id = session.handle_id;
        inner.state = ControllerState::Dragging(Box::new(session));
        Ok(PointerOutcome::Started(handle_id))
    }

    /// Apply a provisional step for the pointer at `screen`.
    ///
    /// Dropped without effect while a previous step is still writing.
    ///
    /// # Errors
    ///
    /// Propagates scene errors from the node writes.
    pub async fn pointer_move(&self, screen: ScreenPoint) -> Result<PointerOutcome, ManipulationError> {
        let Ok(_guard) = self.step_guard.try_lock() else {
            debug!("step in flight; dropping pointer move");
            return Ok(PointerOutcome::Dropped);
        };
        self.run_step(StepSource::Pointer(screen), false).await
    }

    /// Commit the drag at the release position.
    ///
    /// # Errors
    ///
    /// Propagates scene errors from the node writes; the session is
    /// discarded without commit in that case.
    pub async fn pointer_up(&self, screen: ScreenPoint) -> Result<PointerOutcome, ManipulationError> {
        let _guard = self.step_guard.lock().await;
        self.run_step(StepSource::Pointer(screen), true).await
    }

    /// Run the apply-and-propagate step with an explicit delta.
    ///
    /// `finalize` commits and ends the drag like a pointer-up.
    ///
    /// # Errors
    ///
    /// Propagates scene errors from the node writes.
    pub async fn apply_transform(&self, delta: Delta, finalize: bool) -> Result<PointerOutcome, ManipulationError> {
        let _guard = self.step_guard.lock().await;
        self.run_step(StepSource::Explicit(delta), finalize).await
    }

    /// Discard the open drag without committing. Returns whether one was open.
    pub async fn cancel(&self) -> bool {
        self.inner.lock().await.cancel_session()
    }

    // --- Snapshots and events ---

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        SessionSnapshot {
            groups: inner.registry.records(),
            tracked_points: inner.tracked.records(),
            committed_translation: inner.committed_translation,
        }
    }

    /// Replace groups, handles and tracked points. Cancels any open drag.
    pub async fn restore(&self, snapshot: SessionSnapshot) {
        let mut inner = self.inner.lock().await;
        inner.cancel_session();
        inner.registry.restore(snapshot.groups);
        inner.tracked.restore_records(snapshot.tracked_points);
        inner.committed_translation = snapshot.committed_translation;
        info!(groups = inner.registry.group_ids().len(), "session restored");
    }

    pub async fn subscribe(&self) -> mpsc::Receiver<ManipulationEvent> {
        let mut inner = self.inner.lock().await;
        let rx = inner.events.subscribe();
        debug!(subscribers = inner.events.subscriber_count(), "event subscriber added");
        rx
    }

    // =========================================================================
    // STEP
    // =========================================================================

    fn ray_at(&self, screen: ScreenPoint) -> Option<Ray> {
        pointer_ray(self.viewport.as_ref(), screen, self.config.near_depth, self.config.mid_depth)
    }

    /// One apply-and-propagate step. The caller holds the step guard.
    async fn run_step(&self, source: StepSource, finalize: bool) -> Result<PointerOutcome, ManipulationError> {
        let plan = {
            let mut guard = self.inner.lock().await;
            let Inner { registry, state, tracked, .. } = &mut *guard;
            let ControllerState::Dragging(session) = state else {
                return Ok(PointerOutcome::Ignored);
            };

            let computed = match source {
                StepSource::Pointer(screen) => self.ray_at(screen).and_then(|ray| {
                    session.delta_for(&ray, self.viewport.view_direction(), self.config.parallel_epsilon)
                }),
                StepSource::Explicit(delta) => Some(delta),
            };
            let delta = match computed {
                Some(delta) => delta,
                None if finalize => session.last_delta,
                None => return Ok(PointerOutcome::Ignored),
            };
            session.last_delta = delta;

            let rotation = delta.rotation_matrix();
            registry.apply_delta(&HandleDelta {
                translation: delta.translation,
                rotation,
                pivot: session.pivot,
                finalize: false,
                active_group: session.group_id,
                child_groups: session.child_groups.clone(),
            });
            tracked.apply(session.pivot, &rotation, delta.translation);

            StepPlan {
                epoch: session.epoch,
                pivot: session.pivot,
                delta,
                nodes: session.node_ids.iter().copied().zip(session.initial.iter().copied()).collect(),
            }
        };

        let scene = self.scene.as_ref();
        let results = join_all(
            plan.nodes
                .iter()
                .map(|(node, initial)| propagate_node(scene, *node, *initial, &plan.delta, plan.pivot)),
        )
        .await;

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.state.session().map(|s| s.epoch) != Some(plan.epoch) {
            debug!(epoch = plan.epoch, "session cancelled during step");
            return Ok(PointerOutcome::Cancelled);
        }

        let written = match results.into_iter().collect::<Result<Vec<Option<DMat4>>, SceneError>>() {
            Ok(written) => written,
            Err(err) => {
                warn!(error = %err, finalize, "node write failed");
                if finalize {
                    inner.cancel_session();
                }
                return Err(err.into());
            }
        };

        if !finalize {
            let ControllerState::Dragging(session) = &mut inner.state else {
                return Ok(PointerOutcome::Cancelled);
            };
            session.record_written(&written);
            inner.events.publish(&ManipulationEvent::Updated {
                kind: session.kind,
                node_ids: session.node_ids.clone(),
                initial: session.initial.clone(),
                current: session.current.clone(),
            });
            debug!(translation = ?plan.delta.translation, angle_deg = plan.delta.angle_deg, "drag updated");
            return Ok(PointerOutcome::Updated);
        }

        let ControllerState::Dragging(mut session) = std::mem::take(&mut inner.state) else {
            return Ok(PointerOutcome::Cancelled);
        };
        session.record_written(&written);
        inner.registry.apply_delta(&HandleDelta {
            translation: plan.delta.translation,
            rotation: plan.delta.rotation_matrix(),
            pivot: plan.pivot,
            finalize: true,
            active_group: session.group_id,
            child_groups: session.child_groups.clone(),
        });
        inner.committed_translation += inner.registry.in_progress_offset();
        inner.registry.reset_in_progress_offset();
        info!(
            handle_id = %session.handle_id,
            translation = ?plan.delta.translation,
            angle_deg = plan.delta.angle_deg,
            "drag committed"
        );
        let DragSession { kind, node_ids, initial, current, .. } = *session;
        inner.events.publish(&ManipulationEvent::Ended { kind, node_ids, initial, final_transforms: current });
        Ok(PointerOutcome::Ended)
    }

    /// Groups with a node whose ancestor chain reaches one of `active`.
    async fn discover_child_groups(&self, active: &[NodeId], others: &[(GroupId, Vec<NodeId>)]) -> Vec<GroupId> {
        let mut children = Vec::new();
        for (group_id, nodes) in others {
            for node in nodes {
                if self.descends_from(*node, active).await {
                    children.push(*group_id);
                    break;
                }
            }
        }
        children
    }

    async fn descends_from(&self, node: NodeId, ancestors: &[NodeId]) -> bool {
        let mut current = node;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match self.scene.parent(current).await {
                Ok(Some(parent)) => {
                    if ancestors.contains(&parent) {
                        return true;
                    }
                    current = parent;
                }
                Ok(None) => return false,
                Err(err) => {
                    warn!(%node, error = %err, "parent lookup failed during child-group discovery");
                    return false;
                }
            }
        }
        warn!(%node, "hierarchy deeper than limit; treating as unrelated");
        false
    }
}
