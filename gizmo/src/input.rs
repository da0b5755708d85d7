//! Input model: the controller state machine, drag sessions and deltas.
//!
//! `ControllerState` is either idle or carries the one open [`DragSession`].
//! A session records everything needed to turn the next pointer ray into a
//! delta relative to drag start: the anchor captured on the handle's line,
//! plane or rotation plane, and the initial local transforms of the nodes it
//! moves. Deltas are always cumulative from drag start, never incremental.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use glam::{DMat3, DMat4, DVec3};
use serde::Serialize;

use crate::handle::{GroupId, HandleId, HandleKind, ManipulationKind};
use crate::math::{Ray, closest_point_on_line, intersect_plane, signed_angle_deg};
use crate::scene::NodeId;

/// A world-space translation and rotation about an axis through a pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub translation: DVec3,
    /// Rotation axis; zero for pure translations.
    pub axis: DVec3,
    pub angle_deg: f64,
}

impl Delta {
    pub const IDENTITY: Self = Self { translation: DVec3::ZERO, axis: DVec3::ZERO, angle_deg: 0.0 };

    #[must_use]
    pub fn translation(translation: DVec3) -> Self {
        Self { translation, ..Self::IDENTITY }
    }

    #[must_use]
    pub fn rotation(axis: DVec3, angle_deg: f64) -> Self {
        Self { axis, angle_deg, ..Self::IDENTITY }
    }

    /// The rotation as a linear map; exact identity when there is none.
    #[must_use]
    pub fn rotation_matrix(&self) -> DMat3 {
        let axis = self.axis.normalize_or_zero();
        if axis == DVec3::ZERO || self.angle_deg.abs() < f64::EPSILON {
            return DMat3::IDENTITY;
        }
        DMat3::from_axis_angle(axis, self.angle_deg.to_radians())
    }
}

/// What the pointer was on when the drag started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragAnchor {
    /// Closest point on the handle axis line to the start ray.
    Axis { direction: DVec3, anchor: DVec3 },
    /// Start ray hit on the translation plane.
    Plane { point: DVec3, normal: DVec3, anchor: DVec3 },
    /// Start ray hit on the rotation plane through `pivot`.
    Rotate { pivot: DVec3, normal: DVec3, start: DVec3 },
}

impl DragAnchor {
    /// Capture the anchor for a handle of `kind` at `position`.
    ///
    /// `world_axis` is the handle axis after the group rotation. Returns
    /// `None` when the ray is parallel to the handle's line or plane, or the
    /// handle has no axis where one is required.
    #[must_use]
    pub fn begin(
        kind: HandleKind,
        position: DVec3,
        world_axis: Option<DVec3>,
        view_direction: DVec3,
        ray: &Ray,
        epsilon: f64,
    ) -> Option<Self> {
        match kind {
            HandleKind::AxisTranslate => {
                let direction = world_axis?;
                if parallel_to_line(direction, ray, epsilon) {
                    return None;
                }
                let anchor = closest_point_on_line(ray, position, direction)?;
                Some(Self::Axis { direction, anchor })
            }
            HandleKind::PlaneTranslate => Self::plane(position, world_axis?, ray, epsilon),
            HandleKind::ViewPlaneTranslate => Self::plane(position, view_direction, ray, epsilon),
            HandleKind::Rotate => {
                let normal = world_axis?;
                if parallel_to_plane(normal, ray, epsilon) {
                    return None;
                }
                let start = intersect_plane(ray, position, normal)?;
                if (start - position).length_squared() < epsilon {
                    return None;
                }
                Some(Self::Rotate { pivot: position, normal, start })
            }
        }
    }

    fn plane(point: DVec3, normal: DVec3, ray: &Ray, epsilon: f64) -> Option<Self> {
        if parallel_to_plane(normal, ray, epsilon) {
            return None;
        }
        let anchor = intersect_plane(ray, point, normal)?;
        Some(Self::Plane { point, normal, anchor })
    }

    /// Delta from the anchor to where `ray` now meets the line or plane.
    #[must_use]
    pub fn delta(&self, ray: &Ray, epsilon: f64) -> Option<Delta> {
        match *self {
            Self::Axis { direction, anchor } => {
                if parallel_to_line(direction, ray, epsilon) {
                    return None;
                }
                let current = closest_point_on_line(ray, anchor, direction)?;
                Some(Delta::translation(current - anchor))
            }
            Self::Plane { point, normal, anchor } => {
                if parallel_to_plane(normal, ray, epsilon) {
                    return None;
                }
                let current = intersect_plane(ray, point, normal)?;
                Some(Delta::translation(current - anchor))
            }
            Self::Rotate { pivot, normal, start } => {
                if parallel_to_plane(normal, ray, epsilon) {
                    return None;
                }
                let current = intersect_plane(ray, pivot, normal)?;
                let angle = signed_angle_deg(start - pivot, current - pivot, normal)?;
                Some(Delta::rotation(normal, angle))
            }
        }
    }
}

fn parallel_to_line(direction: DVec3, ray: &Ray, epsilon: f64) -> bool {
    direction.normalize_or_zero().cross(ray.direction).length_squared() < epsilon
}

fn parallel_to_plane(normal: DVec3, ray: &Ray, epsilon: f64) -> bool {
    let d = normal.normalize_or_zero().dot(ray.direction);
    d * d < epsilon
}

/// One open drag, from a successful pointer-down to commit or cancellation.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// Distinguishes this session from any later one.
    pub epoch: u64,
    pub handle_id: HandleId,
    pub handle_kind: HandleKind,
    pub kind: ManipulationKind,
    pub group_id: GroupId,
    /// Committed position of the active handle; the rotation pivot.
    pub pivot: DVec3,
    /// Handle axis after the group rotation at drag start.
    pub world_axis: Option<DVec3>,
    pub node_ids: Vec<NodeId>,
    /// Local transforms at drag start, parallel to `node_ids`.
    pub initial: Vec<DMat4>,
    /// Most recently written local transforms, parallel to `node_ids`.
    pub current: Vec<DMat4>,
    /// Groups whose nodes descend from a node of `group_id`.
    pub child_groups: Vec<GroupId>,
    /// `None` until a non-degenerate pointer ray has been seen.
    pub anchor: Option<DragAnchor>,
    pub last_delta: Delta,
}

impl DragSession {
    /// Delta for `ray`, capturing the anchor first if it is still missing.
    ///
    /// The call that captures the anchor yields no delta.
    pub fn delta_for(&mut self, ray: &Ray, view_direction: DVec3, epsilon: f64) -> Option<Delta> {
        let Some(anchor) = self.anchor else {
            self.anchor = DragAnchor::begin(self.handle_kind, self.pivot, self.world_axis, view_direction, ray, epsilon);
            return None;
        };
        anchor.delta(ray, epsilon)
    }

    /// Store the transforms a step wrote. `None` entries (skipped nodes)
    /// keep their previous value.
    pub fn record_written(&mut self, written: &[Option<DMat4>]) {
        for (slot, value) in self.current.iter_mut().zip(written) {
            if let Some(local) = value {
                *slot = *local;
            }
        }
    }

    /// Groups whose handles follow this drag: the active group, then children.
    #[must_use]
    pub fn affected_groups(&self) -> Vec<GroupId> {
        let mut groups = Vec::with_capacity(self.child_groups.len() + 1);
        groups.push(self.group_id);
        groups.extend(self.child_groups.iter().copied());
        groups
    }
}

/// Controller state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ControllerState {
    #[default]
    Idle,
    Dragging(Box<DragSession>),
}

impl ControllerState {
    #[must_use]
    pub fn session(&self) -> Option<&DragSession> {
        match self {
            Self::Idle => None,
            Self::Dragging(session) => Some(session),
        }
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging(_))
    }
}

/// What a pointer event or explicit step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "handle_id", rename_all = "snake_case")]
pub enum PointerOutcome {
    /// Pointer-down hit nothing manipulable.
    Missed,
    /// A drag started on this handle.
    Started(HandleId),
    /// A provisional step was applied.
    Updated,
    /// The drag was committed.
    Ended,
    /// A previous step was still writing; this move was dropped.
    Dropped,
    /// Nothing to do: no session, degenerate geometry or already dragging.
    Ignored,
    /// The session was cancelled while this step was in flight.
    Cancelled,
}
