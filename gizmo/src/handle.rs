//! Handle model: kinds, instances and overlay placements.
//!
//! A handle is one manipulable degree of freedom for a group: an axis, a
//! plane, the view plane or a rotation. Every consumer matches on
//! [`HandleKind`] exhaustively, so adding a kind fails to compile until each
//! dispatch site handles it.

#[cfg(test)]
#[path = "handle_test.rs"]
mod handle_test;

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::math::orthonormal_basis;

/// Unique identifier for a handle instance.
pub type HandleId = Uuid;

/// Unique identifier for a handle group.
pub type GroupId = Uuid;

/// The kind of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    /// Translate along a single axis.
    AxisTranslate,
    /// Translate within the plane normal to the handle axis.
    PlaneTranslate,
    /// Translate within the plane facing the camera.
    ViewPlaneTranslate,
    /// Rotate about the handle axis.
    Rotate,
}

impl HandleKind {
    pub const ALL: [Self; 4] = [Self::AxisTranslate, Self::PlaneTranslate, Self::ViewPlaneTranslate, Self::Rotate];

    /// The manipulation a drag on this handle performs.
    #[must_use]
    pub fn manipulation(self) -> ManipulationKind {
        match self {
            Self::AxisTranslate | Self::PlaneTranslate | Self::ViewPlaneTranslate => ManipulationKind::Translate,
            Self::Rotate => ManipulationKind::Rotate,
        }
    }

    /// Whether instances of this kind carry an axis/normal.
    #[must_use]
    pub fn requires_axis(self) -> bool {
        match self {
            Self::AxisTranslate | Self::PlaneTranslate | Self::Rotate => true,
            Self::ViewPlaneTranslate => false,
        }
    }
}

/// What a drag does to the owned nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManipulationKind {
    Translate,
    Rotate,
}

#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("{kind:?} handle requires a non-zero axis")]
    MissingAxis { kind: HandleKind },
}

impl crate::error::ErrorCode for HandleError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingAxis { .. } => "E_MISSING_AXIS",
        }
    }
}

/// One handle owned by a group.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleInstance {
    pub id: HandleId,
    pub kind: HandleKind,
    /// Committed world position; the rotation pivot for rotate handles.
    pub position: DVec3,
    /// Normalized creation-time axis/normal. `None` only for view-plane handles.
    pub axis: Option<DVec3>,
    /// Creation-time frame with `axis` as its second column.
    pub orientation: DMat3,
    pub group_id: GroupId,
    /// Provisional translation shown since the last commit.
    pub offset: DVec3,
}

impl HandleInstance {
    /// Build a handle, deriving its orientation from `axis`.
    ///
    /// View-plane handles ignore `axis` and get the identity frame.
    ///
    /// # Errors
    ///
    /// Returns `MissingAxis` if the kind needs an axis and `axis` is absent or zero.
    pub fn new(
        kind: HandleKind,
        position: DVec3,
        axis: Option<DVec3>,
        reference: Option<DVec3>,
        group_id: GroupId,
    ) -> Result<Self, HandleError> {
        let (axis, orientation) = if kind.requires_axis() {
            let raw = axis.ok_or(HandleError::MissingAxis { kind })?;
            let orientation = orthonormal_basis(raw, reference).ok_or(HandleError::MissingAxis { kind })?;
            (Some(orientation.y_axis), orientation)
        } else {
            (None, DMat3::IDENTITY)
        };
        Ok(Self { id: Uuid::new_v4(), kind, position, axis, orientation, group_id, offset: DVec3::ZERO })
    }

    /// The axis expressed in the group's current frame.
    #[must_use]
    pub fn world_axis(&self, group_rotation: &DMat3) -> Option<DVec3> {
        self.axis.map(|a| (*group_rotation * a).normalize_or_zero())
    }

    #[must_use]
    pub fn placement(&self, position: DVec3, orientation: DMat3) -> HandlePlacement {
        HandlePlacement { handle_id: self.id, kind: self.kind, position, orientation }
    }
}

/// Where a handle visual should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandlePlacement {
    pub handle_id: HandleId,
    pub kind: HandleKind,
    pub position: DVec3,
    pub orientation: DMat3,
}

/// `(kind, axis)` pairs for the ten-handle default set.
#[must_use]
pub fn default_handle_layout() -> [(HandleKind, Option<DVec3>); 10] {
    [
        (HandleKind::ViewPlaneTranslate, None),
        (HandleKind::AxisTranslate, Some(DVec3::X)),
        (HandleKind::AxisTranslate, Some(DVec3::Y)),
        (HandleKind::AxisTranslate, Some(DVec3::Z)),
        (HandleKind::PlaneTranslate, Some(DVec3::X)),
        (HandleKind::PlaneTranslate, Some(DVec3::Y)),
        (HandleKind::PlaneTranslate, Some(DVec3::Z)),
        (HandleKind::Rotate, Some(DVec3::X)),
        (HandleKind::Rotate, Some(DVec3::Y)),
        (HandleKind::Rotate, Some(DVec3::Z)),
    ]
}
