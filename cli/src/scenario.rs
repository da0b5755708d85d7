//! Replay scenarios: a scene, its handle groups and a list of input steps.
//!
//! Everything in a scenario refers to nodes and groups by name. Names are
//! resolved to ids only when the scenario is replayed, after [`Scenario::validate`]
//! has checked every reference.

#[cfg(test)]
#[path = "scenario_test.rs"]
mod scenario_test;

use std::collections::HashMap;

use gizmo::error::DisabledReason;
use gizmo::handle::HandleKind;
use gizmo::input::Delta;
use gizmo::viewport::{CameraViewport, ScreenPoint};
use glam::{DMat4, DVec3};
use serde::Deserialize;

/// Handles in the default set created by `default_set: true`.
pub const DEFAULT_SET_SIZE: usize = 10;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScenarioError {
    #[error("duplicate node name `{0}`")]
    DuplicateNode(String),
    #[error("unknown node `{0}`")]
    UnknownNode(String),
    #[error("node `{0}` is its own ancestor")]
    NodeCycle(String),
    #[error("duplicate group name `{0}`")]
    DuplicateGroup(String),
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("group `{group}` has {count} handles; step {step} refers to handle {index}")]
    HandleIndex { step: usize, group: String, index: usize, count: usize },
    #[error("invalid camera: {0}")]
    Camera(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub camera: CameraSpec,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
    #[serde(default)]
    pub tracked_points: Vec<DVec3>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraSpec {
    pub eye: DVec3,
    #[serde(default)]
    pub target: DVec3,
    #[serde(default = "default_up")]
    pub up: DVec3,
    pub projection: Projection,
    #[serde(default = "default_near")]
    pub near: f64,
    #[serde(default = "default_far")]
    pub far: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Projection {
    Orthographic { half_width: f64, half_height: f64 },
    Perspective { fov_y_deg: f64 },
}

fn default_up() -> DVec3 {
    DVec3::Y
}

fn default_near() -> f64 {
    0.1
}

fn default_far() -> f64 {
    100.0
}

fn default_scale() -> DVec3 {
    DVec3::ONE
}

impl CameraSpec {
    #[must_use]
    pub fn viewport(&self) -> CameraViewport {
        let depth = (self.near, self.far);
        let size = (self.width, self.height);
        match self.projection {
            Projection::Orthographic { half_width, half_height } => {
                CameraViewport::orthographic(self.eye, self.target, self.up, half_width, half_height, depth, size)
            }
            Projection::Perspective { fov_y_deg } => {
                CameraViewport::perspective(self.eye, self.target, self.up, fov_y_deg.to_radians(), depth, size)
            }
        }
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ScenarioError::Camera("viewport size must be positive"));
        }
        if self.near <= 0.0 || self.far <= self.near {
            return Err(ScenarioError::Camera("depth range must satisfy 0 < near < far"));
        }
        if (self.target - self.eye).length_squared() < f64::EPSILON {
            return Err(ScenarioError::Camera("eye and target coincide"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub translation: DVec3,
    #[serde(default = "default_scale")]
    pub scale: DVec3,
}

impl NodeSpec {
    /// Local transform: scale, then translate.
    #[must_use]
    pub fn local(&self) -> DMat4 {
        DMat4::from_translation(self.translation) * DMat4::from_scale(self.scale)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub position: DVec3,
    /// Create the ten-handle default set before `handles`.
    #[serde(default)]
    pub default_set: bool,
    #[serde(default)]
    pub handles: Vec<HandleSpec>,
}

impl GroupSpec {
    #[must_use]
    pub fn handle_count(&self) -> usize {
        let defaults = if self.default_set { DEFAULT_SET_SIZE } else { 0 };
        defaults + self.handles.len()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandleSpec {
    pub kind: HandleKind,
    #[serde(default)]
    pub axis: Option<DVec3>,
    /// Defaults to the group position.
    #[serde(default)]
    pub position: Option<DVec3>,
    /// Orients the handle frame around this direction instead of the helper axis.
    #[serde(default)]
    pub reference: Option<DVec3>,
}

/// A handle by group name and creation index within the group.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandleRef {
    pub group: String,
    pub index: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Pointer-down with the picker armed on `handle`.
    Press { handle: HandleRef, at: ScreenPoint },
    /// Pointer-down over empty space.
    PressEmpty { at: ScreenPoint },
    Move { at: ScreenPoint },
    Release { at: ScreenPoint },
    /// Explicit delta applied to the open drag.
    Apply {
        #[serde(default)]
        translation: DVec3,
        #[serde(default)]
        axis: DVec3,
        #[serde(default)]
        angle_deg: f64,
        #[serde(default)]
        finalize: bool,
    },
    Cancel,
    Mode { reason: DisabledReason, active: bool },
}

impl Step {
    /// The delta carried by an `Apply` step.
    #[must_use]
    pub fn delta(&self) -> Option<(Delta, bool)> {
        match *self {
            Self::Apply { translation, axis, angle_deg, finalize } => {
                Some((Delta { translation, axis, angle_deg }, finalize))
            }
            _ => None,
        }
    }
}

impl Scenario {
    /// Parse a scenario from JSON.
    ///
    /// # Errors
    ///
    /// Returns a serde error for malformed input or unknown fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check every name reference and handle index.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.camera.validate()?;

        let mut parents: HashMap<&str, Option<&str>> = HashMap::new();
        for node in &self.nodes {
            if parents.insert(&node.name, node.parent.as_deref()).is_some() {
                return Err(ScenarioError::DuplicateNode(node.name.clone()));
            }
        }
        for node in &self.nodes {
            let mut current = node.parent.as_deref();
            let mut hops = 0;
            while let Some(name) = current {
                let Some(parent) = parents.get(name) else {
                    return Err(ScenarioError::UnknownNode(name.to_owned()));
                };
                hops += 1;
                if name == node.name || hops > self.nodes.len() {
                    return Err(ScenarioError::NodeCycle(node.name.clone()));
                }
                current = *parent;
            }
        }

        let mut groups: HashMap<&str, usize> = HashMap::new();
        for group in &self.groups {
            if groups.insert(&group.name, group.handle_count()).is_some() {
                return Err(ScenarioError::DuplicateGroup(group.name.clone()));
            }
            if let Some(missing) = group.nodes.iter().find(|n| !parents.contains_key(n.as_str())) {
                return Err(ScenarioError::UnknownNode(missing.clone()));
            }
        }

        for (step, s) in self.steps.iter().enumerate() {
            let Step::Press { handle, .. } = s else {
                continue;
            };
            let Some(&count) = groups.get(handle.group.as_str()) else {
                return Err(ScenarioError::UnknownGroup(handle.group.clone()));
            };
            if handle.index >= count {
                return Err(ScenarioError::HandleIndex {
                    step,
                    group: handle.group.clone(),
                    index: handle.index,
                    count,
                });
            }
        }
        Ok(())
    }
}
