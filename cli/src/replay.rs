//! Scenario replay against an in-memory scene.
//!
//! A replay either builds everything from the scenario or resumes from a
//! [`ReplayState`] written by an earlier run. The state pins node and group
//! ids to their scenario names and carries the scene's local transforms, so a
//! resumed run addresses the same nodes, groups and handles by the same
//! names and creation indices.

#[cfg(test)]
#[path = "replay_test.rs"]
mod replay_test;

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::Arc;

use gizmo::config::ControllerConfig;
use gizmo::error::ErrorCode;
use gizmo::handle::{GroupId, HandleId};
use gizmo::input::PointerOutcome;
use gizmo::overlay::{ChannelOverlay, OverlayCommand};
use gizmo::pick::QueuedPicker;
use gizmo::scene::{MemoryScene, NodeId, SceneStore};
use gizmo::snapshot::SessionSnapshot;
use gizmo::{ManipulationError, Manipulator};
use glam::DMat4;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::CliError;
use crate::scenario::{Scenario, Step};

/// A scene node as saved between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: NodeId,
    pub local: DMat4,
}

/// Everything needed to resume a replay: the manipulation session plus the
/// name bindings and node transforms the session refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayState {
    pub nodes: BTreeMap<String, NodeState>,
    pub groups: BTreeMap<String, GroupId>,
    pub session: SessionSnapshot,
}

impl ReplayState {
    /// # Errors
    ///
    /// Returns a serde error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// # Errors
    ///
    /// Returns a serde error if `json` is not a valid replay state.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Result of one replayed step.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum StepReport {
    Pointer(PointerOutcome),
    Cancel { cancelled: bool },
    Mode { enabled: bool },
}

/// Ids assigned to a scenario's names.
#[derive(Debug, Default)]
struct Bindings {
    nodes: HashMap<String, NodeId>,
    groups: BTreeMap<String, GroupId>,
    /// Handle ids per group name, in creation order.
    handles: HashMap<String, Vec<HandleId>>,
}

/// Replay `scenario`, writing JSON lines to `out`, and return the final state.
///
/// # Errors
///
/// Fails on setup errors, scene read errors and output errors. A step that
/// fails is reported as a line carrying its error code and replay continues.
pub async fn run(
    scenario: &Scenario,
    config: ControllerConfig,
    resume: Option<ReplayState>,
    print_overlay: bool,
    out: &mut dyn Write,
) -> Result<ReplayState, CliError> {
    let scene = Arc::new(MemoryScene::new());
    let picker = Arc::new(QueuedPicker::new());
    let (overlay, mut overlay_rx) = ChannelOverlay::new();
    let manipulator = Manipulator::new(
        scene.clone(),
        Arc::new(scenario.camera.viewport()),
        picker.clone(),
        Arc::new(overlay),
        config,
    );
    info!(
        event_capacity = manipulator.config().event_capacity,
        parallel_epsilon = manipulator.config().parallel_epsilon,
        "controller configured"
    );
    let mut events = manipulator.subscribe().await;

    let bindings = match resume {
        Some(state) => resume_from(scenario, state, &scene, &manipulator).await?,
        None => set_up(scenario, &scene, &manipulator).await?,
    };
    drain_overlay(&mut overlay_rx, print_overlay, None, out)?;
    info!(steps = scenario.steps.len(), "replay started");

    for (index, step) in scenario.steps.iter().enumerate() {
        match run_step(&manipulator, &picker, &bindings, step).await {
            Ok(report) => print_json(out, &json!({ "step": index, "result": report }))?,
            Err(e) => print_json(
                out,
                &json!({
                    "step": index,
                    "error": e.error_code(),
                    "message": e.to_string(),
                }),
            )?,
        }
        while let Ok(event) = events.try_recv() {
            print_json(out, &json!({ "step": index, "event": event }))?;
        }
        drain_overlay(&mut overlay_rx, print_overlay, Some(index), out)?;
    }

    let group_names: HashMap<GroupId, &str> =
        bindings.groups.iter().map(|(name, id)| (*id, name.as_str())).collect();
    let mut nodes = BTreeMap::new();
    for node in &scenario.nodes {
        let Some(&id) = bindings.nodes.get(&node.name) else {
            continue;
        };
        let local = scene.local_transform(id).await?;
        let net = scene.net_transform(id).await?;
        let group = manipulator.group_of(id).await.and_then(|g| group_names.get(&g).copied());
        print_json(
            out,
            &json!({
                "node": node.name,
                "group": group,
                "local": local,
                "world_position": net.w_axis.truncate(),
            }),
        )?;
        nodes.insert(node.name.clone(), NodeState { id, local });
    }
    for point in manipulator.tracked_points().await {
        print_json(out, &json!({ "tracked_point": point.id, "position": point.live }))?;
    }

    info!("replay finished");
    Ok(ReplayState { nodes, groups: bindings.groups, session: manipulator.snapshot().await })
}

/// Build the scene, groups, handles and tracked points from the scenario.
async fn set_up(scenario: &Scenario, scene: &MemoryScene, manipulator: &Manipulator) -> Result<Bindings, CliError> {
    let nodes: HashMap<String, NodeId> = scenario
        .nodes
        .iter()
        .map(|n| (n.name.clone(), Uuid::new_v4()))
        .collect();
    for node in &scenario.nodes {
        let Some(&id) = nodes.get(&node.name) else {
            continue;
        };
        let parent = node.parent.as_ref().and_then(|p| nodes.get(p)).copied();
        scene.insert(id, parent, node.local()).await;
    }

    let mut bindings = Bindings { nodes, ..Bindings::default() };
    for group in &scenario.groups {
        let group_id: GroupId = Uuid::new_v4();
        let members = group.nodes.iter().filter_map(|n| bindings.nodes.get(n)).copied().collect();
        manipulator.set_node_ids(group_id, members).await;

        let mut ids = Vec::with_capacity(group.handle_count());
        if group.default_set {
            ids.extend(manipulator.create_handle_set(group.position, group_id).await?);
        }
        for spec in &group.handles {
            let position = spec.position.unwrap_or(group.position);
            let id = manipulator
                .add_handle_with_reference(spec.kind, position, spec.axis, spec.reference, group_id)
                .await?;
            ids.push(id);
        }
        info!(group = %group.name, %group_id, handles = ids.len(), "group created");
        bindings.groups.insert(group.name.clone(), group_id);
        bindings.handles.insert(group.name.clone(), ids);
    }

    for point in &scenario.tracked_points {
        manipulator.register_tracked_point(*point).await;
    }
    Ok(bindings)
}

/// Rebuild the scene from saved node states and restore the session.
///
/// Nodes missing from the state start from the scenario. Groups and handles
/// come from the session only; the scenario's group list is not replayed.
async fn resume_from(
    scenario: &Scenario,
    state: ReplayState,
    scene: &MemoryScene,
    manipulator: &Manipulator,
) -> Result<Bindings, CliError> {
    let nodes: HashMap<String, NodeId> = scenario
        .nodes
        .iter()
        .map(|n| (n.name.clone(), state.nodes.get(&n.name).map_or_else(Uuid::new_v4, |s| s.id)))
        .collect();
    for node in &scenario.nodes {
        let Some(&id) = nodes.get(&node.name) else {
            continue;
        };
        let parent = node.parent.as_ref().and_then(|p| nodes.get(p)).copied();
        let local = state.nodes.get(&node.name).map_or_else(|| node.local(), |s| s.local);
        scene.insert(id, parent, local).await;
    }

    let mut handles = HashMap::new();
    for (name, group_id) in &state.groups {
        let Some(record) = state.session.groups.iter().find(|g| g.id == *group_id) else {
            warn!(group = %name, %group_id, "saved group missing from session; skipping");
            continue;
        };
        handles.insert(name.clone(), record.handles.iter().map(|h| h.id).collect());
    }

    manipulator.restore(state.session).await;
    info!(nodes = nodes.len(), groups = state.groups.len(), "replay resumed");
    Ok(Bindings { nodes, groups: state.groups, handles })
}

async fn run_step(
    manipulator: &Manipulator,
    picker: &QueuedPicker,
    bindings: &Bindings,
    step: &Step,
) -> Result<StepReport, ManipulationError> {
    let outcome = match step {
        Step::Press { handle, at } => {
            if let Some(id) = bindings.handles.get(&handle.group).and_then(|ids| ids.get(handle.index)) {
                picker.arm_handle(*id);
            }
            let outcome = manipulator.pointer_down(*at).await;
            picker.clear();
            outcome?
        }
        Step::PressEmpty { at } => {
            picker.clear();
            manipulator.pointer_down(*at).await?
        }
        Step::Move { at } => manipulator.pointer_move(*at).await?,
        Step::Release { at } => manipulator.pointer_up(*at).await?,
        Step::Apply { .. } => {
            let Some((delta, finalize)) = step.delta() else {
                return Ok(StepReport::Pointer(PointerOutcome::Ignored));
            };
            manipulator.apply_transform(delta, finalize).await?
        }
        Step::Cancel => {
            return Ok(StepReport::Cancel { cancelled: manipulator.cancel().await });
        }
        Step::Mode { reason, active } => {
            manipulator.set_mode(*reason, *active).await;
            return Ok(StepReport::Mode { enabled: manipulator.is_enabled().await });
        }
    };
    Ok(StepReport::Pointer(outcome))
}

fn drain_overlay(
    rx: &mut mpsc::UnboundedReceiver<OverlayCommand>,
    print: bool,
    step: Option<usize>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    while let Ok(command) = rx.try_recv() {
        if !print {
            continue;
        }
        let line = match command {
            OverlayCommand::Place(placement) => json!({ "step": step, "placement": placement }),
            OverlayCommand::Remove(handle_id) => json!({ "step": step, "removed": handle_id }),
            OverlayCommand::SetVisible(visible) => json!({ "step": step, "visible": visible }),
        };
        print_json(out, &line)?;
    }
    Ok(())
}

/// Write one compact JSON line.
///
/// # Errors
///
/// Returns an error if the value cannot be rendered or the write fails.
pub fn print_json(out: &mut dyn Write, value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string(value)?;
    writeln!(out, "{rendered}").map_err(CliError::Output)
}
