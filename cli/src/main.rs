mod replay;
mod scenario;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use gizmo::ManipulationError;
use gizmo::config::{ConfigError, ControllerConfig};
use gizmo::scene::SceneError;
use serde_json::json;
use tracing::{Level, info};

use crate::replay::ReplayState;
use crate::scenario::{Scenario, ScenarioError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to write output: {0}")]
    Output(io::Error),
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid scenario: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Manipulation(#[from] ManipulationError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[derive(Parser, Debug)]
#[command(name = "gizmo-cli", about = "Replay manipulation-handle scenarios headlessly")]
struct Cli {
    #[arg(long, env = "GIZMO_LOG", default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scenario and print events and final transforms as JSON lines.
    Replay(ReplayArgs),
    /// Parse a scenario and check its references without replaying it.
    Validate { scenario: PathBuf },
}

#[derive(Args, Debug)]
struct ReplayArgs {
    scenario: PathBuf,

    #[arg(long, help = "Write the final replay state to this path")]
    snapshot_out: Option<PathBuf>,

    #[arg(long, help = "Resume from a replay state written by a previous replay")]
    snapshot_in: Option<PathBuf>,

    #[arg(long, default_value_t = false, help = "Also print handle overlay placements")]
    overlay: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(cli.log_level)
        .init();

    match cli.command {
        Command::Replay(args) => run_replay(args).await,
        Command::Validate { scenario } => run_validate(&scenario),
    }
}

fn run_validate(path: &Path) -> Result<(), CliError> {
    let scenario = load_scenario(path)?;
    let (width, height) = scenario.camera.viewport().size();
    replay::print_json(
        &mut io::stdout().lock(),
        &json!({
            "valid": true,
            "nodes": scenario.nodes.len(),
            "groups": scenario.groups.len(),
            "steps": scenario.steps.len(),
            "viewport": [width, height],
        }),
    )
}

async fn run_replay(args: ReplayArgs) -> Result<(), CliError> {
    let scenario = load_scenario(&args.scenario)?;
    let config = ControllerConfig::from_env()?;
    let resume = match &args.snapshot_in {
        Some(path) => Some(ReplayState::from_json(&read_file(path)?)?),
        None => None,
    };

    let state = replay::run(&scenario, config, resume, args.overlay, &mut io::stdout().lock()).await?;

    if let Some(path) = &args.snapshot_out {
        fs::write(path, state.to_json()?).map_err(|source| CliError::Write { path: path.clone(), source })?;
        info!(path = %path.display(), "replay state written");
    }
    Ok(())
}

fn load_scenario(path: &Path) -> Result<Scenario, CliError> {
    let scenario = Scenario::from_json(&read_file(path)?)?;
    scenario.validate()?;
    Ok(scenario)
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })
}
