//! Engine runner: materializes the FinDer-style rupture engine's working
//! directory, invokes the binary synchronously, and parses its output into a
//! [`shakefollow_schemas::FinderSolution`]. Callers (the scheduler's worker)
//! are responsible for dispatching [`run_follow_up`] onto a blocking thread —
//! this crate never spawns its own async runtime.

mod config_template;
mod error;
mod execute;
mod output;
mod workspace;

pub use config_template::{write_data_for_finder, write_finder_configuration};
pub use error::EngineError;
pub use execute::{run_finder, ExecutionOutcome};
pub use output::parse_solution;
pub use workspace::{check_finder_executable, prepare_workspace};

use shakefollow_schemas::FinderSolution;
use std::path::Path;
use tracing::instrument;

/// One end-to-end engine invocation for a single event/stage.
pub struct FollowUpRequest<'a> {
    pub binary_path: &'a Path,
    pub config_template: &'a str,
    pub output_root: &'a Path,
    pub catalog_event_id: &'a str,
    pub engine_input_blob: &'a str,
    pub live_mode: bool,
}

/// Runs the full engine pipeline for one event/stage: prepares the working
/// directory, validates the binary, materializes config + input data,
/// executes the engine, and parses its output. Synchronous and blocking —
/// the caller must run this on a dedicated thread (e.g.
/// `tokio::task::spawn_blocking`) so it never stalls the scheduler's async
/// runtime.
#[instrument(skip(req), fields(event_id = req.catalog_event_id))]
pub fn run_follow_up(req: FollowUpRequest<'_>) -> Result<FinderSolution, EngineError> {
    check_finder_executable(req.binary_path)?;

    let working_dir = prepare_workspace(req.output_root, req.catalog_event_id)?;
    let config_path = working_dir.join("config");

    write_finder_configuration(req.config_template, &working_dir, &config_path)?;
    write_data_for_finder(req.engine_input_blob, &working_dir)?;

    let outcome = run_finder(req.binary_path, &config_path, &working_dir, req.live_mode)?;

    let engine_event_id = outcome.engine_event_id.ok_or_else(|| {
        EngineError::OutputParse("engine produced no Event_ID= marker on stdout".to_string())
    })?;

    parse_solution(&working_dir, req.catalog_event_id, &engine_event_id)
}
