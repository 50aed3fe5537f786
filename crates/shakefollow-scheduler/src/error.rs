use std::fmt;

/// Failure of a single event worker's pipeline run. Never escapes the
/// scheduler loop as a panic; the worker converts every variant into a
/// tracker resolution (retry/defer/mark-failed) instead.
#[derive(Debug)]
pub enum WorkerError {
    /// Both RRSM and ESM transport attempts were exhausted for this stage.
    BothProvidersUnreachable { rrsm: String, esm: String },
    /// Neither provider response carried an event-level hypocenter, so the
    /// formatter has nothing to anchor the synthetic epicenter row on.
    NoAuthoritativeEventInfo,
    Engine(shakefollow_engine::EngineError),
    Emit(shakefollow_emit::EmitError),
    Tracker(shakefollow_tracker::TrackerError),
    /// The blocking engine task panicked or was cancelled.
    EngineTaskJoin(String),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::BothProvidersUnreachable { rrsm, esm } => {
                write!(f, "both providers unreachable: rrsm={rrsm}, esm={esm}")
            }
            WorkerError::NoAuthoritativeEventInfo => {
                write!(f, "neither provider supplied event-level hypocenter data")
            }
            WorkerError::Engine(e) => write!(f, "engine error: {e}"),
            WorkerError::Emit(e) => write!(f, "emit error: {e}"),
            WorkerError::Tracker(e) => write!(f, "tracker error: {e}"),
            WorkerError::EngineTaskJoin(m) => write!(f, "engine task join error: {m}"),
        }
    }
}

impl std::error::Error for WorkerError {}

impl From<shakefollow_engine::EngineError> for WorkerError {
    fn from(e: shakefollow_engine::EngineError) -> Self {
        WorkerError::Engine(e)
    }
}

impl From<shakefollow_emit::EmitError> for WorkerError {
    fn from(e: shakefollow_emit::EmitError) -> Self {
        WorkerError::Emit(e)
    }
}

impl From<shakefollow_tracker::TrackerError> for WorkerError {
    fn from(e: shakefollow_tracker::TrackerError) -> Self {
        WorkerError::Tracker(e)
    }
}
