//! Polls the event tracker for due stages and dispatches each onto a bounded
//! worker pool: fetch provider data, merge, format the engine input, run the
//! rupture engine, and emit results.

mod context;
mod error;
mod scheduler_loop;
mod worker;

pub use context::WorkerContext;
pub use error::WorkerError;
pub use scheduler_loop::{Scheduler, SchedulerHandle};
pub use worker::{execute_pipeline, run_stage};
