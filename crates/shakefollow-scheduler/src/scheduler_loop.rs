//! Poll loop and bounded worker-pool dispatch.
//!
//! Every tick: fetch due rows, atomically claim each with a
//! PENDING->PROCESSING compare-and-swap, then try to hand the claimed row to
//! a free pool slot. A row that loses the race for a slot stays claimed
//! PROCESSING and is picked up again only if something explicitly re-queues
//! it — the loop itself never blocks waiting for capacity.

use crate::context::WorkerContext;
use crate::worker;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

/// A cooperative pause/resume switch observed by the loop at the top of
/// every tick. Polling in flight when a pause arrives is allowed to finish;
/// only the *next* tick's fetch is skipped.
#[derive(Clone)]
pub struct SchedulerHandle {
    paused: Arc<AtomicBool>,
}

impl SchedulerHandle {
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

pub struct Scheduler {
    ctx: Arc<WorkerContext>,
    poll_interval: Duration,
    semaphore: Arc<Semaphore>,
    paused: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(ctx: WorkerContext, poll_interval: Duration, worker_pool_size: usize) -> (Self, SchedulerHandle) {
        let paused = Arc::new(AtomicBool::new(false));
        let scheduler = Self {
            ctx: Arc::new(ctx),
            poll_interval,
            semaphore: Arc::new(Semaphore::new(worker_pool_size)),
            paused: paused.clone(),
        };
        (scheduler, SchedulerHandle { paused })
    }

    /// Runs the poll loop forever. Intended to be driven from a dedicated
    /// `tokio::spawn` task by the composition root; never returns under
    /// normal operation.
    pub async fn run(self, service_filter: Option<String>) -> ! {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;

            if self.paused.load(Ordering::SeqCst) {
                continue;
            }

            self.tick(service_filter.as_deref()).await;
        }
    }

    #[instrument(skip(self))]
    async fn tick(&self, service_filter: Option<&str>) {
        let pool = self.ctx.tracker.pool();
        let due = match shakefollow_store::fetch_due(pool, service_filter, Utc::now()).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "fetch_due failed this tick");
                return;
            }
        };

        if due.is_empty() {
            return;
        }
        info!(count = due.len(), "polled due rows");

        for row in due {
            let claimed = match shakefollow_store::claim_pending(pool, &row.key).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, key = %row.key, "claim_pending failed");
                    continue;
                }
            };
            if !claimed {
                // Lost the race to another worker/instance; not an error.
                continue;
            }

            let permit = match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    // Pool saturated this tick. The row stays PROCESSING;
                    // it is deliberately not reverted to PENDING here, per
                    // the documented at-most-one-tick dispatch contract.
                    warn!(key = %row.key, "worker pool saturated; row claimed but not dispatched this tick");
                    continue;
                }
            };

            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                let _permit = permit;
                worker::run_stage(&ctx, row).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_starts_unpaused_and_toggles() {
        let paused = Arc::new(AtomicBool::new(false));
        let handle = SchedulerHandle { paused };
        assert!(!handle.is_paused());
        handle.pause();
        assert!(handle.is_paused());
        handle.resume();
        assert!(!handle.is_paused());
    }
}
