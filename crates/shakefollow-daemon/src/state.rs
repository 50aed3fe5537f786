use serde::{Deserialize, Serialize};
use shakefollow_scheduler::SchedulerHandle;
use shakefollow_tracker::Tracker;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};

/// Broadcast payloads fanned out over `/v1/stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Status(StatusSnapshot),
    LogLine { level: String, msg: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub daemon_uptime_secs: u64,
    pub scheduler_paused: bool,
    pub notes: Option<String>,
}

pub struct AppState {
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub status: Arc<RwLock<StatusSnapshot>>,
    pub scheduler: SchedulerHandle,
    pub tracker: Tracker,
}

impl AppState {
    pub fn new(scheduler: SchedulerHandle, tracker: Tracker) -> Self {
        let (bus, _) = broadcast::channel(256);
        Self {
            bus,
            build: BuildInfo {
                service: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            },
            status: Arc::new(RwLock::new(StatusSnapshot {
                daemon_uptime_secs: 0,
                scheduler_paused: false,
                notes: None,
            })),
            scheduler,
            tracker,
        }
    }
}

static START: OnceLock<Instant> = OnceLock::new();

pub fn uptime_secs() -> u64 {
    START.get_or_init(Instant::now).elapsed().as_secs()
}

pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts_millis = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis });
        }
    });
}
