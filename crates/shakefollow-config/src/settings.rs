use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed view over the canonical config JSON produced by
/// [`crate::load_layered_yaml`]. Kept separate from the raw `Value` so
/// callers get compile-time field checking instead of pointer lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub engine: EngineSettings,
    pub scheduler: SchedulerSettings,
    pub emitter: EmitterSettings,
    pub providers: ProvidersSettings,
    #[serde(default)]
    pub live_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersSettings {
    pub rrsm_base_url: String,
    pub esm_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub binary_path: String,
    pub config_template_path: String,
    pub output_root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_worker_pool_size() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterSettings {
    pub export_root: String,
    pub shakemap_command: String,
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub notification_recipients: Vec<String>,
}

fn default_smtp_port() -> u16 {
    587
}

impl Settings {
    pub fn from_json(v: &Value) -> Result<Self> {
        serde_json::from_value(v.clone()).context("config does not match expected settings shape")
    }
}
