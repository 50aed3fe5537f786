//! Everything a worker needs to run one stage end to end, assembled once at
//! the composition root and shared read-only across every spawned task.

use anyhow::{Context, Result};
use shakefollow_config::{EmitterSettings, Settings, SmtpCredentials};
use shakefollow_policy::PolicyRegistry;
use shakefollow_providers::ProviderClient;
use shakefollow_tracker::Tracker;
use std::path::PathBuf;

pub struct WorkerContext {
    pub tracker: Tracker,
    pub policies: PolicyRegistry,
    pub rrsm: ProviderClient,
    pub esm: ProviderClient,
    pub engine_binary_path: PathBuf,
    pub engine_config_template: String,
    pub engine_output_root: PathBuf,
    pub emitter: EmitterSettings,
    pub smtp: Option<SmtpCredentials>,
    pub live_mode: bool,
}

impl WorkerContext {
    /// Reads the engine config template from disk once; every stage reuses
    /// the same in-memory copy rather than re-reading the file per run.
    pub fn new(
        tracker: Tracker,
        policies: PolicyRegistry,
        settings: &Settings,
        smtp: Option<SmtpCredentials>,
    ) -> Result<Self> {
        let engine_config_template = std::fs::read_to_string(&settings.engine.config_template_path)
            .with_context(|| format!("read engine config template: {}", settings.engine.config_template_path))?;

        Ok(Self {
            tracker,
            policies,
            rrsm: shakefollow_providers::rrsm::client(settings.providers.rrsm_base_url.clone()),
            esm: shakefollow_providers::esm::client(settings.providers.esm_base_url.clone()),
            engine_binary_path: PathBuf::from(&settings.engine.binary_path),
            engine_config_template,
            engine_output_root: PathBuf::from(&settings.engine.output_root),
            emitter: settings.emitter.clone(),
            smtp,
            live_mode: settings.live_mode,
        })
    }
}
