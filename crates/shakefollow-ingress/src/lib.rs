//! Alert ingress: filters inbound alert records and routes them to the
//! tracker. Owns no event state of its own — every effect lands in the
//! store via [`shakefollow_tracker::Tracker`].

use shakefollow_policy::PolicyRegistry;
use shakefollow_schemas::{AlertAction, AlertRecord};
use shakefollow_tracker::{Tracker, TrackerError};
use tracing::{info, instrument};

#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),
}

#[derive(Debug, Clone)]
pub struct IngressConfig {
    /// Substrings matched case-insensitively against `flynn_region`. The
    /// tokens "world" or "all" (case-insensitive) disable the filter.
    pub target_regions: Vec<String>,
    pub min_magnitude: f64,
    /// Default expiration window for newly registered series.
    pub expiration_days: i64,
}

impl IngressConfig {
    fn region_filter_disabled(&self) -> bool {
        self.target_regions
            .iter()
            .any(|t| matches!(t.to_ascii_lowercase().as_str(), "world" | "all"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressOutcome {
    Filtered,
    Registered { rows_created: usize },
    Refreshed { rows_updated: usize },
}

pub struct AlertIngress {
    tracker: Tracker,
    policies: PolicyRegistry,
    config: IngressConfig,
}

impl AlertIngress {
    pub fn new(tracker: Tracker, policies: PolicyRegistry, config: IngressConfig) -> Self {
        Self {
            tracker,
            policies,
            config,
        }
    }

    fn passes_filters(&self, alert: &AlertRecord) -> bool {
        if alert.mag < self.config.min_magnitude {
            return false;
        }
        if self.config.region_filter_disabled() {
            return true;
        }
        let region = alert.flynn_region.to_ascii_lowercase();
        self.config
            .target_regions
            .iter()
            .any(|t| region.contains(&t.to_ascii_lowercase()))
    }

    #[instrument(skip(self, alert), fields(event_id = %alert.unid, action = ?alert.action))]
    pub async fn handle_alert(&self, alert: &AlertRecord) -> Result<IngressOutcome, IngressError> {
        if !self.passes_filters(alert) {
            info!("alert filtered by region/magnitude policy");
            return Ok(IngressOutcome::Filtered);
        }

        let service_names: Vec<String> = self.policies.service_names().map(|s| s.to_string()).collect();

        match alert.action {
            AlertAction::Create => {
                let mut rows_created = 0usize;
                for service in &service_names {
                    let Some(policy) = self.policies.get(service) else {
                        continue;
                    };
                    rows_created += self
                        .tracker
                        .batch_register_from_policy(
                            &alert.unid,
                            policy.as_ref(),
                            alert.time,
                            alert.lastupdate,
                            Some(alert.raw_json.clone()),
                            self.config.expiration_days,
                        )
                        .await?;
                }
                Ok(IngressOutcome::Registered { rows_created })
            }
            AlertAction::Update => {
                let mut rows_updated = 0usize;
                for service in &service_names {
                    rows_updated += self
                        .tracker
                        .refresh_metadata_after_emsc_update(
                            &alert.unid,
                            service,
                            alert.lastupdate,
                            Some(alert.time),
                            Some(alert.raw_json.clone()),
                        )
                        .await? as usize;
                }
                Ok(IngressOutcome::Refreshed { rows_updated })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(regions: &[&str], min_mag: f64) -> IngressConfig {
        IngressConfig {
            target_regions: regions.iter().map(|s| s.to_string()).collect(),
            min_magnitude: min_mag,
            expiration_days: 5,
        }
    }

    #[test]
    fn world_token_disables_region_filter() {
        let c = config(&["world"], 0.0);
        assert!(c.region_filter_disabled());
    }

    #[test]
    fn specific_region_does_not_disable_filter() {
        let c = config(&["Turkey", "Greece"], 0.0);
        assert!(!c.region_filter_disabled());
    }
}
