//! Wire and domain record types shared across the follow-up pipeline.
//!
//! Nothing in this crate performs IO. Every type here is a plain, concretely
//! fielded record — no duck-typed grab-bag container is surfaced across a
//! component boundary.

pub mod query;
pub mod solution;
pub mod station;

pub use query::{QueryStatus, ScheduledQuery, ScheduledQueryKey};
pub use solution::{FinderChannel, FinderEvent, FinderRupture, FinderSolution, RupturePoint};
pub use station::{ProviderSource, RawStation};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action carried by an inbound alert record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Create,
    Update,
}

/// Alert ingress wire record. Field names follow the upstream feed exactly
/// (`unid`, `time`, `lastupdate`, `flynn_region`); unknown fields are ignored
/// by `serde` at the deserialization boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub unid: String,
    pub time: DateTime<Utc>,
    pub lastupdate: DateTime<Utc>,
    pub action: AlertAction,
    pub mag: f64,
    pub flynn_region: String,
    /// Verbatim JSON of the whole record, preserved for observability.
    #[serde(skip)]
    pub raw_json: String,
}
