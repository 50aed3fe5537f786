use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a [`ScheduledQuery`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStatus {
    Pending,
    Processing,
    Completed,
    Incomplete,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Pending => "PENDING",
            QueryStatus::Processing => "PROCESSING",
            QueryStatus::Completed => "COMPLETED",
            QueryStatus::Incomplete => "INCOMPLETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(QueryStatus::Pending),
            "PROCESSING" => Some(QueryStatus::Processing),
            "COMPLETED" => Some(QueryStatus::Completed),
            "INCOMPLETE" => Some(QueryStatus::Incomplete),
            _ => None,
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite primary key of a [`ScheduledQuery`] row.
///
/// Keyed on `(event_id, service, current_delay_minutes)`, not merely
/// `(event_id, service)` — the store carries one row per scheduled stage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScheduledQueryKey {
    pub event_id: String,
    pub service: String,
    pub current_delay_minutes: i32,
}

impl ScheduledQueryKey {
    pub fn new(event_id: impl Into<String>, service: impl Into<String>, current_delay_minutes: i32) -> Self {
        Self {
            event_id: event_id.into(),
            service: service.into(),
            current_delay_minutes,
        }
    }
}

impl fmt::Display for ScheduledQueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.event_id, self.service, self.current_delay_minutes)
    }
}

/// The atomic unit of work: one scheduled follow-up query at a fixed elapsed
/// delay after an event's origin time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledQuery {
    pub key: ScheduledQueryKey,
    pub status: QueryStatus,
    pub origin_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
    pub last_query_time: Option<DateTime<Utc>>,
    pub next_query_time: DateTime<Utc>,
    /// Bucket of the following row in the same series; `None` marks the
    /// terminal stage.
    pub next_delay_minutes: Option<i32>,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub expiration_time: DateTime<Utc>,
    pub priority: i32,
    pub emsc_alert_json: Option<String>,
    pub last_modified: DateTime<Utc>,
}

impl ScheduledQuery {
    pub fn is_terminal_stage(&self) -> bool {
        self.next_delay_minutes.is_none()
    }

    /// Convenience `region` derived from `emsc_alert_json`. Parse failure
    /// (missing or malformed field) yields `None`, never an error — this
    /// mirrors `Tracker::get_event_meta`'s "never surface to caller" rule.
    pub fn region(&self) -> Option<String> {
        let raw = self.emsc_alert_json.as_ref()?;
        let v: serde_json::Value = serde_json::from_str(raw).ok()?;
        v.get("flynn_region")
            .and_then(|x| x.as_str())
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            QueryStatus::Pending,
            QueryStatus::Processing,
            QueryStatus::Completed,
            QueryStatus::Incomplete,
        ] {
            assert_eq!(QueryStatus::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn region_is_none_on_malformed_json() {
        let key = ScheduledQueryKey::new("ev1", "RRSM", 0);
        let now = Utc::now();
        let row = ScheduledQuery {
            key,
            status: QueryStatus::Pending,
            origin_time: now,
            last_update_time: now,
            last_query_time: None,
            next_query_time: now,
            next_delay_minutes: None,
            retry_count: 0,
            last_error: None,
            expiration_time: now,
            priority: 0,
            emsc_alert_json: Some("not json".to_string()),
            last_modified: now,
        };
        assert_eq!(row.region(), None);
    }
}
