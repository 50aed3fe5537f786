use chrono::{DateTime, Utc};
use shakefollow_schemas::{QueryStatus, ScheduledQuery, ScheduledQueryKey};

/// Raw decode shape for a Postgres `event_tracker` row. Kept separate from
/// [`ScheduledQuery`] so the storage layer's column order/types don't leak
/// into the domain type, and so `status` round-trips through its string
/// representation explicitly instead of deriving `sqlx::Type`.
#[derive(Debug, sqlx::FromRow)]
pub struct EventTrackerRow {
    pub event_id: String,
    pub service: String,
    pub current_delay_minutes: i32,
    pub status: String,
    pub origin_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
    pub last_query_time: Option<DateTime<Utc>>,
    pub next_query_time: DateTime<Utc>,
    pub next_delay_minutes: Option<i32>,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub expiration_time: DateTime<Utc>,
    pub priority: i32,
    pub emsc_alert_json: Option<String>,
    pub last_modified: DateTime<Utc>,
}

impl EventTrackerRow {
    /// Decode into the domain type. Returns `None` if `status` is not one of
    /// the four known values — treated as store corruption by callers, which
    /// log and skip rather than panicking on an unrecognized row.
    pub fn into_scheduled_query(self) -> Option<ScheduledQuery> {
        let status = QueryStatus::parse(&self.status)?;
        Some(ScheduledQuery {
            key: ScheduledQueryKey {
                event_id: self.event_id,
                service: self.service,
                current_delay_minutes: self.current_delay_minutes,
            },
            status,
            origin_time: self.origin_time,
            last_update_time: self.last_update_time,
            last_query_time: self.last_query_time,
            next_query_time: self.next_query_time,
            next_delay_minutes: self.next_delay_minutes,
            retry_count: self.retry_count,
            last_error: self.last_error,
            expiration_time: self.expiration_time,
            priority: self.priority,
            emsc_alert_json: self.emsc_alert_json,
            last_modified: self.last_modified,
        })
    }
}
