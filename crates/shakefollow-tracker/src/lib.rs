//! Domain facade over the event store: translates worker/scheduler intent
//! ("register this event", "mark this stage done") into store operations,
//! without exposing row-level SQL to callers.

use chrono::{DateTime, Duration, Utc};
use shakefollow_policy::Policy;
use shakefollow_schemas::{QueryStatus, ScheduledQuery, ScheduledQueryKey};
use shakefollow_store::{StoreError, UpdateFields};
use sqlx::PgPool;
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct Tracker {
    pool: PgPool,
}

impl Tracker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for callers (the scheduler's poll loop) that
    /// need `shakefollow_store` operations this facade does not expose.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// For each of `policy`'s scheduled delays, create one row. Each row's
    /// `next_delay_minutes` is the following delay in the series, or `None`
    /// for the last (terminal) row. Returns the count of rows actually
    /// inserted (duplicates are skipped, not counted, consistent with
    /// `add`'s soft-failure contract).
    #[instrument(skip(self, policy, alert_json))]
    pub async fn batch_register_from_policy(
        &self,
        event_id: &str,
        policy: &dyn Policy,
        origin_time: DateTime<Utc>,
        last_update_time: DateTime<Utc>,
        alert_json: Option<String>,
        expiration_days: i64,
    ) -> Result<usize, TrackerError> {
        let delays = policy.delays().to_vec();
        let now = Utc::now();
        let expiration_time = now + Duration::days(expiration_days);
        let mut created = 0usize;

        for (i, &delay) in delays.iter().enumerate() {
            let next_delay_minutes = delays.get(i + 1).copied();
            let row = ScheduledQuery {
                key: ScheduledQueryKey::new(event_id, policy.service_name(), delay),
                status: QueryStatus::Pending,
                origin_time,
                last_update_time,
                last_query_time: None,
                next_query_time: now + Duration::minutes(delay as i64),
                next_delay_minutes,
                retry_count: 0,
                last_error: None,
                expiration_time,
                priority: 0,
                emsc_alert_json: alert_json.clone(),
                last_modified: now,
            };
            if shakefollow_store::add(&self.pool, &row).await? {
                created += 1;
            }
        }

        Ok(created)
    }

    /// Single-stage variant of [`Tracker::batch_register_from_policy`].
    #[instrument(skip(self, alert_json))]
    #[allow(clippy::too_many_arguments)]
    pub async fn register_new_schedule(
        &self,
        event_id: &str,
        service: &str,
        current_delay_minutes: i32,
        next_delay_minutes: Option<i32>,
        origin_time: DateTime<Utc>,
        last_update_time: DateTime<Utc>,
        next_query_time: DateTime<Utc>,
        alert_json: Option<String>,
        expiration_days: i64,
    ) -> Result<bool, TrackerError> {
        let now = Utc::now();
        let row = ScheduledQuery {
            key: ScheduledQueryKey::new(event_id, service, current_delay_minutes),
            status: QueryStatus::Pending,
            origin_time,
            last_update_time,
            last_query_time: None,
            next_query_time,
            next_delay_minutes,
            retry_count: 0,
            last_error: None,
            expiration_time: now + Duration::days(expiration_days),
            priority: 0,
            emsc_alert_json: alert_json,
            last_modified: now,
        };
        Ok(shakefollow_store::add(&self.pool, &row).await?)
    }

    /// Update `last_update_time`/`origin_time`/`emsc_alert_json` on every
    /// non-terminal row of the `(event_id, service)` series. Never touches
    /// status, schedule, or retry state.
    #[instrument(skip(self, alert_json))]
    pub async fn refresh_metadata_after_emsc_update(
        &self,
        event_id: &str,
        service: &str,
        new_last_update_time: DateTime<Utc>,
        origin_time: Option<DateTime<Utc>>,
        alert_json: Option<String>,
    ) -> Result<u64, TrackerError> {
        Ok(shakefollow_store::refresh_metadata_after_emsc_update(
            &self.pool,
            event_id,
            service,
            new_last_update_time,
            origin_time,
            alert_json,
        )
        .await?)
    }

    /// Atomically claims the row for processing. Returns `false` if another
    /// worker already claimed it or the row is not PENDING.
    pub async fn mark_as_processing(&self, key: &ScheduledQueryKey) -> Result<bool, TrackerError> {
        Ok(shakefollow_store::claim_pending(&self.pool, key).await?)
    }

    pub async fn mark_completed(&self, key: &ScheduledQueryKey) -> Result<(), TrackerError> {
        Ok(shakefollow_store::mark_completed(&self.pool, key, Utc::now()).await?)
    }

    pub async fn mark_failed(&self, key: &ScheduledQueryKey, err: impl Into<String>) -> Result<(), TrackerError> {
        Ok(shakefollow_store::mark_failed(&self.pool, key, err, Utc::now()).await?)
    }

    /// Increments `retry_count` and returns the new value. `retry_count` is
    /// monotonically non-decreasing by construction: this is the only write
    /// path to the column.
    pub async fn increment_retry(&self, key: &ScheduledQueryKey) -> Result<i32, TrackerError> {
        let current = shakefollow_store::get(&self.pool, key).await?;
        let next = current.map(|r| r.retry_count + 1).unwrap_or(1);
        shakefollow_store::update_fields(
            &self.pool,
            key,
            UpdateFields {
                retry_count: Some(next),
                ..Default::default()
            },
        )
        .await?;
        Ok(next)
    }

    /// Defers the row by `minutes` and reverts it to PENDING so it becomes
    /// eligible again on the next poll.
    pub async fn defer_event(&self, key: &ScheduledQueryKey, minutes: i64) -> Result<(), TrackerError> {
        Ok(shakefollow_store::defer(&self.pool, key, minutes).await?)
    }

    /// Full row metadata, including the `region` convenience field parsed
    /// from `emsc_alert_json` (parse failure yields `None`, never an error).
    pub async fn get_event_meta(&self, key: &ScheduledQueryKey) -> Result<Option<ScheduledQuery>, TrackerError> {
        Ok(shakefollow_store::get(&self.pool, key).await?)
    }

    /// Every scheduled stage across every service for one event, for the
    /// daemon's per-event status view.
    pub async fn get_event_series(&self, event_id: &str) -> Result<Vec<ScheduledQuery>, TrackerError> {
        Ok(shakefollow_store::get_by_event_id(&self.pool, event_id).await?)
    }

    pub async fn cleanup_expired(&self) -> Result<u64, TrackerError> {
        Ok(shakefollow_store::cleanup_expired(&self.pool, Utc::now()).await?)
    }
}
