//! Durable, thread-safe persistence of `ScheduledQuery` rows.
//!
//! Postgres is the journaling, concurrent-reader-friendly store named in the
//! design: writes are serialized at the row level by the database itself
//! (`FOR UPDATE SKIP LOCKED` for claims, `ON CONFLICT` for idempotent
//! inserts) rather than by an in-process mutex, so readers never block behind
//! a writer holding an unrelated key.

pub mod error;
pub mod row;

pub use error::StoreError;
pub use row::EventTrackerRow;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use shakefollow_schemas::{QueryStatus, ScheduledQuery, ScheduledQueryKey};
use sqlx::PgPool;
use tracing::{instrument, warn};

pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var("SHAKEFOLLOW_DATABASE_URL")
        .context("missing env SHAKEFOLLOW_DATABASE_URL")?;
    PgPool::connect(&url)
        .await
        .context("connect to event store database failed")
}

pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("event_tracker migration failed")?;
    Ok(())
}

/// Test helper: connect via `SHAKEFOLLOW_DATABASE_URL` and ensure migrations
/// are applied. Integration tests in this workspace are `#[ignore]`d by
/// default and opt in with `-- --ignored` once that env var points at a
/// reachable Postgres instance.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Insert a row. Duplicate composite key is a soft failure: logged and
/// skipped, never raised to the caller. Returns `true` if the row was
/// actually inserted.
#[instrument(skip(pool, row), fields(key = %row.key))]
pub async fn add(pool: &PgPool, row: &ScheduledQuery) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO event_tracker (
            event_id, service, current_delay_minutes, status,
            origin_time, last_update_time, last_query_time, next_query_time,
            next_delay_minutes, retry_count, last_error, expiration_time,
            priority, emsc_alert_json, last_modified
        )
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
        ON CONFLICT (event_id, service, current_delay_minutes) DO NOTHING
        "#,
    )
    .bind(&row.key.event_id)
    .bind(&row.key.service)
    .bind(row.key.current_delay_minutes)
    .bind(row.status.as_str())
    .bind(row.origin_time)
    .bind(row.last_update_time)
    .bind(row.last_query_time)
    .bind(row.next_query_time)
    .bind(row.next_delay_minutes)
    .bind(row.retry_count)
    .bind(&row.last_error)
    .bind(row.expiration_time)
    .bind(row.priority)
    .bind(&row.emsc_alert_json)
    .bind(row.last_modified)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        warn!(key = %row.key, "duplicate key on add(); skipped");
        return Ok(false);
    }
    Ok(true)
}

/// All rows where `status = PENDING AND next_query_time <= now`, ordered by
/// `(priority desc, next_query_time asc)`. `service` optionally filters.
#[instrument(skip(pool))]
pub async fn fetch_due(
    pool: &PgPool,
    service: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<ScheduledQuery>, StoreError> {
    let rows: Vec<EventTrackerRow> = match service {
        Some(svc) => {
            sqlx::query_as(
                r#"
                SELECT * FROM event_tracker
                WHERE status = 'PENDING' AND next_query_time <= $1 AND service = $2
                ORDER BY priority DESC, next_query_time ASC, event_id ASC
                "#,
            )
            .bind(now)
            .bind(svc)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                r#"
                SELECT * FROM event_tracker
                WHERE status = 'PENDING' AND next_query_time <= $1
                ORDER BY priority DESC, next_query_time ASC, event_id ASC
                "#,
            )
            .bind(now)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows
        .into_iter()
        .filter_map(|r| {
            let key_str = format!("{}/{}/{}", r.event_id, r.service, r.current_delay_minutes);
            let decoded = r.into_scheduled_query();
            if decoded.is_none() {
                warn!(key = %key_str, "dropped row with unrecognized status during fetch_due");
            }
            decoded
        })
        .collect())
}

/// Point lookup by composite key.
pub async fn get(pool: &PgPool, key: &ScheduledQueryKey) -> Result<Option<ScheduledQuery>, StoreError> {
    let row: Option<EventTrackerRow> = sqlx::query_as(
        "SELECT * FROM event_tracker WHERE event_id = $1 AND service = $2 AND current_delay_minutes = $3",
    )
    .bind(&key.event_id)
    .bind(&key.service)
    .bind(key.current_delay_minutes)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|r| r.into_scheduled_query()))
}

/// Every row for one event, across every service and stage, ordered by
/// `(service, current_delay_minutes)`. Powers the daemon's per-event status
/// endpoint; unlike [`get`], this does not require the caller to already
/// know which service/stage rows exist.
#[instrument(skip(pool))]
pub async fn get_by_event_id(pool: &PgPool, event_id: &str) -> Result<Vec<ScheduledQuery>, StoreError> {
    let rows: Vec<EventTrackerRow> = sqlx::query_as(
        r#"
        SELECT * FROM event_tracker
        WHERE event_id = $1
        ORDER BY service ASC, current_delay_minutes ASC
        "#,
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(|r| r.into_scheduled_query()).collect())
}

/// Atomically transition PENDING -> PROCESSING on the exact key. Returns
/// `true` iff this call performed the transition (a losing racer observes
/// zero rows affected and returns `false`).
#[instrument(skip(pool))]
pub async fn claim_pending(pool: &PgPool, key: &ScheduledQueryKey) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE event_tracker
        SET status = 'PROCESSING', last_modified = now()
        WHERE event_id = $1 AND service = $2 AND current_delay_minutes = $3
          AND status = 'PENDING'
        "#,
    )
    .bind(&key.event_id)
    .bind(&key.service)
    .bind(key.current_delay_minutes)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Atomic partial update. Silently ignores an empty update set (no fields
/// set means no-op, not an error).
#[derive(Debug, Default, Clone)]
pub struct UpdateFields {
    pub status: Option<QueryStatus>,
    pub last_update_time: Option<DateTime<Utc>>,
    pub last_query_time: Option<DateTime<Utc>>,
    pub next_query_time: Option<DateTime<Utc>>,
    pub retry_count: Option<i32>,
    pub last_error: Option<Option<String>>,
    pub origin_time: Option<DateTime<Utc>>,
    pub emsc_alert_json: Option<Option<String>>,
}

impl UpdateFields {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.last_update_time.is_none()
            && self.last_query_time.is_none()
            && self.next_query_time.is_none()
            && self.retry_count.is_none()
            && self.last_error.is_none()
            && self.origin_time.is_none()
            && self.emsc_alert_json.is_none()
    }
}

#[instrument(skip(pool, fields))]
pub async fn update_fields(
    pool: &PgPool,
    key: &ScheduledQueryKey,
    fields: UpdateFields,
) -> Result<(), StoreError> {
    if fields.is_empty() {
        return Ok(());
    }

    let mut builder = sqlx::QueryBuilder::new("UPDATE event_tracker SET ");
    let mut first = true;

    macro_rules! set_field {
        ($name:literal, $val:expr) => {{
            if !first {
                builder.push(", ");
            }
            first = false;
            builder.push(concat!($name, " = "));
            builder.push_bind($val);
        }};
    }

    if let Some(v) = fields.status {
        set_field!("status", v.as_str());
    }
    if let Some(v) = fields.last_update_time {
        set_field!("last_update_time", v);
    }
    if let Some(v) = fields.last_query_time {
        set_field!("last_query_time", v);
    }
    if let Some(v) = fields.next_query_time {
        set_field!("next_query_time", v);
    }
    if let Some(v) = fields.retry_count {
        set_field!("retry_count", v);
    }
    if let Some(v) = fields.last_error {
        set_field!("last_error", v);
    }
    if let Some(v) = fields.origin_time {
        set_field!("origin_time", v);
    }
    if let Some(v) = fields.emsc_alert_json {
        set_field!("emsc_alert_json", v);
    }

    builder.push(", last_modified = now() WHERE event_id = ");
    builder.push_bind(&key.event_id);
    builder.push(" AND service = ");
    builder.push_bind(&key.service);
    builder.push(" AND current_delay_minutes = ");
    builder.push_bind(key.current_delay_minutes);

    builder.build().execute(pool).await?;
    Ok(())
}

pub async fn mark_completed(pool: &PgPool, key: &ScheduledQueryKey, now: DateTime<Utc>) -> Result<(), StoreError> {
    update_fields(
        pool,
        key,
        UpdateFields {
            status: Some(QueryStatus::Completed),
            last_query_time: Some(now),
            ..Default::default()
        },
    )
    .await
}

pub async fn mark_failed(
    pool: &PgPool,
    key: &ScheduledQueryKey,
    error: impl Into<String>,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    update_fields(
        pool,
        key,
        UpdateFields {
            status: Some(QueryStatus::Incomplete),
            last_error: Some(Some(error.into())),
            last_query_time: Some(now),
            ..Default::default()
        },
    )
    .await
}

/// Add `delta_minutes` to the row's current `next_query_time` and revert it
/// to PENDING so it becomes eligible again — the explicit revert the worker
/// redesign note requires instead of leaving a row PROCESSING-forever.
#[instrument(skip(pool))]
pub async fn defer(pool: &PgPool, key: &ScheduledQueryKey, delta_minutes: i64) -> Result<(), StoreError> {
    let current = get(pool, key).await?;
    let Some(current) = current else {
        return Ok(());
    };
    let new_next = current.next_query_time + Duration::minutes(delta_minutes);
    update_fields(
        pool,
        key,
        UpdateFields {
            status: Some(QueryStatus::Pending),
            next_query_time: Some(new_next),
            ..Default::default()
        },
    )
    .await
}

/// Delete all rows with `expiration_time <= now`. Returns the number of
/// rows purged.
#[instrument(skip(pool))]
pub async fn cleanup_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM event_tracker WHERE expiration_time <= $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Update `last_update_time`, `origin_time`, and `emsc_alert_json` across
/// every non-terminal row of one `(event_id, service)` series, touching
/// nothing else — schedule and retry state are untouched.
#[instrument(skip(pool, alert_json))]
pub async fn refresh_metadata_after_emsc_update(
    pool: &PgPool,
    event_id: &str,
    service: &str,
    new_last_update_time: DateTime<Utc>,
    origin_time: Option<DateTime<Utc>>,
    alert_json: Option<String>,
) -> Result<u64, StoreError> {
    let mut builder = sqlx::QueryBuilder::new(
        "UPDATE event_tracker SET last_update_time = ",
    );
    builder.push_bind(new_last_update_time);

    if let Some(ot) = origin_time {
        builder.push(", origin_time = ");
        builder.push_bind(ot);
    }
    if let Some(aj) = alert_json {
        builder.push(", emsc_alert_json = ");
        builder.push_bind(aj);
    }
    builder.push(", last_modified = now() WHERE event_id = ");
    builder.push_bind(event_id);
    builder.push(" AND service = ");
    builder.push_bind(service);
    builder.push(" AND next_delay_minutes IS NOT NULL");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_fields_is_empty_by_default() {
        assert!(UpdateFields::default().is_empty());
    }

    #[test]
    fn update_fields_not_empty_with_one_field_set() {
        let f = UpdateFields {
            retry_count: Some(1),
            ..Default::default()
        };
        assert!(!f.is_empty());
    }
}
