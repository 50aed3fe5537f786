//! DB-backed claim race test.
//!
//! Ignored by default: requires a Postgres instance reachable via
//! SHAKEFOLLOW_DATABASE_URL.
//!
//! Run:
//!   SHAKEFOLLOW_DATABASE_URL=... cargo test -p shakefollow-store --test claim_pending_race -- --ignored

use chrono::Utc;
use shakefollow_schemas::{QueryStatus, ScheduledQuery, ScheduledQueryKey};

fn pending_row(key: ScheduledQueryKey) -> ScheduledQuery {
    let now = Utc::now();
    ScheduledQuery {
        key,
        status: QueryStatus::Pending,
        origin_time: now,
        last_update_time: now,
        last_query_time: None,
        next_query_time: now,
        next_delay_minutes: Some(5),
        retry_count: 0,
        last_error: None,
        expiration_time: now + chrono::Duration::days(1),
        priority: 0,
        emsc_alert_json: None,
        last_modified: now,
    }
}

#[tokio::test]
#[ignore]
async fn only_one_concurrent_claim_wins() {
    let pool = shakefollow_store::testkit_db_pool().await.expect("db pool");
    let key = ScheduledQueryKey::new("claim-race-test", "RRSM", 0);

    sqlx::query("delete from event_tracker where event_id = $1")
        .bind(&key.event_id)
        .execute(&pool)
        .await
        .expect("clear row");

    shakefollow_store::add(&pool, &pending_row(key.clone())).await.expect("insert row");

    let (a, b) = tokio::join!(
        shakefollow_store::claim_pending(&pool, &key),
        shakefollow_store::claim_pending(&pool, &key),
    );
    let (a, b) = (a.expect("claim a"), b.expect("claim b"));

    assert_ne!(a, b, "exactly one of two concurrent claims must win");
}

#[tokio::test]
#[ignore]
async fn fetch_due_excludes_processing_rows() {
    let pool = shakefollow_store::testkit_db_pool().await.expect("db pool");
    let key = ScheduledQueryKey::new("fetch-due-test", "RRSM", 0);

    sqlx::query("delete from event_tracker where event_id = $1")
        .bind(&key.event_id)
        .execute(&pool)
        .await
        .expect("clear row");

    shakefollow_store::add(&pool, &pending_row(key.clone())).await.expect("insert row");
    assert!(shakefollow_store::claim_pending(&pool, &key).await.expect("claim"));

    let due = shakefollow_store::fetch_due(&pool, Some("RRSM"), Utc::now()).await.expect("fetch_due");
    assert!(due.iter().all(|r| r.key != key));
}
