//! In-process scenario tests for shakefollow-daemon's HTTP endpoints.
//!
//! Each test drives `routes::build_router` via `tower::ServiceExt::oneshot`
//! with no TCP socket bound. DB-backed (event store + engine config
//! template on disk), so these are `#[ignore]`d by default.
//!
//! Run:
//!   SHAKEFOLLOW_DATABASE_URL=... cargo test -p shakefollow-daemon --test scenario_daemon_routes -- --ignored

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use shakefollow_config::{EmitterSettings, EngineSettings, ProvidersSettings, SchedulerSettings, Settings};
use shakefollow_daemon::{routes, state};
use shakefollow_policy::PolicyRegistry;
use shakefollow_scheduler::{Scheduler, WorkerContext};
use shakefollow_schemas::{QueryStatus, ScheduledQuery, ScheduledQueryKey};
use shakefollow_tracker::Tracker;
use tower::ServiceExt;

fn pending_row(key: ScheduledQueryKey) -> ScheduledQuery {
    let now = chrono::Utc::now();
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

async fn make_state() -> (Arc<state::AppState>, tempfile::TempDir) {
    let pool = shakefollow_store::testkit_db_pool().await.expect("db pool");
    let tracker = Tracker::new(pool);

    let tmp = tempfile::tempdir().expect("tempdir");
    let config_template_path = tmp.path().join("engine_config.template");
    std::fs::write(&config_template_path, "# test engine config template\n").unwrap();

    let settings = Settings {
        database_url: "unused-in-this-test".to_string(),
        engine: EngineSettings {
            binary_path: "/bin/true".to_string(),
            config_template_path: config_template_path.to_string_lossy().to_string(),
            output_root: tmp.path().to_string_lossy().to_string(),
        },
        scheduler: SchedulerSettings { poll_interval_secs: 3600, worker_pool_size: 1 },
        emitter: EmitterSettings {
            export_root: tmp.path().to_string_lossy().to_string(),
            shakemap_command: "/bin/true".to_string(),
            smtp_host: String::new(),
            smtp_port: 587,
            notification_recipients: vec![],
        },
        providers: ProvidersSettings {
            rrsm_base_url: "http://127.0.0.1:0".to_string(),
            esm_base_url: "http://127.0.0.1:0".to_string(),
        },
        live_mode: false,
    };

    let ctx = WorkerContext::new(tracker.clone(), PolicyRegistry::default_registry(), &settings, None)
        .expect("build worker context");
    let (scheduler, handle) = Scheduler::new(ctx, Duration::from_secs(3600), 1);
    // Never ticks in these tests (hour-long interval); only the handle's
    // pause/resume flag and the tracker are exercised over HTTP.
    tokio::spawn(scheduler.run(None));

    (Arc::new(state::AppState::new(handle, tracker)), tmp)
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, serde_json::Value) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp.into_body().collect().await.expect("collect body").to_bytes();
    let json = serde_json::from_slice(&body).expect("body is valid json");
    (status, json)
}

#[tokio::test]
#[ignore]
async fn health_reports_service_name() {
    let (st, _tmp) = make_state().await;
    let router = routes::build_router(st);

    let req = Request::builder().method("GET").uri("/v1/health").body(axum::body::Body::empty()).unwrap();
    let (status, json) = call(router, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "shakefollow-daemon");
}

#[tokio::test]
#[ignore]
async fn scheduler_pause_then_resume_toggles_status() {
    let (st, _tmp) = make_state().await;

    let pause_req = Request::builder().method("POST").uri("/v1/scheduler/pause").body(axum::body::Body::empty()).unwrap();
    let (status, json) = call(routes::build_router(Arc::clone(&st)), pause_req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["paused"], true);

    let status_req = Request::builder().method("GET").uri("/v1/status").body(axum::body::Body::empty()).unwrap();
    let (_, json) = call(routes::build_router(Arc::clone(&st)), status_req).await;
    assert_eq!(json["scheduler_paused"], true);

    let resume_req = Request::builder().method("POST").uri("/v1/scheduler/resume").body(axum::body::Body::empty()).unwrap();
    let (_, json) = call(routes::build_router(st), resume_req).await;
    assert_eq!(json["paused"], false);
}

#[tokio::test]
#[ignore]
async fn event_status_returns_404_for_unknown_event_and_200_once_seeded() {
    let (st, _tmp) = make_state().await;
    let pool = st.tracker.pool().clone();
    let key = ScheduledQueryKey::new("daemon-route-test-event", "RRSM", 0);

    sqlx::query("delete from event_tracker where event_id = $1").bind(&key.event_id).execute(&pool).await.unwrap();

    let missing_req = Request::builder()
        .method("GET")
        .uri(format!("/v1/events/{}", key.event_id))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = call(routes::build_router(Arc::clone(&st)), missing_req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    shakefollow_store::add(&pool, &pending_row(key.clone())).await.expect("insert row");

    let found_req = Request::builder()
        .method("GET")
        .uri(format!("/v1/events/{}", key.event_id))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, json) = call(routes::build_router(st), found_req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stages"].as_array().unwrap().len(), 1);
}
