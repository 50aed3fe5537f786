//! Axum router and HTTP handlers for shakefollow-daemon.
//!
//! `build_router` is the single entry point; `main.rs` attaches middleware
//! layers after this call so tests can compose the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::state::{uptime_secs, AppState, BusMsg};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/events/:event_id", get(event_status))
        .route("/v1/scheduler/pause", post(scheduler_pause))
        .route("/v1/scheduler/resume", post(scheduler_resume))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    version: &'static str,
}

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let mut snap = st.status.read().await.clone();
    snap.daemon_uptime_secs = uptime_secs();
    snap.scheduler_paused = st.scheduler.is_paused();

    let _ = st.bus.send(BusMsg::Status(snap.clone()));
    (StatusCode::OK, Json(snap))
}

#[derive(Serialize)]
struct EventStatusResponse {
    event_id: String,
    stages: Vec<shakefollow_schemas::ScheduledQuery>,
}

pub(crate) async fn event_status(State(st): State<Arc<AppState>>, Path(event_id): Path<String>) -> Response {
    match st.tracker.get_event_series(&event_id).await {
        Ok(stages) if stages.is_empty() => {
            (StatusCode::NOT_FOUND, Json(EventStatusResponse { event_id, stages })).into_response()
        }
        Ok(stages) => (StatusCode::OK, Json(EventStatusResponse { event_id, stages })).into_response(),
        Err(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
        }
    }
}

#[derive(Serialize)]
struct SchedulerControlResponse {
    paused: bool,
}

pub(crate) async fn scheduler_pause(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    st.scheduler.pause();
    info!("scheduler paused via control API");
    let _ = st.bus.send(BusMsg::LogLine {
        level: "INFO".to_string(),
        msg: "scheduler paused".to_string(),
    });
    (StatusCode::OK, Json(SchedulerControlResponse { paused: true }))
}

pub(crate) async fn scheduler_resume(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    st.scheduler.resume();
    info!("scheduler resumed via control API");
    let _ = st.bus.send(BusMsg::LogLine {
        level: "INFO".to_string(),
        msg: "scheduler resumed".to_string(),
    });
    (StatusCode::OK, Json(SchedulerControlResponse { paused: false }))
}

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(rx: broadcast::Receiver<BusMsg>) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Status(_) => "status",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None,
        }
    })
}

