//! shakefollow-daemon entry point.
//!
//! Thin by design: loads config, connects and migrates the event store,
//! starts the scheduler loop, wires middleware, and starts the HTTP
//! control/status surface. Route handlers live in `routes.rs`; shared state
//! types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use shakefollow_config::{load_layered_yaml, Settings};
use shakefollow_daemon::{routes, state};
use shakefollow_policy::PolicyRegistry;
use shakefollow_scheduler::{Scheduler, WorkerContext};
use shakefollow_tracker::Tracker;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config_paths = config_paths_from_env();
    let loaded = load_layered_yaml(&config_paths.iter().map(String::as_str).collect::<Vec<_>>())
        .context("load layered config")?;
    let settings = Settings::from_json(&loaded.config_json).context("parse settings")?;
    info!(hash = %loaded.config_hash, "configuration loaded");

    let pool = shakefollow_store::connect_from_env().await.context("connect event store")?;
    shakefollow_store::migrate(&pool).await.context("migrate event store")?;

    let tracker = Tracker::new(pool);
    let policies = PolicyRegistry::default_registry();
    let smtp = shakefollow_config::secrets::load_smtp_credentials_from_env().ok();

    let ctx = WorkerContext::new(tracker.clone(), policies, &settings, smtp).context("build worker context")?;
    let (scheduler, handle) = Scheduler::new(
        ctx,
        Duration::from_secs(settings.scheduler.poll_interval_secs),
        settings.scheduler.worker_pool_size,
    );
    tokio::spawn(scheduler.run(None));

    let shared = Arc::new(state::AppState::new(handle, tracker));
    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8977)));
    info!("shakefollow-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

fn config_paths_from_env() -> Vec<String> {
    std::env::var("SHAKEFOLLOW_CONFIG_PATHS")
        .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["config/base.yaml".to_string()])
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("SHAKEFOLLOW_DAEMON_ADDR").ok()?.parse().ok()
}

fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ];

    let origins: Vec<HeaderValue> = allowed_origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
