//! shakefollow-cli: operator entry point mirroring the legacy one-shot
//! follow-up run, plus maintenance subcommands against the event store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shakefollow_config::{load_layered_yaml, Settings};
use shakefollow_policy::PolicyRegistry;
use shakefollow_schemas::{QueryStatus, ScheduledQueryKey};
use shakefollow_scheduler::WorkerContext;
use shakefollow_tracker::Tracker;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "shakefollow-cli", about = "Operator CLI for the follow-up pipeline")]
struct Cli {
    /// Comma-separated layered config paths, later files override earlier ones.
    #[arg(long, global = true, default_value = "config/base.yaml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the follow-up pipeline once for a single event, bypassing the
    /// scheduler's own poll/dispatch loop.
    Run(RunArgs),
    /// Event-store maintenance.
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
    /// Print the canonical config hash for the given config paths.
    ConfigHash,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Event ID to process. Defaults to the configured test event when
    /// `--test` is set.
    #[arg(long)]
    event_id: Option<String>,
    /// Runs against the configured test event id instead of `--event-id`.
    #[arg(long, default_value_t = false)]
    test: bool,
    /// Carried from the legacy CLI surface; library-mode invocation is not
    /// implemented, the executable path is always used.
    #[arg(long, default_value_t = false)]
    use_lib: bool,
    /// Carried from the legacy CLI surface; SeisComp export is out of scope.
    #[arg(long, default_value_t = false)]
    with_seiscomp: bool,
    #[arg(long, default_value = "INFO")]
    verbosity: String,
    #[arg(long)]
    log_file: Option<String>,
    /// Elapsed-delay stage (minutes) to label this ad hoc run under.
    #[arg(long, default_value_t = 0)]
    delay_minutes: i32,
}

#[derive(Subcommand)]
enum DbCmd {
    Migrate,
    CleanupExpired,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::from_filename(".env.local");
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => init_tracing(&args.verbosity, args.log_file.as_deref()),
        _ => init_tracing("INFO", None),
    }

    let config_paths: Vec<String> = cli.config.split(',').map(|s| s.trim().to_string()).collect();

    match cli.command {
        Commands::Run(args) => run_once(&config_paths, args).await,
        Commands::Db { cmd } => run_db_cmd(&config_paths, cmd).await,
        Commands::ConfigHash => {
            let loaded = load_layered_yaml(&config_paths.iter().map(String::as_str).collect::<Vec<_>>())?;
            println!("{}", loaded.config_hash);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_once(config_paths: &[String], args: RunArgs) -> Result<ExitCode> {
    if args.with_seiscomp {
        warn!("--with-seiscomp was requested but SeisComp export is not implemented; ignoring");
    }
    if args.use_lib {
        warn!("--use-lib was requested but library-mode invocation is not implemented; using the executable path");
    }

    let loaded = load_layered_yaml(&config_paths.iter().map(String::as_str).collect::<Vec<_>>())
        .context("load layered config")?;
    let settings = Settings::from_json(&loaded.config_json).context("parse settings")?;

    let event_id = if args.test {
        std::env::var("SHAKEFOLLOW_TEST_EVENT_ID").unwrap_or_else(|_| "20230206_0000008_KAHRAMANMARAS".to_string())
    } else {
        args.event_id.clone().context("--event-id is required unless --test is set")?
    };

    let pool = shakefollow_store::connect_from_env().await.context("connect event store")?;
    shakefollow_store::migrate(&pool).await.context("migrate event store")?;

    let tracker = Tracker::new(pool);
    let policies = PolicyRegistry::default_registry();
    let smtp = shakefollow_config::secrets::load_smtp_credentials_from_env().ok();
    let ctx = WorkerContext::new(tracker, policies, &settings, smtp).context("build worker context")?;

    let row = synthetic_row(&event_id, args.delay_minutes);

    info!(event_id = %event_id, "running follow-up pipeline once");
    match shakefollow_scheduler::execute_pipeline(&ctx, &row).await {
        Ok(()) => {
            info!(event_id = %event_id, "follow-up pipeline succeeded");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(event_id = %event_id, error = %e, "follow-up pipeline failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn synthetic_row(event_id: &str, delay_minutes: i32) -> shakefollow_schemas::ScheduledQuery {
    let now = chrono::Utc::now();
    shakefollow_schemas::ScheduledQuery {
        key: ScheduledQueryKey::new(event_id, "RRSM", delay_minutes),
        status: QueryStatus::Processing,
        origin_time: now,
        last_update_time: now,
        last_query_time: None,
        next_query_time: now,
        next_delay_minutes: None,
        retry_count: 0,
        last_error: None,
        expiration_time: now + chrono::Duration::days(1),
        priority: 0,
        emsc_alert_json: None,
        last_modified: now,
    }
}

async fn run_db_cmd(_config_paths: &[String], cmd: DbCmd) -> Result<ExitCode> {
    let pool = shakefollow_store::connect_from_env().await.context("connect event store")?;

    match cmd {
        DbCmd::Migrate => {
            shakefollow_store::migrate(&pool).await.context("migrate event store")?;
            info!("migrations applied");
        }
        DbCmd::CleanupExpired => {
            let purged = shakefollow_store::cleanup_expired(&pool, chrono::Utc::now())
                .await
                .context("cleanup expired rows")?;
            info!(purged, "expired rows removed");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbosity: &str, log_file: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.to_lowercase()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            if let Ok(file) = std::fs::File::create(path) {
                builder.with_writer(std::sync::Mutex::new(file)).init();
            } else {
                builder.init();
            }
        }
        None => builder.init(),
    }
}
