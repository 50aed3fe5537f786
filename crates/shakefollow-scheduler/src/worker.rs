//! The per-event pipeline: fetch provider data, merge, format the engine
//! input, run the rupture engine, and emit results. One call to
//! [`run_stage`] handles exactly one [`ScheduledQuery`] row.

use crate::context::WorkerContext;
use crate::error::WorkerError;
use chrono::Utc;
use shakefollow_engine::FollowUpRequest;
use shakefollow_merge::{extract_raw_stations, format_engine_input, merge};
use shakefollow_providers::{ProviderBundle, ProviderEventInfo};
use shakefollow_schemas::{ProviderSource, ScheduledQuery};
use tracing::{instrument, warn};

/// Caps exponential retry backoff at one hour; `retry_count` is already
/// capped by the service's `max_retries` before this is ever called with a
/// value large enough to matter.
fn retry_backoff_minutes(retry_count: i32) -> i64 {
    let exp = retry_count.clamp(0, 6) as u32;
    (2i64.pow(exp)).min(60)
}

/// Runs one scheduled stage end to end. Never returns a pipeline error to
/// the caller: every failure is translated into a tracker resolution
/// (retry/defer or terminal mark-failed) before this returns.
#[instrument(skip(ctx, row), fields(event_id = %row.key.event_id, service = %row.key.service, delay = row.key.current_delay_minutes))]
pub async fn run_stage(ctx: &WorkerContext, row: ScheduledQuery) {
    // Final stage always runs once: pre-mark COMPLETED before attempting the
    // pipeline, so a follow-up query is never silently skipped because the
    // pipeline later fails. A failure below still overwrites this with
    // INCOMPLETE/PENDING via the normal resolution path.
    if row.is_terminal_stage() {
        if let Err(e) = ctx.tracker.mark_completed(&row.key).await {
            warn!(error = %e, "failed to pre-mark terminal stage completed");
        }
    }

    match execute_pipeline(ctx, &row).await {
        Ok(()) => {
            if let Err(e) = ctx.tracker.mark_completed(&row.key).await {
                warn!(error = %e, "failed to mark stage completed after a successful run");
            }
        }
        Err(e) => resolve_failure(ctx, &row, e).await,
    }
}

async fn resolve_failure(ctx: &WorkerContext, row: &ScheduledQuery, err: WorkerError) {
    warn!(error = %err, "stage pipeline failed");

    let retry_count = match ctx.tracker.increment_retry(&row.key).await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "failed to increment retry count; marking failed instead");
            let _ = ctx.tracker.mark_failed(&row.key, err.to_string()).await;
            return;
        }
    };

    let should_retry = ctx
        .policies
        .get(&row.key.service)
        .map(|p| p.should_retry_on_failure(retry_count))
        .unwrap_or(false);

    let resolution = if should_retry {
        ctx.tracker.defer_event(&row.key, retry_backoff_minutes(retry_count)).await
    } else {
        let resolution = ctx.tracker.mark_failed(&row.key, err.to_string()).await;
        send_failure_notification_best_effort(ctx, row, &err);
        resolution
    };

    if let Err(e) = resolution {
        warn!(error = %e, "failed to record stage resolution");
    }
}

/// A failed final run must still reach an operator: a terminal INCOMPLETE
/// sends a failure-notification email carrying the run log as attachment.
/// The log is just the worker error text, written to a scratch file for the
/// duration of the send and removed afterward; it is not an export
/// artifact, so it has no place under the event's export directory.
fn send_failure_notification_best_effort(ctx: &WorkerContext, row: &ScheduledQuery, err: &WorkerError) {
    let Some(smtp) = ctx.smtp.as_ref() else {
        return;
    };

    let event_id = row.key.event_id.as_str();
    let delay_minutes = row.key.current_delay_minutes;

    let log_path = std::env::temp_dir().join(format!("shakefollow-failure-{event_id}-{delay_minutes}.log"));
    if let Err(e) = std::fs::write(&log_path, err.to_string()) {
        warn!(error = %e, "failed to write run log for failure notification; sending without attachment");
    }

    let subject = format!("Follow-up run FAILED: {event_id} (+{delay_minutes}min)");
    let body = format!(
        "The follow-up pipeline for event {event_id} at the {delay_minutes} minute stage reached its retry limit and was marked INCOMPLETE.\n\nLast error: {err}"
    );
    let attachments: Vec<&std::path::Path> = if log_path.exists() { vec![&log_path] } else { vec![] };

    if let Err(e) = shakefollow_emit::send_notification(&ctx.emitter, smtp, &subject, &body, event_id, None, &attachments) {
        warn!(error = %e, "failure notification email failed");
    }

    let _ = std::fs::remove_file(&log_path);
}

/// Runs the fetch->merge->format->engine->emit pipeline for one row and
/// returns its outcome directly, without touching tracker state. Used by
/// [`run_stage`] (which adds the tracker bookkeeping) and by callers that
/// want a single ad hoc run, such as the CLI's `run` subcommand.
pub async fn execute_pipeline(ctx: &WorkerContext, row: &ScheduledQuery) -> Result<(), WorkerError> {
    let event_id = row.key.event_id.as_str();

    let (rrsm_result, esm_result) = tokio::join!(ctx.rrsm.fetch_bundle(event_id), ctx.esm.fetch_bundle(event_id));

    if rrsm_result.is_err() && esm_result.is_err() {
        return Err(WorkerError::BothProvidersUnreachable {
            rrsm: rrsm_result.unwrap_err().to_string(),
            esm: esm_result.unwrap_err().to_string(),
        });
    }

    let rrsm_bundle = rrsm_result.unwrap_or_else(|e| {
        warn!(error = %e, provider = "RRSM", "provider contributes no data this stage");
        ProviderBundle::default()
    });
    let esm_bundle = esm_result.unwrap_or_else(|e| {
        warn!(error = %e, provider = "ESM", "provider contributes no data this stage");
        ProviderBundle::default()
    });

    let event_info: ProviderEventInfo = rrsm_bundle
        .event_info
        .or(esm_bundle.event_info)
        .ok_or(WorkerError::NoAuthoritativeEventInfo)?;

    let rrsm_stations = extract_raw_stations(ProviderSource::Rrsm, rrsm_bundle.channels);
    let esm_stations = extract_raw_stations(ProviderSource::Esm, esm_bundle.channels);
    let merged = merge(rrsm_stations, esm_stations);

    let engine_input = format_engine_input(
        &merged,
        event_info.origin_epoch_seconds,
        event_info.lat,
        event_info.lon,
        event_info.magnitude,
        event_info.depth_km,
        ctx.live_mode,
    );

    let binary_path = ctx.engine_binary_path.clone();
    let config_template = ctx.engine_config_template.clone();
    let output_root = ctx.engine_output_root.clone();
    let catalog_event_id = event_id.to_string();
    let live_mode = ctx.live_mode;

    let solution = tokio::task::spawn_blocking(move || {
        shakefollow_engine::run_follow_up(FollowUpRequest {
            binary_path: &binary_path,
            config_template: &config_template,
            output_root: &output_root,
            catalog_event_id: &catalog_event_id,
            engine_input_blob: &engine_input.blob,
            live_mode,
        })
    })
    .await
    .map_err(|e| WorkerError::EngineTaskJoin(e.to_string()))??;

    let export_root = std::path::Path::new(&ctx.emitter.export_root);
    let exported = shakefollow_emit::export_all(&solution, export_root, event_id, row.key.current_delay_minutes)?;

    shakefollow_emit::trigger_shakemap(&ctx.emitter.shakemap_command, event_id, &exported.export_dir)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let archive = shakefollow_emit::archive_products(&exported.export_dir, &exported.export_dir, &timestamp)?;

    send_notification_best_effort(ctx, event_id, row.key.current_delay_minutes, &solution, archive.as_deref());

    Ok(())
}

fn send_notification_best_effort(
    ctx: &WorkerContext,
    event_id: &str,
    delay_minutes: i32,
    solution: &shakefollow_schemas::FinderSolution,
    archive_path: Option<&std::path::Path>,
) {
    let Some(smtp) = ctx.smtp.as_ref() else {
        return;
    };

    let subject = format!("Follow-up solution ready: {event_id} (+{delay_minutes}min)");
    let body = format!("A follow-up rupture solution was produced for event {event_id} at the {delay_minutes} minute stage.");
    let attachments: Vec<&std::path::Path> = archive_path.into_iter().collect();

    if let Err(e) = shakefollow_emit::send_notification(
        &ctx.emitter,
        smtp,
        &subject,
        &body,
        event_id,
        Some(solution),
        &attachments,
    ) {
        warn!(error = %e, "notification email failed; solution artifacts were still written");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_backoff_doubles_and_caps_at_sixty() {
        assert_eq!(retry_backoff_minutes(0), 1);
        assert_eq!(retry_backoff_minutes(1), 2);
        assert_eq!(retry_backoff_minutes(6), 60);
        assert_eq!(retry_backoff_minutes(20), 60);
    }
}
