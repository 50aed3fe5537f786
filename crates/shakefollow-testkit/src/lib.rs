//! Shared test fixtures for the follow-up pipeline crates: canned provider
//! responses, a wiremock-backed fake RRSM/ESM server, and a builder for
//! synthetic [`ScheduledQuery`] rows. Kept as its own crate so scenario
//! tests in `shakefollow-scheduler`, `shakefollow-merge`, and
//! `shakefollow-daemon` don't each reinvent the same fixtures.

use chrono::{DateTime, Utc};
use shakefollow_providers::ProviderClient;
use shakefollow_schemas::{QueryStatus, ScheduledQuery, ScheduledQueryKey};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Raw RRSM peak-motion response body for a single well-formed event: one
/// event-level hypocenter plus two amplitude records.
pub const RRSM_AMPLITUDES_FIXTURE: &str = include_str!("../fixtures/rrsm_amplitudes.json");

/// Raw ESM station response body for the same event, in ESM's own wire
/// shape (percent-g PGA, `stations` array).
pub const ESM_STATIONS_FIXTURE: &str = include_str!("../fixtures/esm_stations.json");

/// Builds a [`ScheduledQuery`] row with sane defaults, for tests that only
/// care about a handful of fields. Override what you need with struct
/// update syntax: `ScheduledQuery { retry_count: 3, ..synthetic_row(...) }`.
pub fn synthetic_row(event_id: &str, service: &str, current_delay_minutes: i32) -> ScheduledQuery {
    let now: DateTime<Utc> = Utc::now();
    ScheduledQuery {
        key: ScheduledQueryKey::new(event_id, service, current_delay_minutes),
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

/// A fake RRSM+ESM backend serving the fixture bodies above (or whatever
/// bodies the caller registers) over real HTTP, so `ProviderClient` is
/// exercised exactly as it runs in production, only the base URL differs.
pub struct FakeProviderServer {
    pub rrsm: MockServer,
    pub esm: MockServer,
}

impl FakeProviderServer {
    /// Starts both fake servers, each returning its default fixture body
    /// for any event id.
    pub async fn start() -> Self {
        let rrsm = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/event/[^/]+/amplitudes$"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RRSM_AMPLITUDES_FIXTURE))
            .mount(&rrsm)
            .await;

        let esm = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/events/[^/]+/stations$"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ESM_STATIONS_FIXTURE))
            .mount(&esm)
            .await;

        Self { rrsm, esm }
    }

    /// Starts both fake servers with the RRSM endpoint returning a 503,
    /// forcing callers down the single-provider degradation path.
    pub async fn start_with_rrsm_down() -> Self {
        let rrsm = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/event/[^/]+/amplitudes$"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&rrsm)
            .await;

        let esm = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/events/[^/]+/stations$"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ESM_STATIONS_FIXTURE))
            .mount(&esm)
            .await;

        Self { rrsm, esm }
    }

    pub fn rrsm_client(&self) -> ProviderClient {
        shakefollow_providers::rrsm::client(self.rrsm.uri())
    }

    pub fn esm_client(&self) -> ProviderClient {
        shakefollow_providers::esm::client(self.esm.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_provider_server_serves_both_fixtures() {
        let server = FakeProviderServer::start().await;

        let rrsm_bundle = server.rrsm_client().fetch_bundle("20230206_0000008_KAHRAMANMARAS").await.unwrap();
        assert_eq!(rrsm_bundle.channels.len(), 2);
        assert!(rrsm_bundle.event_info.is_some());

        let esm_bundle = server.esm_client().fetch_bundle("20230206_0000008_KAHRAMANMARAS").await.unwrap();
        assert_eq!(esm_bundle.channels.len(), 2);
        assert!(esm_bundle.event_info.is_some());
    }

    #[tokio::test]
    async fn fake_provider_server_can_simulate_rrsm_outage() {
        let server = FakeProviderServer::start_with_rrsm_down().await;

        assert!(server.rrsm_client().fetch_bundle("x").await.is_err());
        assert!(server.esm_client().fetch_bundle("x").await.is_ok());
    }

    #[test]
    fn synthetic_row_defaults_to_terminal_stage_false() {
        let row = synthetic_row("evt", "RRSM", 0);
        assert!(!row.is_terminal_stage());
        assert_eq!(row.key.current_delay_minutes, 0);
    }
}
