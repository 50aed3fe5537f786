//! Web-service provider clients for RRSM and ESM.
//!
//! Replaces a deep inheritance chain with composition over three orthogonal
//! capabilities — [`UrlBuilder`], [`ResponseParser`], [`OptionValidator`] —
//! so a provider client is just a record carrying one of each; no base
//! class needed.

pub mod error;
pub mod esm;
pub mod retry;
pub mod rrsm;

pub use error::ProviderError;

use chrono::{DateTime, Utc};
use shakefollow_schemas::ProviderSource;

/// One channel's raw amplitude reading as a provider reports it, before the
/// merge layer's per-source extraction rules (max-PGA channel selection,
/// range filtering, code stripping, unit conversion) run. PGA stays in the
/// provider's native unit (cm/s^2 for RRSM, %g for ESM) — conversion is the
/// merge layer's job, not the parser's.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderChannelRecord {
    pub lat: f64,
    pub lon: f64,
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub pga_raw: f64,
    pub timestamp: DateTime<Utc>,
}

/// A provider's own account of the event's hypocenter, when its response
/// bundles one alongside the amplitude/station list (RRSM's peak-motion
/// service and ESM's QuakeML event endpoint both do). This is the
/// "authoritative FinderEvent" the merger/formatter needs to anchor its
/// synthetic epicenter row; the EMSC alert feed itself carries only
/// `mag`/`flynn_region`, not coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderEventInfo {
    pub origin_epoch_seconds: i64,
    pub lat: f64,
    pub lon: f64,
    pub depth_km: f64,
    pub magnitude: f64,
}

/// A parsed response: per-channel amplitude records plus an optional
/// event-level hypocenter, when the provider's wire shape includes one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderBundle {
    pub channels: Vec<ProviderChannelRecord>,
    pub event_info: Option<ProviderEventInfo>,
}

/// Builds the request URL for one provider's event-lookup endpoint.
pub trait UrlBuilder: Send + Sync {
    fn build_url(&self, event_id: &str) -> String;
}

/// Parses a provider's raw response body into concrete per-channel records
/// plus an optional event-level hypocenter. Never surfaces the provider's
/// native response shape (JSON/XML tree) past this boundary.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, body: &str) -> Result<ProviderBundle, ProviderError>;
}

/// Validates that a fetch request is well-formed before any network call is
/// made (e.g. event id shape).
pub trait OptionValidator: Send + Sync {
    fn validate(&self, event_id: &str) -> Result<(), ProviderError>;
}

/// A provider client: one `UrlBuilder`, one `ResponseParser`, one
/// `OptionValidator`, composed rather than inherited.
pub struct ProviderClient {
    pub source: ProviderSource,
    pub url_builder: Box<dyn UrlBuilder>,
    pub response_parser: Box<dyn ResponseParser>,
    pub option_validator: Box<dyn OptionValidator>,
    http: reqwest::Client,
}

impl ProviderClient {
    pub fn new(
        source: ProviderSource,
        url_builder: Box<dyn UrlBuilder>,
        response_parser: Box<dyn ResponseParser>,
        option_validator: Box<dyn OptionValidator>,
    ) -> Self {
        Self {
            source,
            url_builder,
            response_parser,
            option_validator,
            http: reqwest::Client::new(),
        }
    }

    /// Fetches and parses a channel+event-info bundle for one event. Applies
    /// the per-attempt timeout / retry / backoff policy from
    /// `retry::fetch_with_retry`; exhaustion yields a structured
    /// [`ProviderError::Transport`], never a panic or unhandled exception.
    pub async fn fetch_bundle(&self, event_id: &str) -> Result<ProviderBundle, ProviderError> {
        self.option_validator.validate(event_id)?;
        let url = self.url_builder.build_url(event_id);
        let body = retry::fetch_with_retry(&self.http, &url).await?;
        self.response_parser.parse(&body)
    }
}
