//! ESM (Engineering Strong Motion) client. Same composition shape as
//! [`crate::rrsm`] — only the URL pattern, wire shape, and native PGA unit
//! (percent-g rather than cm/s^2) differ.

use crate::{
    OptionValidator, ProviderBundle, ProviderChannelRecord, ProviderClient, ProviderError, ProviderEventInfo,
    ResponseParser, UrlBuilder,
};
use chrono::Utc;
use shakefollow_schemas::ProviderSource;

pub struct EsmUrlBuilder {
    pub base_url: String,
}

impl UrlBuilder for EsmUrlBuilder {
    fn build_url(&self, event_id: &str) -> String {
        format!("{}/events/{}/stations", self.base_url.trim_end_matches('/'), event_id)
    }
}

pub struct EsmResponseParser;

#[derive(serde::Deserialize)]
struct EsmStationEntry {
    latitude: f64,
    longitude: f64,
    network_code: String,
    station_code: String,
    #[serde(default)]
    location_code: String,
    channel_code: String,
    /// ESM reports PGA in percent-g.
    pga_percent_g: f64,
    event_time: chrono::DateTime<Utc>,
}

/// ESM's QuakeML event endpoint carries origin/magnitude alongside the
/// station list; present only when ESM has located the event itself.
#[derive(serde::Deserialize)]
struct EsmEvent {
    origin_epoch_seconds: i64,
    lat: f64,
    lon: f64,
    depth_km: f64,
    magnitude: f64,
}

#[derive(serde::Deserialize)]
struct EsmResponse {
    stations: Vec<EsmStationEntry>,
    #[serde(default)]
    event: Option<EsmEvent>,
}

impl ResponseParser for EsmResponseParser {
    fn parse(&self, body: &str) -> Result<ProviderBundle, ProviderError> {
        let parsed: EsmResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::Parse(format!("ESM response: {e}")))?;

        let channels = parsed
            .stations
            .into_iter()
            .map(|s| ProviderChannelRecord {
                lat: s.latitude,
                lon: s.longitude,
                network: s.network_code,
                station: s.station_code,
                location: s.location_code,
                channel: s.channel_code,
                pga_raw: s.pga_percent_g,
                timestamp: s.event_time,
            })
            .collect();

        let event_info = parsed.event.map(|e| ProviderEventInfo {
            origin_epoch_seconds: e.origin_epoch_seconds,
            lat: e.lat,
            lon: e.lon,
            depth_km: e.depth_km,
            magnitude: e.magnitude,
        });

        Ok(ProviderBundle { channels, event_info })
    }
}

pub struct EsmOptionValidator;

impl OptionValidator for EsmOptionValidator {
    fn validate(&self, event_id: &str) -> Result<(), ProviderError> {
        if event_id.trim().is_empty() {
            return Err(ProviderError::Validation("event_id must not be empty".to_string()));
        }
        Ok(())
    }
}

pub fn client(base_url: impl Into<String>) -> ProviderClient {
    ProviderClient::new(
        ProviderSource::Esm,
        Box::new(EsmUrlBuilder { base_url: base_url.into() }),
        Box::new(EsmResponseParser),
        Box::new(EsmOptionValidator),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let body = r#"{"stations":[{"latitude":40.0,"longitude":28.0,"network_code":"IT","station_code":"ACC","location_code":"00","channel_code":"HNZ","pga_percent_g":0.76472,"event_time":"2026-01-01T00:00:00Z"}]}"#;
        let bundle = EsmResponseParser.parse(body).unwrap();
        assert_eq!(bundle.channels.len(), 1);
        assert!((bundle.channels[0].pga_raw - 0.76472).abs() < 1e-9);
        assert!(bundle.event_info.is_none());
    }
}
