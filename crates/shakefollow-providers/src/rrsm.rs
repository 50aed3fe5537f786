//! RRSM (Rapid Raw Strong Motion) client: `UrlBuilder` + `ResponseParser` +
//! `OptionValidator` composed into a [`crate::ProviderClient`].

use crate::{
    OptionValidator, ProviderBundle, ProviderChannelRecord, ProviderClient, ProviderError, ProviderEventInfo,
    ResponseParser, UrlBuilder,
};
use chrono::Utc;
use shakefollow_schemas::ProviderSource;

pub struct RrsmUrlBuilder {
    pub base_url: String,
}

impl UrlBuilder for RrsmUrlBuilder {
    fn build_url(&self, event_id: &str) -> String {
        format!("{}/event/{}/amplitudes", self.base_url.trim_end_matches('/'), event_id)
    }
}

pub struct RrsmResponseParser;

/// Wire shape of one RRSM amplitude record. Field names match the feed, not
/// the internal [`ProviderChannelRecord`] shape.
#[derive(serde::Deserialize)]
struct RrsmAmplitude {
    lat: f64,
    lon: f64,
    net: String,
    sta: String,
    #[serde(default)]
    loc: String,
    cha: String,
    pga_cm_s2: f64,
    time: chrono::DateTime<Utc>,
}

/// RRSM's peak-motion endpoint bundles the event's own hypocenter alongside
/// the amplitude list (mirrors `PeakMotionData.get_event_data()` in the
/// original service client). Absent when RRSM has not yet located the event.
#[derive(serde::Deserialize)]
struct RrsmEvent {
    origin_epoch_seconds: i64,
    lat: f64,
    lon: f64,
    depth_km: f64,
    magnitude: f64,
}

#[derive(serde::Deserialize)]
struct RrsmResponse {
    amplitudes: Vec<RrsmAmplitude>,
    #[serde(default)]
    event: Option<RrsmEvent>,
}

impl ResponseParser for RrsmResponseParser {
    fn parse(&self, body: &str) -> Result<ProviderBundle, ProviderError> {
        let parsed: RrsmResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::Parse(format!("RRSM response: {e}")))?;

        let channels = parsed
            .amplitudes
            .into_iter()
            .map(|a| ProviderChannelRecord {
                lat: a.lat,
                lon: a.lon,
                network: a.net,
                station: a.sta,
                location: a.loc,
                channel: a.cha,
                pga_raw: a.pga_cm_s2,
                timestamp: a.time,
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

pub struct RrsmOptionValidator;

impl OptionValidator for RrsmOptionValidator {
    fn validate(&self, event_id: &str) -> Result<(), ProviderError> {
        if event_id.trim().is_empty() {
            return Err(ProviderError::Validation("event_id must not be empty".to_string()));
        }
        Ok(())
    }
}

pub fn client(base_url: impl Into<String>) -> ProviderClient {
    ProviderClient::new(
        ProviderSource::Rrsm,
        Box::new(RrsmUrlBuilder { base_url: base_url.into() }),
        Box::new(RrsmResponseParser),
        Box::new(RrsmOptionValidator),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let body = r#"{"amplitudes":[{"lat":40.0,"lon":28.0,"net":"IT","sta":"ACC","loc":"00","cha":"HNZ","pga_cm_s2":5.0,"time":"2026-01-01T00:00:00Z"}]}"#;
        let bundle = RrsmResponseParser.parse(body).unwrap();
        assert_eq!(bundle.channels.len(), 1);
        assert_eq!(bundle.channels[0].pga_raw, 5.0);
        assert!(bundle.event_info.is_none());
    }

    #[test]
    fn parses_bundled_event_info_when_present() {
        let body = r#"{"amplitudes":[],"event":{"origin_epoch_seconds":1780000000,"lat":40.0,"lon":28.0,"depth_km":10.0,"magnitude":6.5}}"#;
        let bundle = RrsmResponseParser.parse(body).unwrap();
        let info = bundle.event_info.expect("event info present");
        assert_eq!(info.magnitude, 6.5);
    }

    #[test]
    fn rejects_empty_event_id() {
        assert!(RrsmOptionValidator.validate("").is_err());
    }
}
