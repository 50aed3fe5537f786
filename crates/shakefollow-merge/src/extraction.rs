//! Per-source extraction rules: reduce a provider's raw channel records to
//! one [`RawStation`] per physical station.

use shakefollow_providers::ProviderChannelRecord;
use shakefollow_schemas::{ProviderSource, RawStation};
use std::collections::HashMap;

/// Accepted PGA range, in m/s^2 (inclusive on both ends).
pub const PGA_MIN_M_S2: f64 = 1e-5;
pub const PGA_MAX_M_S2: f64 = 4.0 * 9.806;

/// cm/s^2 per g, used to convert ESM's percent-g readings.
const CM_S2_PER_G: f64 = 980.665;

fn strip_leading_dots(s: &str) -> String {
    s.trim_start_matches('.').to_string()
}

/// Converts a provider's native PGA unit to cm/s^2.
fn to_cm_s2(source: ProviderSource, pga_raw: f64) -> f64 {
    match source {
        ProviderSource::Rrsm => pga_raw,
        ProviderSource::Esm => pga_raw * CM_S2_PER_G * 0.01,
    }
}

/// For each station, keep only the channel with the largest absolute PGA,
/// discard channels outside `[PGA_MIN_M_S2, PGA_MAX_M_S2]`, strip leading
/// `.` from all codes, and split a dotted channel code into
/// `(location, channel)`. Converts to cm/s^2 per source.
pub fn extract_raw_stations(source: ProviderSource, channels: Vec<ProviderChannelRecord>) -> Vec<RawStation> {
    let mut best: HashMap<(String, String), ProviderChannelRecord> = HashMap::new();

    for ch in channels {
        let key = (ch.network.clone(), ch.station.clone());
        match best.get(&key) {
            Some(existing) if existing.pga_raw.abs() >= ch.pga_raw.abs() => {}
            _ => {
                best.insert(key, ch);
            }
        }
    }

    best.into_values().filter_map(|ch| to_raw_station(source, ch)).collect()
}

fn to_raw_station(source: ProviderSource, ch: ProviderChannelRecord) -> Option<RawStation> {
    let pga_cm_s2 = to_cm_s2(source, ch.pga_raw);
    let pga_m_s2 = pga_cm_s2 / 100.0;
    if pga_m_s2.abs() < PGA_MIN_M_S2 || pga_m_s2.abs() > PGA_MAX_M_S2 {
        return None;
    }

    let network = strip_leading_dots(&ch.network);
    let station = strip_leading_dots(&ch.station);
    let (location, channel) = match ch.channel.split_once('.') {
        Some((loc, cha)) => (strip_leading_dots(loc), strip_leading_dots(cha)),
        None => (strip_leading_dots(&ch.location), strip_leading_dots(&ch.channel)),
    };

    Some(RawStation {
        lat: ch.lat,
        lon: ch.lon,
        network,
        station,
        location,
        channel,
        pga_cm_s2,
        timestamp: ch.timestamp,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn channel(network: &str, station: &str, location: &str, channel: &str, pga_raw: f64) -> ProviderChannelRecord {
        ProviderChannelRecord {
            lat: 40.0,
            lon: 28.0,
            network: network.to_string(),
            station: station.to_string(),
            location: location.to_string(),
            channel: channel.to_string(),
            pga_raw,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn keeps_only_largest_abs_pga_channel_per_station() {
        let channels = vec![
            channel("IT", "ACC", "00", "HNZ", 1.0),
            channel("IT", "ACC", "00", "HNE", 5.0),
            channel("IT", "ACC", "00", "HNN", -3.0),
        ];
        let out = extract_raw_stations(ProviderSource::Rrsm, channels);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pga_cm_s2, 5.0);
    }

    #[test]
    fn discards_channel_outside_pga_range() {
        let channels = vec![channel("IT", "ACC", "00", "HNZ", 1e-7)];
        let out = extract_raw_stations(ProviderSource::Rrsm, channels);
        assert!(out.is_empty());
    }

    #[test]
    fn boundary_pga_values_are_accepted() {
        let min_cm_s2 = PGA_MIN_M_S2 * 100.0;
        let max_cm_s2 = PGA_MAX_M_S2 * 100.0;
        let out = extract_raw_stations(
            ProviderSource::Rrsm,
            vec![
                channel("IT", "A", "00", "HNZ", min_cm_s2),
                channel("IT", "B", "00", "HNZ", max_cm_s2),
            ],
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn esm_percent_g_converted_to_cm_s2() {
        let out = extract_raw_stations(ProviderSource::Esm, vec![channel("IT", "ACC", "00", "HNZ", 1.0)]);
        assert_eq!(out.len(), 1);
        assert!((out[0].pga_cm_s2 - 9.80665).abs() < 1e-6);
    }

    #[test]
    fn leading_dot_stripped_from_codes() {
        let out = extract_raw_stations(ProviderSource::Rrsm, vec![channel(".IT", ".ACC", ".00", ".HNZ", 5.0)]);
        assert_eq!(out[0].network, "IT");
        assert_eq!(out[0].channel, "HNZ");
    }

    #[test]
    fn dotted_channel_code_splits_into_location_and_channel() {
        let out = extract_raw_stations(ProviderSource::Rrsm, vec![channel("IT", "ACC", "", "00.HNZ", 5.0)]);
        assert_eq!(out[0].location, "00");
        assert_eq!(out[0].channel, "HNZ");
    }
}
