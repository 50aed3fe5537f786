//! Produces the engine's `data_0` input blob and a parallel channel
//! manifest from a merged station list.

use shakefollow_schemas::{FinderChannel, RawStation};

const SYNTHETIC_SNCL: &str = "XX.NONE.00.HNZ";

/// The engine's formatted input blob plus the channel manifest describing
/// every line (including the synthetic epicenter row).
#[derive(Debug, Clone)]
pub struct EngineInput {
    pub blob: String,
    pub channels: Vec<FinderChannel>,
}

/// A simple magnitude/depth attenuation estimate used only to anchor the
/// synthetic epicenter row when observations are sparse. Not a
/// seismologically authoritative ground-motion model — the documented data
/// transform is log10(PGA) = -1.5 + 0.5*M - log10(max(depth_km, 1.0)).
pub fn predicted_pga_cm_s2(magnitude: f64, depth_km: f64) -> f64 {
    let r = depth_km.max(1.0);
    let log_pga = -1.5 + 0.5 * magnitude - r.log10();
    10f64.powf(log_pga)
}

/// Formats the engine input blob and manifest.
///
/// `origin_epoch_seconds` and `(epicenter_lat, epicenter_lon)` come from the
/// authoritative `FinderEvent` the worker already holds; `magnitude` and
/// `depth_km` anchor the synthetic row's PGA.
#[allow(clippy::too_many_arguments)]
pub fn format_engine_input(
    merged: &[RawStation],
    origin_epoch_seconds: i64,
    epicenter_lat: f64,
    epicenter_lon: f64,
    magnitude: f64,
    depth_km: f64,
    live_mode: bool,
) -> EngineInput {
    let max_observed_pga = merged.iter().map(|s| s.pga_cm_s2).fold(0.0_f64, f64::max);
    let synthetic_pga = predicted_pga_cm_s2(magnitude, depth_km).max(max_observed_pga * 1.2);

    let mut blob = format!("# {origin_epoch_seconds} 0\n");
    let mut channels = Vec::with_capacity(merged.len() + 1);

    blob.push_str(&format_line(
        epicenter_lat,
        epicenter_lon,
        SYNTHETIC_SNCL,
        origin_epoch_seconds,
        synthetic_pga,
        live_mode,
    ));
    blob.push('\n');
    channels.push(FinderChannel {
        lat: epicenter_lat,
        lon: epicenter_lon,
        network: "XX".to_string(),
        station: "NONE".to_string(),
        location: "00".to_string(),
        channel: "HNZ".to_string(),
        pga_cm_s2: synthetic_pga,
        triggered: true,
        is_artificial: true,
    });

    for station in merged {
        let sncl = station.sncl();
        blob.push_str(&format_line(
            station.lat,
            station.lon,
            &sncl,
            origin_epoch_seconds,
            station.pga_cm_s2,
            live_mode,
        ));
        blob.push('\n');
        channels.push(FinderChannel {
            lat: station.lat,
            lon: station.lon,
            network: station.network.clone(),
            station: station.station.clone(),
            location: station.location.clone(),
            channel: station.channel.clone(),
            pga_cm_s2: station.pga_cm_s2,
            triggered: true,
            is_artificial: false,
        });
    }

    EngineInput { blob, channels }
}

fn format_line(lat: f64, lon: f64, sncl: &str, origin_epoch_seconds: i64, pga_cm_s2: f64, live_mode: bool) -> String {
    if live_mode {
        format!("{lat:.3} {lon:.3} {sncl} {origin_epoch_seconds} {pga_cm_s2:.3}")
    } else {
        format!("{lat:.3} {lon:.3} {:.3}", pga_cm_s2.log10())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shakefollow_schemas::ProviderSource;

    fn station(pga: f64) -> RawStation {
        RawStation {
            lat: 40.0,
            lon: 28.0,
            network: "IT".to_string(),
            station: "ACC".to_string(),
            location: "00".to_string(),
            channel: "HNZ".to_string(),
            pga_cm_s2: pga,
            timestamp: Utc::now(),
            source: ProviderSource::Esm,
        }
    }

    #[test]
    fn header_line_matches_contract() {
        let out = format_engine_input(&[], 1_700_000_000, 40.0, 28.0, 5.0, 10.0, true);
        assert_eq!(out.blob.lines().next().unwrap(), "# 1700000000 0");
    }

    #[test]
    fn second_line_is_synthetic_epicenter_with_contract_sncl() {
        let out = format_engine_input(&[station(7.5)], 1_700_000_000, 40.0, 28.0, 5.0, 10.0, true);
        let second = out.blob.lines().nth(1).unwrap();
        assert!(second.contains(SYNTHETIC_SNCL));
        assert!(out.channels[0].is_artificial);
    }

    #[test]
    fn live_mode_true_emits_sncl_origin_and_pga() {
        let out = format_engine_input(&[station(7.5)], 1_700_000_000, 40.0, 28.0, 5.0, 10.0, true);
        let third = out.blob.lines().nth(2).unwrap();
        assert!(third.contains("7.500"));
        assert!(third.contains("IT.ACC.00.HNZ"));
    }

    #[test]
    fn live_mode_false_emits_log10_pga_only() {
        let out = format_engine_input(&[station(7.5)], 1_700_000_000, 40.0, 28.0, 5.0, 10.0, false);
        let third = out.blob.lines().nth(2).unwrap();
        let expected = format!("{:.3}", 7.5f64.log10());
        assert!(third.ends_with(&expected));
        assert!(!third.contains("HNZ"));
    }

    #[test]
    fn synthetic_pga_dominates_when_observed_is_sparse() {
        // S6: three stations at 0.5, 1.0, 2.0 cm/s^2, magnitude 6.5 at depth 10km.
        let stations = vec![station(0.5), station(1.0), station(2.0)];
        let predicted = predicted_pga_cm_s2(6.5, 10.0);
        let expected = predicted.max(2.0 * 1.2);
        let out = format_engine_input(&stations, 1_700_000_000, 40.0, 28.0, 6.5, 10.0, true);
        assert!((out.channels[0].pga_cm_s2 - expected).abs() < 1e-9);
    }
}
