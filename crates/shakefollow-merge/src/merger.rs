use shakefollow_schemas::RawStation;
use std::collections::BTreeMap;

/// Builds a map keyed by SNCL (or a coordinate-rounded fallback when codes
/// are incomplete), inserting RRSM records first and then overwriting with
/// ESM on conflict. Output is sorted by PGA descending.
///
/// Idempotent: `merge(merge(rrsm, esm), [])` returns the same stations in
/// the same order as `merge(rrsm, esm)`.
pub fn merge(rrsm: Vec<RawStation>, esm: Vec<RawStation>) -> Vec<RawStation> {
    let mut by_key: BTreeMap<String, RawStation> = BTreeMap::new();

    for station in rrsm {
        by_key.insert(station.merge_key(), station);
    }
    for station in esm {
        by_key.insert(station.merge_key(), station);
    }

    let mut out: Vec<RawStation> = by_key.into_values().collect();
    out.sort_by(|a, b| b.pga_cm_s2.partial_cmp(&a.pga_cm_s2).unwrap_or(std::cmp::Ordering::Equal));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shakefollow_schemas::ProviderSource;

    fn station(network: &str, station: &str, pga: f64, source: ProviderSource) -> RawStation {
        RawStation {
            lat: 40.0,
            lon: 28.0,
            network: network.to_string(),
            station: station.to_string(),
            location: "00".to_string(),
            channel: "HNZ".to_string(),
            pga_cm_s2: pga,
            timestamp: Utc::now(),
            source,
        }
    }

    #[test]
    fn esm_wins_on_conflicting_key() {
        let rrsm = vec![station("IT", "ACC", 5.0, ProviderSource::Rrsm)];
        let esm = vec![station("IT", "ACC", 7.5, ProviderSource::Esm)];
        let merged = merge(rrsm, esm);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].pga_cm_s2, 7.5);
        assert_eq!(merged[0].source, ProviderSource::Esm);
    }

    #[test]
    fn merge_is_idempotent_against_empty_second_input() {
        let rrsm = vec![station("IT", "ACC", 5.0, ProviderSource::Rrsm)];
        let esm = vec![station("IT", "BCC", 7.5, ProviderSource::Esm)];
        let once = merge(rrsm.clone(), esm.clone());
        let twice = merge(once.clone(), vec![]);
        assert_eq!(once, twice);
    }

    #[test]
    fn output_sorted_by_pga_descending() {
        let rrsm = vec![
            station("IT", "A", 1.0, ProviderSource::Rrsm),
            station("IT", "B", 9.0, ProviderSource::Rrsm),
        ];
        let merged = merge(rrsm, vec![]);
        assert!(merged[0].pga_cm_s2 >= merged[1].pga_cm_s2);
    }
}
