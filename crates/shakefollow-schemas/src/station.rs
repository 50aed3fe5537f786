use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which provider contributed a [`RawStation`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderSource {
    Rrsm,
    Esm,
}

impl ProviderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderSource::Rrsm => "RRSM",
            ProviderSource::Esm => "ESM",
        }
    }
}

/// The merge-layer normalization of a single provider record: one station,
/// already reduced to its single largest-PGA channel and converted to
/// cm/s^2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStation {
    pub lat: f64,
    pub lon: f64,
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub pga_cm_s2: f64,
    pub timestamp: DateTime<Utc>,
    pub source: ProviderSource,
}

impl RawStation {
    /// SNCL string `network.station.location.channel`.
    pub fn sncl(&self) -> String {
        format!("{}.{}.{}.{}", self.network, self.station, self.location, self.channel)
    }

    /// Merge key: SNCL when all four codes are present, else a
    /// coordinate-rounded fallback.
    pub fn merge_key(&self) -> String {
        if !self.network.is_empty()
            && !self.station.is_empty()
            && !self.location.is_empty()
            && !self.channel.is_empty()
        {
            self.sncl()
        } else {
            format!("{:.4}_{:.4}", self.lat, self.lon)
        }
    }
}
