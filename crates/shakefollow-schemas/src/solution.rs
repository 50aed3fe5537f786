use serde::{Deserialize, Serialize};

/// Parsed engine output describing one run's hypocenter solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinderEvent {
    pub origin_time_epoch: i64,
    pub lat: f64,
    pub lon: f64,
    pub depth_km: f64,
    pub magnitude: f64,
    pub catalog_event_id: String,
    pub engine_event_id: String,
}

/// One vertex of a rupture polygon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RupturePoint {
    pub lat: f64,
    pub lon: f64,
    pub depth_km: f64,
}

/// An ordered list of polygon vertices describing the rupture extent.
/// May be empty when the engine finds no rupture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinderRupture(pub Vec<RupturePoint>);

impl FinderRupture {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// One station+component contribution to the solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinderChannel {
    pub lat: f64,
    pub lon: f64,
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub pga_cm_s2: f64,
    pub triggered: bool,
    pub is_artificial: bool,
}

impl FinderChannel {
    pub fn sncl(&self) -> String {
        format!("{}.{}.{}.{}", self.network, self.station, self.location, self.channel)
    }
}

/// Composition of one parsed [`FinderEvent`], one [`FinderRupture`] (possibly
/// empty), and the contributing [`FinderChannel`] list. Owned by the worker
/// that produced it, then consumed by the emitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderSolution {
    pub event: FinderEvent,
    pub rupture: FinderRupture,
    pub channels: Vec<FinderChannel>,
}
