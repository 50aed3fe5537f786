//! Canonicalizes provider records into a single station list and formats
//! them for the rupture-detection engine.

pub mod extraction;
pub mod formatter;
pub mod merger;

pub use extraction::{extract_raw_stations, PGA_MAX_M_S2, PGA_MIN_M_S2};
pub use formatter::{format_engine_input, predicted_pga_cm_s2, EngineInput};
pub use merger::merge;
