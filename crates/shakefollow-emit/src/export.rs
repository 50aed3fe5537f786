use crate::EmitError;
use chrono::{TimeZone, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::json;
use shakefollow_schemas::FinderSolution;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Derives the export directory name `<event_id>_t<delay_minutes padded to 5>`.
pub fn export_dir_name(event_id: &str, delay_minutes: i32) -> String {
    format!("{event_id}_t{delay_minutes:05}")
}

/// Creates `<export_root>/<event_id>_t<delay>` and returns its path.
pub fn prepare_export_dir(export_root: &Path, event_id: &str, delay_minutes: i32) -> Result<PathBuf, EmitError> {
    let dir = export_root.join(export_dir_name(event_id, delay_minutes));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Writes `event.xml`: a single `<earthquake>` element with the attributes
/// named in the external-interface contract.
pub fn write_event_xml(solution: &FinderSolution, dir: &Path) -> Result<PathBuf, EmitError> {
    let event = &solution.event;
    let time = Utc
        .timestamp_opt(event.origin_time_epoch, 0)
        .single()
        .ok_or_else(|| EmitError::Xml("origin_time_epoch out of range".to_string()))?
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string();

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| EmitError::Xml(e.to_string()))?;

    let mut start = BytesStart::new("earthquake");
    start.push_attribute(("event_id", event.catalog_event_id.as_str()));
    start.push_attribute(("id", event.engine_event_id.as_str()));
    start.push_attribute(("netid", "FinDer"));
    start.push_attribute(("mag", event.magnitude.to_string().as_str()));
    start.push_attribute(("lat", event.lat.to_string().as_str()));
    start.push_attribute(("lon", event.lon.to_string().as_str()));
    start.push_attribute(("depth", event.depth_km.to_string().as_str()));
    start.push_attribute(("time", time.as_str()));
    start.push_attribute(("locstring", "FinDer Origin"));
    start.push_attribute(("event_type", "ACTUAL"));

    writer
        .write_event(Event::Empty(start))
        .map_err(|e| EmitError::Xml(e.to_string()))?;

    let path = dir.join("event.xml");
    std::fs::write(&path, writer.into_inner().into_inner())?;
    Ok(path)
}

/// Writes `event_dat.xml`: one `<station>` per channel in the solution
/// (including the synthetic epicenter row), PGA converted from cm/s^2 to g
/// (divide by 9.806).
pub fn write_event_dat_xml(solution: &FinderSolution, dir: &Path) -> Result<PathBuf, EmitError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| EmitError::Xml(e.to_string()))?;

    let created = Utc::now().to_rfc3339();
    let mut root = BytesStart::new("stationlist");
    root.push_attribute(("created", created.as_str()));
    root.push_attribute(("xmlns", "ch.ethz.sed.shakemap.usgs.xml"));
    writer.write_event(Event::Start(root)).map_err(|e| EmitError::Xml(e.to_string()))?;

    for channel in &solution.channels {
        let pga_g = channel.pga_cm_s2 / 9.806;

        let mut station = BytesStart::new("station");
        station.push_attribute(("code", channel.station.as_str()));
        station.push_attribute(("name", channel.station.as_str()));
        station.push_attribute(("insttype", channel.channel.as_str()));
        station.push_attribute(("lat", channel.lat.to_string().as_str()));
        station.push_attribute(("lon", channel.lon.to_string().as_str()));
        station.push_attribute(("source", channel.network.as_str()));
        station.push_attribute(("commtype", "DIG"));
        station.push_attribute(("netid", channel.network.as_str()));
        station.push_attribute(("loc", channel.location.as_str()));
        writer.write_event(Event::Start(station)).map_err(|e| EmitError::Xml(e.to_string()))?;

        let comp_name = format!("{}N", channel.channel);
        let mut comp = BytesStart::new("comp");
        comp.push_attribute(("name", comp_name.as_str()));
        writer.write_event(Event::Start(comp)).map_err(|e| EmitError::Xml(e.to_string()))?;

        let value = format!("{pga_g:.5}");
        let mut acc = BytesStart::new("acc");
        acc.push_attribute(("value", value.as_str()));
        acc.push_attribute(("flag", "0"));
        writer.write_event(Event::Empty(acc)).map_err(|e| EmitError::Xml(e.to_string()))?;

        writer.write_event(Event::End(BytesEnd::new("comp"))).map_err(|e| EmitError::Xml(e.to_string()))?;
        writer.write_event(Event::End(BytesEnd::new("station"))).map_err(|e| EmitError::Xml(e.to_string()))?;
    }

    writer.write_event(Event::End(BytesEnd::new("stationlist"))).map_err(|e| EmitError::Xml(e.to_string()))?;

    let path = dir.join("event_dat.xml");
    std::fs::write(&path, writer.into_inner().into_inner())?;
    Ok(path)
}

/// Writes `rupture.json`: a GeoJSON FeatureCollection holding one closed
/// MultiPolygon (lon, lat, depth per vertex).
pub fn write_rupture_json(solution: &FinderSolution, dir: &Path) -> Result<PathBuf, EmitError> {
    let mut coords: Vec<[f64; 3]> = solution
        .rupture
        .0
        .iter()
        .map(|p| [p.lon, p.lat, p.depth_km])
        .collect();

    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        if first != last {
            coords.push(first);
        }
    }

    let rupture_data = json!({
        "type": "FeatureCollection",
        "metadata": { "reference": "Generated by the follow-up rupture engine" },
        "features": [{
            "type": "Feature",
            "properties": { "rupture type": "rupture extent" },
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [[coords]]
            }
        }]
    });

    let path = dir.join("rupture.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&rupture_data)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakefollow_schemas::{FinderChannel, FinderEvent, FinderRupture, RupturePoint};

    fn solution() -> FinderSolution {
        FinderSolution {
            event: FinderEvent {
                origin_time_epoch: 1_700_000_000,
                lat: 40.1,
                lon: 28.2,
                depth_km: 10.0,
                magnitude: 5.4,
                catalog_event_id: "cat-1".to_string(),
                engine_event_id: "engine123".to_string(),
            },
            rupture: FinderRupture(vec![
                RupturePoint { lat: 40.0, lon: 28.0, depth_km: 5.0 },
                RupturePoint { lat: 40.2, lon: 28.2, depth_km: 5.0 },
            ]),
            channels: vec![FinderChannel {
                lat: 40.0,
                lon: 28.0,
                network: "IT".to_string(),
                station: "ACC".to_string(),
                location: "00".to_string(),
                channel: "HNZ".to_string(),
                pga_cm_s2: 7.5,
                triggered: true,
                is_artificial: false,
            }],
        }
    }

    #[test]
    fn export_dir_name_pads_delay_to_five_digits() {
        assert_eq!(export_dir_name("ev1", 5), "ev1_t00005");
    }

    #[test]
    fn event_xml_contains_contract_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_event_xml(&solution(), dir.path()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("netid=\"FinDer\""));
        assert!(content.contains("event_type=\"ACTUAL\""));
        assert!(content.contains("2023-11-14T22:13:20Z"));
    }

    #[test]
    fn rupture_json_closes_the_ring() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_rupture_json(&solution(), dir.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        let coords = value["features"][0]["geometry"]["coordinates"][0][0].as_array().unwrap();
        assert_eq!(coords.first(), coords.last());
    }

    #[test]
    fn event_dat_xml_converts_pga_to_g() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_event_dat_xml(&solution(), dir.path()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let expected = format!("{:.5}", 7.5 / 9.806);
        assert!(content.contains(&expected));
    }
}
