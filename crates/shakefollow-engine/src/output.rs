use crate::EngineError;
use shakefollow_schemas::{FinderChannel, FinderEvent, FinderRupture, FinderSolution, RupturePoint};
use std::path::Path;

/// Parses `<working_dir>/temp_data/<engine_event_id>/{core_info_0,
/// finder_rupture_list_0, data_0}` into a populated [`FinderSolution`].
pub fn parse_solution(
    working_dir: &Path,
    catalog_event_id: &str,
    engine_event_id: &str,
) -> Result<FinderSolution, EngineError> {
    let run_dir = working_dir.join("temp_data").join(engine_event_id);

    let event = parse_core_info(&run_dir.join("core_info_0"), catalog_event_id, engine_event_id)?;
    let rupture = parse_rupture_list(&run_dir.join("finder_rupture_list_0"))?;
    let channels = parse_data(&run_dir.join("data_0"))?;

    Ok(FinderSolution { event, rupture, channels })
}

/// `core_info_0` is four lines: origin epoch, magnitude, "lat lon", signed
/// depth (km, positive down).
fn parse_core_info(path: &Path, catalog_event_id: &str, engine_event_id: &str) -> Result<FinderEvent, EngineError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| EngineError::OutputParse(format!("cannot read {}: {e}", path.display())))?;
    let mut lines = content.lines();

    let origin_time_epoch: i64 = next_field(&mut lines, "origin epoch")?
        .trim()
        .parse()
        .map_err(|e| EngineError::OutputParse(format!("core_info_0 origin epoch: {e}")))?;
    let magnitude: f64 = next_field(&mut lines, "magnitude")?
        .trim()
        .parse()
        .map_err(|e| EngineError::OutputParse(format!("core_info_0 magnitude: {e}")))?;
    let latlon = next_field(&mut lines, "lat lon")?;
    let mut latlon_parts = latlon.split_whitespace();
    let lat: f64 = next_token(&mut latlon_parts, "lat")?
        .parse()
        .map_err(|e| EngineError::OutputParse(format!("core_info_0 lat: {e}")))?;
    let lon: f64 = next_token(&mut latlon_parts, "lon")?
        .parse()
        .map_err(|e| EngineError::OutputParse(format!("core_info_0 lon: {e}")))?;
    let depth_km: f64 = next_field(&mut lines, "depth")?
        .trim()
        .parse::<f64>()
        .map_err(|e| EngineError::OutputParse(format!("core_info_0 depth: {e}")))?
        .abs();

    Ok(FinderEvent {
        origin_time_epoch,
        lat,
        lon,
        depth_km,
        magnitude,
        catalog_event_id: catalog_event_id.to_string(),
        engine_event_id: engine_event_id.to_string(),
    })
}

/// `finder_rupture_list_0`: first line is the vertex count, followed by that
/// many "lat lon depth" lines. Absent file or zero count means no rupture.
fn parse_rupture_list(path: &Path) -> Result<FinderRupture, EngineError> {
    if !path.exists() {
        return Ok(FinderRupture::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| EngineError::OutputParse(format!("cannot read {}: {e}", path.display())))?;
    let mut lines = content.lines();

    let count: usize = match lines.next() {
        Some(line) if !line.trim().is_empty() => line
            .trim()
            .parse()
            .map_err(|e| EngineError::OutputParse(format!("finder_rupture_list_0 count: {e}")))?,
        _ => return Ok(FinderRupture::default()),
    };

    let mut points = Vec::with_capacity(count);
    for (i, line) in lines.enumerate() {
        if i >= count {
            break;
        }
        let mut parts = line.split_whitespace();
        let lat: f64 = next_token(&mut parts, "rupture lat")?
            .parse()
            .map_err(|e| EngineError::OutputParse(format!("rupture lat: {e}")))?;
        let lon: f64 = next_token(&mut parts, "rupture lon")?
            .parse()
            .map_err(|e| EngineError::OutputParse(format!("rupture lon: {e}")))?;
        let depth_km: f64 = next_token(&mut parts, "rupture depth")?
            .parse()
            .map_err(|e| EngineError::OutputParse(format!("rupture depth: {e}")))?;
        points.push(RupturePoint { lat, lon, depth_km });
    }

    if points.len() != count {
        return Err(EngineError::OutputParse(format!(
            "finder_rupture_list_0 declared {count} vertices, found {}",
            points.len()
        )));
    }

    Ok(FinderRupture(points))
}

/// `data_0`: a header line followed by "lat lon sncl trigger pga" lines, one
/// per contributing channel (including the synthetic epicenter row we wrote
/// ourselves, which the engine echoes back unchanged).
fn parse_data(path: &Path) -> Result<Vec<FinderChannel>, EngineError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| EngineError::OutputParse(format!("cannot read {}: {e}", path.display())))?;
    let mut lines = content.lines();
    next_field(&mut lines, "header")?;

    let mut channels = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let lat: f64 = next_token(&mut parts, "data lat")?
            .parse()
            .map_err(|e| EngineError::OutputParse(format!("data_0 lat: {e}")))?;
        let lon: f64 = next_token(&mut parts, "data lon")?
            .parse()
            .map_err(|e| EngineError::OutputParse(format!("data_0 lon: {e}")))?;
        let sncl = next_token(&mut parts, "data sncl")?;
        let trigger: i32 = next_token(&mut parts, "data trigger")?
            .parse()
            .map_err(|e| EngineError::OutputParse(format!("data_0 trigger: {e}")))?;
        let pga_cm_s2: f64 = next_token(&mut parts, "data pga")?
            .parse()
            .map_err(|e| EngineError::OutputParse(format!("data_0 pga: {e}")))?;

        let mut codes = sncl.splitn(4, '.');
        let network = codes.next().unwrap_or_default().to_string();
        let station = codes.next().unwrap_or_default().to_string();
        let location = codes.next().unwrap_or_default().to_string();
        let channel = codes.next().unwrap_or_default().to_string();
        let is_artificial = network == "XX" && station == "NONE";

        channels.push(FinderChannel {
            lat,
            lon,
            network,
            station,
            location,
            channel,
            pga_cm_s2,
            triggered: trigger != 0,
            is_artificial,
        });
    }

    Ok(channels)
}

fn next_field<'a, I: Iterator<Item = &'a str>>(lines: &mut I, what: &str) -> Result<&'a str, EngineError> {
    lines.next().ok_or_else(|| EngineError::OutputParse(format!("missing {what} line")))
}

fn next_token<'a, I: Iterator<Item = &'a str>>(parts: &mut I, what: &str) -> Result<&'a str, EngineError> {
    parts.next().ok_or_else(|| EngineError::OutputParse(format!("missing {what} field")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn parses_well_formed_run_directory() {
        let root = tempfile::tempdir().unwrap();
        let run_dir = root.path().join("temp_data").join("engine123");
        write(&run_dir, "core_info_0", "1700000000\n5.4\n40.1 28.2\n10.0\n");
        write(&run_dir, "finder_rupture_list_0", "2\n40.0 28.0 5.0\n40.2 28.2 5.0\n");
        write(
            &run_dir,
            "data_0",
            "# 1700000000 0\n40.1 28.2 XX.NONE.00.HNZ 1 9.0\n40.0 28.0 IT.ACC.00.HNZ 1 7.5\n",
        );

        let solution = parse_solution(root.path(), "cat-1", "engine123").unwrap();
        assert_eq!(solution.event.magnitude, 5.4);
        assert_eq!(solution.rupture.len(), 2);
        assert_eq!(solution.channels.len(), 2);
        assert!(solution.channels[0].is_artificial);
        assert_eq!(solution.channels[1].sncl(), "IT.ACC.00.HNZ");
    }

    #[test]
    fn zero_vertex_rupture_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let run_dir = root.path().join("temp_data").join("engine123");
        write(&run_dir, "core_info_0", "1700000000\n5.4\n40.1 28.2\n10.0\n");
        write(&run_dir, "finder_rupture_list_0", "0\n");
        write(&run_dir, "data_0", "# 1700000000 0\n40.1 28.2 XX.NONE.00.HNZ 1 9.0\n");

        let solution = parse_solution(root.path(), "cat-1", "engine123").unwrap();
        assert!(solution.rupture.is_empty());
    }

    #[test]
    fn missing_core_info_is_output_parse_error() {
        let root = tempfile::tempdir().unwrap();
        let err = parse_solution(root.path(), "cat-1", "engine123").unwrap_err();
        assert!(matches!(err, EngineError::OutputParse(_)));
    }
}
