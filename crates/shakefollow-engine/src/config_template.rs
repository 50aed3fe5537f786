use crate::EngineError;
use std::path::Path;

/// Materializes the engine configuration from a template, substituting
/// `DATA_FOLDER` with `working_dir`. The template format is a flat
/// `key value` line list, matching what the engine binary expects.
pub fn write_finder_configuration(
    template: &str,
    working_dir: &Path,
    config_path: &Path,
) -> Result<(), EngineError> {
    if !template.contains("DATA_FOLDER") {
        return Err(EngineError::Config(
            "engine config template missing DATA_FOLDER placeholder".to_string(),
        ));
    }
    let rendered = template.replace("DATA_FOLDER", &working_dir.display().to_string());
    std::fs::write(config_path, rendered)?;
    Ok(())
}

/// Writes the formatter's blob to `<working_dir>/data_0` as ASCII.
pub fn write_data_for_finder(blob: &str, working_dir: &Path) -> Result<(), EngineError> {
    if !blob.is_ascii() {
        return Err(EngineError::Config("engine input blob is not ASCII".to_string()));
    }
    std::fs::write(working_dir.join("data_0"), blob)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_template_without_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_finder_configuration("foo bar\n", dir.path(), &dir.path().join("cfg")).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn substitutes_data_folder() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("cfg");
        write_finder_configuration("data_folder DATA_FOLDER\n", dir.path(), &cfg_path).unwrap();
        let written = std::fs::read_to_string(&cfg_path).unwrap();
        assert!(written.contains(&dir.path().display().to_string()));
    }
}
