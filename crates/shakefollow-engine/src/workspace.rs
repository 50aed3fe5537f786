use crate::EngineError;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Creates `<root>/<event_id>/`. If `root` is not writable, falls back to
/// `~/shakefollow-output/<event_id>/` and logs a warning instead of failing
/// the run outright.
pub fn prepare_workspace(root: &Path, event_id: &str) -> Result<PathBuf, EngineError> {
    let primary = root.join(event_id);
    if std::fs::create_dir_all(&primary).is_ok() {
        return Ok(primary);
    }

    warn!(root = %root.display(), event_id, "engine output root unwritable, falling back to home directory");

    let home = std::env::var("HOME").map_err(|_| {
        EngineError::Config("engine output root unwritable and HOME is unset".to_string())
    })?;
    let fallback = Path::new(&home).join("shakefollow-output").join(event_id);
    std::fs::create_dir_all(&fallback)?;
    Ok(fallback)
}

/// Validates the engine binary: must exist, be a regular file, and have the
/// executable bit set. Missing/unreadable is fatal for this run.
#[cfg(unix)]
pub fn check_finder_executable(path: &Path) -> Result<(), EngineError> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(path)
        .map_err(|_| EngineError::Config(format!("engine binary not found: {}", path.display())))?;
    if !meta.is_file() {
        return Err(EngineError::Config(format!("engine binary is not a regular file: {}", path.display())));
    }
    if meta.permissions().mode() & 0o111 == 0 {
        return Err(EngineError::Config(format!("engine binary is not executable: {}", path.display())));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn check_finder_executable(path: &Path) -> Result<(), EngineError> {
    let meta = std::fs::metadata(path)
        .map_err(|_| EngineError::Config(format!("engine binary not found: {}", path.display())))?;
    if !meta.is_file() {
        return Err(EngineError::Config(format!("engine binary is not a regular file: {}", path.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_workspace_creates_event_dir_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let ws = prepare_workspace(dir.path(), "ev1").unwrap();
        assert!(ws.ends_with("ev1"));
        assert!(ws.exists());
    }

    #[test]
    fn missing_binary_is_config_error() {
        let err = check_finder_executable(Path::new("/nonexistent/finder-binary")).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
