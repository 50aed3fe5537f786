use crate::EngineError;
use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

const STDOUT_TAIL_BYTES: usize = 4096;

/// Result of one engine invocation: the engine's own internal event id
/// parsed from stdout (`Event_ID=<id>`), if the engine printed one.
pub struct ExecutionOutcome {
    pub engine_event_id: Option<String>,
}

/// Invokes the validated engine binary with argv
/// `[config_path, working_dir, "0", "0", "yes"|"no"]` (the trailing flag
/// mirrors `live_mode`), capturing stdout/stderr fully. A non-zero exit is
/// fatal for this run; stdout is scanned line-by-line for the
/// `Event_ID=<id>` marker regardless of exit status so logs retain it.
pub fn run_finder(binary_path: &Path, config_path: &Path, working_dir: &Path, live_mode: bool) -> Result<ExecutionOutcome, EngineError> {
    let live_flag = if live_mode { "yes" } else { "no" };

    let output = Command::new(binary_path)
        .arg(config_path)
        .arg(working_dir)
        .arg("0")
        .arg("0")
        .arg(live_flag)
        .output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let engine_event_id = scan_event_id(&stdout);

    if !output.status.success() {
        warn!(code = ?output.status.code(), "engine exited non-zero");
        return Err(EngineError::NonZeroExit {
            code: output.status.code(),
            stderr_tail: tail(&stderr, STDOUT_TAIL_BYTES),
        });
    }

    info!(engine_event_id = ?engine_event_id, "engine run completed");
    Ok(ExecutionOutcome { engine_event_id })
}

fn scan_event_id(stdout: &str) -> Option<String> {
    for line in stdout.lines() {
        if let Some(rest) = line.trim().strip_prefix("Event_ID=") {
            return Some(rest.trim().to_string());
        }
    }
    None
}

fn tail(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let min_start = s.len() - max_bytes;
    let start = (min_start..=s.len()).find(|&i| s.is_char_boundary(i)).unwrap_or(s.len());
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_event_id_marker() {
        let stdout = "starting up\nEvent_ID=abc123\ndone\n";
        assert_eq!(scan_event_id(stdout), Some("abc123".to_string()));
    }

    #[test]
    fn missing_marker_returns_none() {
        assert_eq!(scan_event_id("no marker here\n"), None);
    }

    #[test]
    fn tail_does_not_split_a_multibyte_codepoint() {
        // 3-byte codepoints so `len() - max_bytes` rarely lands on a boundary.
        let s: String = std::iter::repeat('\u{3042}').take(3000).collect();
        let truncated = tail(&s, 4096);
        assert!(truncated.chars().all(|c| c == '\u{3042}'));
    }

    #[test]
    fn binary_not_found_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_finder(
            Path::new("/nonexistent/finder-binary"),
            &dir.path().join("cfg"),
            dir.path(),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
