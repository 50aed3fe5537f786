use crate::EmitError;
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Invokes the external shake-map command against the files written by
/// [`crate::export::write_event_xml`] and friends. The command and its
/// fixed argument shape are not specified further than "a named external
/// command"; we mirror the reference tool's invocation: force-overwrite,
/// select the event by id, then assemble the standard product set.
pub fn trigger_shakemap(shakemap_command: &str, event_id: &str, export_dir: &Path) -> Result<(), EmitError> {
    if !export_dir.join("event.xml").is_file() {
        return Err(EmitError::Archive(format!("missing event.xml in {}", export_dir.display())));
    }

    let output = Command::new(shakemap_command)
        .arg("--force")
        .arg("-d")
        .arg(event_id)
        .arg("select")
        .arg("assemble")
        .arg("-c")
        .arg("shakefollow")
        .arg("model")
        .arg("contour")
        .arg("mapping")
        .arg("stations")
        .arg("gridxml")
        .current_dir(export_dir)
        .output()?;

    if !output.status.success() {
        return Err(EmitError::ShakeMapCommand {
            code: output.status.code(),
            stderr_tail: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    info!(event_id, "shake-map command completed");
    Ok(())
}
