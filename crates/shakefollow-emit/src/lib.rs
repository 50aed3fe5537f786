//! Result emitter: writes ShakeMap-compatible input files from a parsed
//! [`shakefollow_schemas::FinderSolution`], triggers the external shake-map
//! command, archives its output products, and sends the notification email.

mod archive;
mod error;
mod export;
mod notify;
mod shakemap_trigger;

pub use archive::archive_products;
pub use error::EmitError;
pub use export::{export_dir_name, prepare_export_dir, write_event_dat_xml, write_event_xml, write_rupture_json};
pub use notify::send_notification;
pub use shakemap_trigger::trigger_shakemap;

use shakefollow_schemas::FinderSolution;
use std::path::{Path, PathBuf};

/// Output paths from a completed export pass, before the shake-map command
/// and archival/notification steps run.
pub struct ExportedFiles {
    pub export_dir: PathBuf,
    pub event_xml: PathBuf,
    pub event_dat_xml: PathBuf,
    pub rupture_json: PathBuf,
}

/// Writes every file the shake-map command needs under
/// `<export_root>/<event_id>_t<delay_minutes>`.
pub fn export_all(
    solution: &FinderSolution,
    export_root: &Path,
    event_id: &str,
    delay_minutes: i32,
) -> Result<ExportedFiles, EmitError> {
    let export_dir = prepare_export_dir(export_root, event_id, delay_minutes)?;
    let event_xml = write_event_xml(solution, &export_dir)?;
    let event_dat_xml = write_event_dat_xml(solution, &export_dir)?;
    let rupture_json = write_rupture_json(solution, &export_dir)?;

    Ok(ExportedFiles { export_dir, event_xml, event_dat_xml, rupture_json })
}
