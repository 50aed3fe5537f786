use crate::EmitError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::FileOptions;
use zip::ZipWriter;

const ARCHIVED_EXTENSIONS: &[&str] = &["json", "jpg", "jpeg"];

/// Archives every file under `products_dir` matching [`ARCHIVED_EXTENSIONS`]
/// into `<export_dir>/shakemap_products/shakemap_output_<timestamp>.zip`.
/// `timestamp` is supplied by the caller (`yyyymmdd_hhmmss`) since this crate
/// never calls the clock directly.
pub fn archive_products(products_dir: &Path, export_dir: &Path, timestamp: &str) -> Result<Option<PathBuf>, EmitError> {
    if !products_dir.is_dir() {
        return Ok(None);
    }

    let archive_dir = export_dir.join("shakemap_products");
    std::fs::create_dir_all(&archive_dir)?;
    let zip_path = archive_dir.join(format!("shakemap_output_{timestamp}.zip"));

    let file = std::fs::File::create(&zip_path)?;
    let mut zip = ZipWriter::new(file);
    let options: FileOptions<()> = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut added = 0usize;
    for entry in walk(products_dir)? {
        let Some(ext) = entry.extension().and_then(|e| e.to_str()) else { continue };
        if !ARCHIVED_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            continue;
        }
        let relative = entry
            .strip_prefix(products_dir)
            .map_err(|e| EmitError::Archive(e.to_string()))?;
        zip.start_file(relative.to_string_lossy(), options)
            .map_err(|e| EmitError::Archive(e.to_string()))?;
        let bytes = std::fs::read(&entry)?;
        zip.write_all(&bytes)?;
        added += 1;
    }
    zip.finish().map_err(|e| EmitError::Archive(e.to_string()))?;

    info!(zip = %zip_path.display(), files = added, "archived shake-map products");
    Ok(Some(zip_path))
}

fn walk(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk(&path)?);
        } else {
            out.push(path);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_products_dir_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = archive_products(&dir.path().join("nope"), dir.path(), "20260101_000000").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn archives_only_matching_extensions() {
        let root = tempfile::tempdir().unwrap();
        let products = root.path().join("products");
        std::fs::create_dir_all(&products).unwrap();
        std::fs::write(products.join("intensity.jpg"), b"fake").unwrap();
        std::fs::write(products.join("grid.xml"), b"fake").unwrap();

        let zip_path = archive_products(&products, root.path(), "20260101_000000").unwrap().unwrap();
        assert!(zip_path.exists());

        let file = std::fs::File::open(&zip_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.by_index(0).unwrap().name(), "intensity.jpg");
    }
}
