// src/output.rs
// =============================================================================
// Writing the gathered records out as one text file.
//
// Format: every record is "File: <label>\n<content>\n" and records are
// joined with "\n", so there is a blank line between files.
// =============================================================================

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{GatherError, Result};
use crate::tree::FileRecord;

/// Renders records into the bundle text.
pub fn render(records: &[FileRecord]) -> String {
    records
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes the bundle to `path`, creating parent directories.
pub async fn write_bundle(path: &Path, records: &[FileRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| GatherError::output(parent, e))?;
    }

    tokio::fs::write(path, render(records))
        .await
        .map_err(|e| GatherError::output(path, e))?;

    info!("Saved {} file(s) to {}", records.len(), path.display());
    Ok(())
}

/// Last component of a directory path, ignoring trailing separators.
pub fn directory_name(path: &str) -> String {
    let cleaned = path.trim().trim_end_matches(['/', '\\']);
    Path::new(cleaned)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Default bundle location for a local directory:
/// `<output_dir>/all_contents_from_<dir name>.txt`
pub fn directory_bundle_path(output_dir: &Path, directory: &str) -> PathBuf {
    let name = directory_name(directory);
    let name = if name.is_empty() { "root".to_string() } else { name };
    output_dir.join(format!("all_contents_from_{}.txt", name))
}
