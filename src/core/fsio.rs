//! Local filesystem helpers.

use crate::core::error::StampError;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn read_file(path: &Path) -> Result<String, StampError> {
    fs::read_to_string(path).map_err(StampError::IoError)
}

/// Write-to-temp + rename, with the temp file in the destination directory
/// so the rename stays on one filesystem. An interrupted write never leaves
/// a truncated file at `path`.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), StampError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| StampError::IoError(e.error))?;
    Ok(())
}
