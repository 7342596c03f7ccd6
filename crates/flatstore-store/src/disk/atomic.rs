//! Atomic file replacement
//!
//! Content goes to a sibling temp file first and is renamed over the target,
//! so a reader of the data directory never sees a half-written record.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{io_error, Result};

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Write `content` to `target`, creating parent directories as needed
pub fn atomic_write(target: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create_record_dir", e))?;
    }

    let temp = temp_path(target);
    fs::write(&temp, content).map_err(|e| io_error("write_record_temp", e))?;

    if let Err(e) = fs::rename(&temp, target) {
        fs::remove_file(&temp).ok();
        return Err(io_error("rename_record_temp", e));
    }
    Ok(())
}

/// Remove `target`; a file that is already gone is not an error
pub fn remove_file(target: &Path) -> Result<()> {
    match fs::remove_file(target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error("remove_record", e)),
    }
}
