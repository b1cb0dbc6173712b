//! Crash-safe file replacement.
//!
//! Content goes to a temporary file in the target's directory, is flushed and
//! synced, then renamed over the target. Readers see either the old or the new
//! file, never a partial one, and a crash mid-write leaves the old file intact.

use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::Builder;

pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let mut tmp = Builder::new().prefix(".wiki-").suffix(".tmp").tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    sync_dir(dir);
    Ok(())
}

/// Persist the rename itself. Best effort.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
