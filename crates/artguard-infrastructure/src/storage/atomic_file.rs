//! Atomic file writes.
//!
//! Content goes to a hidden temporary file next to the target, is flushed to
//! disk and then renamed over the target. Readers see either the old or the
//! new file, never a partial one, and rewriting the same file is idempotent.

use artguard_core::error::{ArtguardError, Result};
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Temporary path used while writing `path`.
fn temp_path(path: &Path) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| ArtguardError::io(format!("Path has no parent directory: {:?}", path)))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| ArtguardError::io(format!("Path has no file name: {:?}", path)))?;

    Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
}

/// Writes `contents` to `path` atomically, creating parent directories.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = temp_path(path)?;
    let mut tmp_file = tokio::fs::File::create(&tmp_path).await?;
    tmp_file.write_all(contents).await?;
    tmp_file.sync_all().await?;
    drop(tmp_file);

    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// Blocking variant of [`write_atomic`] for synchronous callers.
pub fn write_atomic_sync(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(path)?;
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(contents)?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}
