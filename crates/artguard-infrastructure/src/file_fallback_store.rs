//! Directory-based FallbackStore implementation
//!
//! Directory structure:
//! ```text
//! base_dir/
//! └── <session_id>/
//!     └── v<version>/
//!         ├── main_depth.img
//!         ├── ...
//!         └── manifest.json
//! ```

use crate::dto::{BackupEntryV1_0_0, BackupManifestV1_0_0};
use crate::paths::{ArtguardPaths, session_dir_name};
use crate::storage::write_atomic;
use artguard_core::capture::CaptureJob;
use artguard_core::config::StorageConfig;
use artguard_core::error::Result;
use artguard_core::protection::{FallbackReceipt, FallbackStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
const PAYLOAD_EXTENSION: &str = "img";

/// Writes every payload of a failed cycle to local disk.
pub struct FileFallbackStore {
    base_dir: PathBuf,
}

impl FileFallbackStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Creates a store at the configured or platform backup directory.
    pub fn from_storage(storage: &StorageConfig) -> Result<Self> {
        Ok(Self::new(ArtguardPaths::resolve_backup_dir(storage)?))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn version_dir(&self, session_id: &str, version: u32) -> Result<PathBuf> {
        Ok(self
            .base_dir
            .join(session_dir_name(session_id)?)
            .join(format!("v{}", version)))
    }
}

#[async_trait]
impl FallbackStore for FileFallbackStore {
    async fn write_backup(
        &self,
        session_id: &str,
        version: u32,
        jobs: &[CaptureJob],
    ) -> Result<FallbackReceipt> {
        let dir = self.version_dir(session_id, version)?;
        let mut entries = Vec::with_capacity(jobs.len());

        for job in jobs {
            let file = format!("{}.{}", job.layer_id(), PAYLOAD_EXTENSION);
            write_atomic(&dir.join(&file), &job.image_bytes).await?;
            entries.push(BackupEntryV1_0_0::from_job(job, file));
        }

        let manifest = BackupManifestV1_0_0::new(session_id, version, entries);
        let json = serde_json::to_vec_pretty(&manifest)?;
        write_atomic(&dir.join(MANIFEST_FILE), &json).await?;

        tracing::warn!(
            "[FileFallbackStore] Backed up {} payloads for session {} v{} to {:?}",
            jobs.len(),
            session_id,
            version,
            dir
        );

        Ok(FallbackReceipt {
            directory: dir,
            files_written: jobs.len(),
        })
    }
}
