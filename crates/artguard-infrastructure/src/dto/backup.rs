//! Fallback backup manifest DTOs

use artguard_core::capture::{CaptureJob, Direction, MapType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MANIFEST_SCHEMA_VERSION: &str = "1.0.0";

/// V1.0.0: one payload file in a backup directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEntryV1_0_0 {
    pub layer_id: String,
    pub file: String,
    pub direction: Direction,
    pub map_type: MapType,
    pub strength: f32,
    pub message: String,
    pub bytes: usize,
    pub captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_error: Option<String>,
}

impl BackupEntryV1_0_0 {
    pub fn from_job(job: &CaptureJob, file: impl Into<String>) -> Self {
        Self {
            layer_id: job.layer_id(),
            file: file.into(),
            direction: job.direction,
            map_type: job.map_type,
            strength: job.strength,
            message: job.message.clone(),
            bytes: job.image_bytes.len(),
            captured_at: job.captured_at,
            acquisition_error: job.acquisition_error.clone(),
        }
    }
}

/// V1.0.0: `manifest.json` of a backup directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupManifestV1_0_0 {
    pub version: String,
    pub session_id: String,
    pub version_number: u32,
    pub written_at: DateTime<Utc>,
    pub entries: Vec<BackupEntryV1_0_0>,
}

impl BackupManifestV1_0_0 {
    pub fn new(session_id: &str, version_number: u32, entries: Vec<BackupEntryV1_0_0>) -> Self {
        Self {
            version: MANIFEST_SCHEMA_VERSION.to_string(),
            session_id: session_id.to_string(),
            version_number,
            written_at: Utc::now(),
            entries,
        }
    }
}
