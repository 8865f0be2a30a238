//! Persistence collaborators for reports and fallback payloads.

use super::report::ProtectionReport;
use crate::capture::CaptureJob;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stores one protection report per session.
///
/// Saving the same session again overwrites the previous document.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Saves a report.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Report saved successfully
    /// - `Err(_)`: Error occurred during save
    async fn save(&self, report: &ProtectionReport) -> Result<()>;

    /// Loads the latest report for a session.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(report))`: Report found
    /// - `Ok(None)`: No report stored for this session
    /// - `Err(_)`: Error occurred during retrieval
    async fn load(&self, session_id: &str) -> Result<Option<ProtectionReport>>;
}

/// Where a fallback backup was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackReceipt {
    pub directory: PathBuf,
    pub files_written: usize,
}

/// Local, session-scoped backup of captured payloads.
///
/// Used once remote delivery is exhausted so captured data is never silently lost.
#[async_trait]
pub trait FallbackStore: Send + Sync {
    async fn write_backup(
        &self,
        session_id: &str,
        version: u32,
        jobs: &[CaptureJob],
    ) -> Result<FallbackReceipt>;
}
