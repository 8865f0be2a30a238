//! Directory-based ReportRepository implementation
//!
//! Directory structure:
//! ```text
//! base_dir/
//! └── <session_id>/
//!     ├── protection_metadata.json   # ReportDocument (machine readable)
//!     └── protection_report.txt      # summary + per-layer detail
//! ```
//!
//! Saving a session again overwrites both files with the latest version.

use crate::dto::ReportDocumentV1_0_0;
use crate::paths::{ArtguardPaths, session_dir_name};
use crate::storage::write_atomic;
use artguard_core::config::StorageConfig;
use artguard_core::error::Result;
use artguard_core::protection::{ProtectionReport, ReportRepository, TierThresholds};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "protection_metadata.json";
pub const TEXT_REPORT_FILE: &str = "protection_report.txt";

pub struct FileReportRepository {
    base_dir: PathBuf,
    thresholds: TierThresholds,
}

impl FileReportRepository {
    /// Creates a repository rooted at `base_dir`. Directories are created on first save.
    pub fn new(base_dir: impl Into<PathBuf>, thresholds: TierThresholds) -> Self {
        Self {
            base_dir: base_dir.into(),
            thresholds,
        }
    }

    /// Creates a repository at the configured or platform reports directory.
    pub fn from_storage(storage: &StorageConfig, thresholds: TierThresholds) -> Result<Self> {
        Ok(Self::new(ArtguardPaths::resolve_reports_dir(storage)?, thresholds))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the documents of one session.
    pub fn session_dir(&self, session_id: &str) -> Result<PathBuf> {
        Ok(self.base_dir.join(session_dir_name(session_id)?))
    }
}

#[async_trait]
impl ReportRepository for FileReportRepository {
    async fn save(&self, report: &ProtectionReport) -> Result<()> {
        let dir = self.session_dir(report.session_id())?;

        let document = ReportDocumentV1_0_0::from_domain(report);
        let json = serde_json::to_vec_pretty(&document)?;
        write_atomic(&dir.join(METADATA_FILE), &json).await?;
        write_atomic(&dir.join(TEXT_REPORT_FILE), render_text_report(report).as_bytes()).await?;

        tracing::info!(
            "[FileReportRepository] Saved report for session {} v{} to {:?}",
            report.session_id(),
            report.version_number(),
            dir
        );
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<ProtectionReport>> {
        let path = self.session_dir(session_id)?.join(METADATA_FILE);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        let content = tokio::fs::read(&path).await?;
        let document: ReportDocumentV1_0_0 = serde_json::from_slice(&content)?;
        document.into_domain(&self.thresholds).map(Some)
    }
}

/// Human-readable report: summary block followed by one line per layer.
pub fn render_text_report(report: &ProtectionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Artguard Protection Report");
    let _ = writeln!(out, "==========================");
    let _ = writeln!(out, "Session:            {}", report.session_id());
    let _ = writeln!(out, "Version:            {}", report.version_number());
    let _ = writeln!(out, "Created:            {}", report.created_at().to_rfc3339());
    let _ = writeln!(out, "Delivery:           {}", report.delivery_mode());
    let _ = writeln!(
        out,
        "Layers protected:   {}/{}",
        report.protected_count(),
        report.total_layers()
    );
    let _ = writeln!(
        out,
        "Verification tier:  {} ({}% confidence)",
        report.verification_tier(),
        report.confidence_percent()
    );
    if let Some(accuracy) = report.average_bit_accuracy() {
        let _ = writeln!(out, "Avg bit accuracy:   {:.3}", accuracy);
    }
    if let Some(preview) = report.primary_preview() {
        let _ = writeln!(out, "Primary preview:    {}", preview);
    }
    let _ = writeln!(
        out,
        "Processing time:    {:.2}s",
        report.processing_duration_seconds()
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "Layers");
    let _ = writeln!(out, "------");
    for result in report.results().values() {
        if result.protected {
            let _ = writeln!(
                out,
                "[OK]   {:<24} accuracy {:.3}  hash {}",
                result.layer_id, result.bit_accuracy, result.watermark_hash
            );
        } else {
            let _ = writeln!(
                out,
                "[FAIL] {:<24} {}",
                result.layer_id,
                result.error.as_deref().unwrap_or("no result")
            );
        }
    }
    let missing = report.total_layers().saturating_sub(report.results().len());
    if missing > 0 {
        let _ = writeln!(out, "({} layers returned no result)", missing);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use artguard_core::protection::{DeliveryMode, LayerResult, VerificationTier};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn report(session_id: &str, version: u32, protected: usize) -> ProtectionReport {
        let mut results = BTreeMap::new();
        for i in 0..3 {
            let id = format!("main_layer{}", i);
            let result = if i < protected {
                LayerResult::protected(id.clone(), 0.95, format!("h{}", i))
            } else {
                LayerResult::failed(id.clone(), "service rejected layer")
            };
            results.insert(id, result);
        }
        ProtectionReport::new(
            session_id,
            version,
            3,
            results,
            DeliveryMode::Individual,
            &TierThresholds::default(),
        )
        .unwrap()
        .with_duration(2.5)
        .with_primary_preview(Some("main_layer0".to_string()))
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let repo = FileReportRepository::new(temp.path(), TierThresholds::default());
        let original = report("session-a", 1, 3);

        repo.save(&original).await.unwrap();
        let loaded = repo.load("session-a").await.unwrap().unwrap();

        assert_eq!(loaded, original);
        assert_eq!(loaded.verification_tier(), VerificationTier::Perfect);
        assert!(temp.path().join("session-a").join(TEXT_REPORT_FILE).exists());
    }

    #[tokio::test]
    async fn test_resave_overwrites_previous_version() {
        let temp = TempDir::new().unwrap();
        let repo = FileReportRepository::new(temp.path(), TierThresholds::default());

        repo.save(&report("session-b", 1, 1)).await.unwrap();
        repo.save(&report("session-b", 2, 2)).await.unwrap();

        let loaded = repo.load("session-b").await.unwrap().unwrap();
        assert_eq!(loaded.version_number(), 2);
        assert_eq!(loaded.protected_count(), 2);
    }

    #[tokio::test]
    async fn test_metadata_document_contents() {
        let temp = TempDir::new().unwrap();
        let repo = FileReportRepository::new(temp.path(), TierThresholds::default());
        repo.save(&report("session-c", 4, 2)).await.unwrap();

        let raw = std::fs::read_to_string(temp.path().join("session-c").join(METADATA_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["version"], "1.0.0");
        assert_eq!(json["protected_layers"], 2);
        assert_eq!(json["total_layers"], 3);
        assert_eq!(json["verification_tier"], "forensic");
        assert_eq!(json["layers"].as_array().unwrap().len(), 3);
        assert_eq!(json["environment"]["os"], std::env::consts::OS);
    }

    #[tokio::test]
    async fn test_missing_session_is_none() {
        let temp = TempDir::new().unwrap();
        let repo = FileReportRepository::new(temp.path(), TierThresholds::default());
        assert!(repo.load("nobody").await.unwrap().is_none());
        assert!(repo.load("../escape").await.is_err());
    }

    async fn rewrite_metadata(dir: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
        let path = dir.join(METADATA_FILE);
        let mut json: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        edit(&mut json);
        tokio::fs::write(&path, serde_json::to_vec(&json).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_load_rejects_more_layers_than_total() {
        let temp = TempDir::new().unwrap();
        let repo = FileReportRepository::new(temp.path(), TierThresholds::default());
        repo.save(&report("s1", 1, 2)).await.unwrap();
        rewrite_metadata(&temp.path().join("s1"), |json| json["total_layers"] = 1.into()).await;

        let err = repo.load("s1").await.unwrap_err();
        assert!(err.is_serialization());
    }

    #[tokio::test]
    async fn test_load_rejects_duplicate_layer_ids() {
        let temp = TempDir::new().unwrap();
        let repo = FileReportRepository::new(temp.path(), TierThresholds::default());
        repo.save(&report("s2", 1, 3)).await.unwrap();
        rewrite_metadata(&temp.path().join("s2"), |json| {
            json["layers"][1]["layer_id"] = "main_layer0".into();
        })
        .await;

        let err = repo.load("s2").await.unwrap_err();
        assert!(err.is_serialization());
        assert!(err.to_string().contains("main_layer0"));
    }

    #[test]
    fn test_text_report_lists_failures() {
        let text = render_text_report(&report("session-d", 1, 1));
        assert!(text.contains("Layers protected:   1/3"));
        assert!(text.contains("[FAIL] main_layer2"));
        assert!(text.contains("service rejected layer"));
    }
}
