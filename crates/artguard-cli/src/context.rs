//! Wiring of configuration and collaborators for the CLI commands.

use crate::synthetic::SyntheticImageSource;
use anyhow::{Context, Result};
use artguard_application::{DeliveryClient, ProtectionPipeline};
use artguard_core::capture::{ArtworkBounds, BufferPool, CaptureOrchestrator, StaticBounds};
use artguard_core::config::ProtectionConfig;
use artguard_infrastructure::{ConfigService, FileFallbackStore, FileReportRepository};
use artguard_interaction::HttpProtectionService;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loads the effective configuration; `--service-url` wins over file and environment.
pub fn load_config(path: Option<&Path>, service_url: Option<&str>) -> Result<ProtectionConfig> {
    let service = match path {
        Some(path) => ConfigService::new(path),
        None => ConfigService::default_location().context("Failed to locate config file")?,
    };

    let mut config = service
        .get_config()
        .with_context(|| format!("Failed to load config from {}", service.path().display()))?;

    if let Some(url) = service_url {
        config.service.base_url = url.to_string();
        config.validate().context("Invalid --service-url")?;
    }
    Ok(config)
}

/// A fully wired pipeline plus the locations it writes to.
pub struct PipelineContext {
    pub pipeline: Arc<ProtectionPipeline>,
    pub reports_dir: PathBuf,
    pub backup_dir: PathBuf,
}

pub fn build_pipeline(config: &ProtectionConfig) -> Result<PipelineContext> {
    let service = Arc::new(HttpProtectionService::from_config(&config.service));

    let reports = FileReportRepository::from_storage(&config.storage, config.tiers)
        .context("Failed to resolve reports directory")?;
    let fallback =
        FileFallbackStore::from_storage(&config.storage).context("Failed to resolve backup directory")?;
    let reports_dir = reports.base_dir().to_path_buf();
    let backup_dir = fallback.base_dir().to_path_buf();

    let bounds = ArtworkBounds {
        center: [0.0, 1.2, 0.0],
        extents: [0.5, 0.5, 0.5],
    };
    let orchestrator = CaptureOrchestrator::new(
        Arc::new(SyntheticImageSource::new()),
        Arc::new(StaticBounds(bounds)),
        BufferPool::new(config.capture.buffer_pool_size),
        &config.capture,
    );
    let delivery = DeliveryClient::new(
        service,
        Arc::new(fallback),
        config.delivery.clone(),
        config.service.creator_id.clone(),
    );
    let pipeline = ProtectionPipeline::new(orchestrator, delivery, Arc::new(reports), config.tiers);

    Ok(PipelineContext {
        pipeline: Arc::new(pipeline),
        reports_dir,
        backup_dir,
    })
}
