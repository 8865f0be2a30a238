//! In-memory collaborators shared by the unit tests of this crate.

use crate::delivery::DeliveryClient;
use crate::pipeline::ProtectionPipeline;
use artguard_core::capture::{
    ArtworkBounds, BufferPool, CaptureJob, CaptureOrchestrator, ImageSource, PixelBuffer,
    StaticBounds, ViewRequest,
};
use artguard_core::config::{CaptureConfig, DeliveryConfig};
use artguard_core::error::Result;
use artguard_core::protection::wire::{HealthResponse, LayerRequest, VerifyRequest, VerifyResponse};
use artguard_core::protection::{
    FallbackReceipt, FallbackStore, ProtectionReport, ProtectionRequest, ProtectionService,
    ReportRepository, TierThresholds,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub struct SolidSource;

#[async_trait]
impl ImageSource for SolidSource {
    async fn capture(&self, _request: &ViewRequest, buffer: &mut PixelBuffer) -> Result<Vec<u8>> {
        for px in buffer.rgba.chunks_mut(4) {
            px.copy_from_slice(&[200, 40, 40, 255]);
        }
        Ok(vec![1, 2, 3])
    }
}

/// Batch-capable service that protects every layer it receives.
pub struct AcceptAll {
    pub detected: bool,
}

#[async_trait]
impl ProtectionService for AcceptAll {
    async fn health(&self) -> Result<HealthResponse> {
        Ok(HealthResponse {
            batch_support: Some(true),
            status: Some("ok".to_string()),
        })
    }

    async fn protect_batch(&self, request: &ProtectionRequest) -> Result<Value> {
        let results: Vec<Value> = request
            .layers
            .iter()
            .map(|l| {
                json!({"layer_id": l.layer_id, "success": true, "bit_accuracy": 0.99, "watermark_hash": "h"})
            })
            .collect();
        Ok(json!({
            "success": true,
            "session_id": request.session_id,
            "results": results,
            "total_processing_time": 0.1
        }))
    }

    async fn protect_layer(&self, _request: &LayerRequest) -> Result<Value> {
        Ok(json!({"success": true, "hash": "h"}))
    }

    async fn verify(&self, _request: &VerifyRequest) -> Result<VerifyResponse> {
        Ok(VerifyResponse {
            detected: self.detected,
            confidence: 0.87,
            message: "checked".to_string(),
        })
    }
}

#[derive(Default)]
pub struct MemoryReports {
    pub saved: Mutex<Vec<ProtectionReport>>,
}

#[async_trait]
impl ReportRepository for MemoryReports {
    async fn save(&self, report: &ProtectionReport) -> Result<()> {
        self.saved.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<ProtectionReport>> {
        Ok(self
            .saved
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.session_id() == session_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryFallback {
    pub calls: Mutex<u32>,
}

#[async_trait]
impl FallbackStore for MemoryFallback {
    async fn write_backup(
        &self,
        session_id: &str,
        _version: u32,
        jobs: &[CaptureJob],
    ) -> Result<FallbackReceipt> {
        *self.calls.lock().unwrap() += 1;
        Ok(FallbackReceipt {
            directory: PathBuf::from(session_id),
            files_written: jobs.len(),
        })
    }
}

/// Standard matrix with tiny images and no retry delay.
pub fn build_pipeline(
    service: Arc<dyn ProtectionService>,
    reports: Arc<MemoryReports>,
    fallback: Arc<MemoryFallback>,
) -> ProtectionPipeline {
    build_pipeline_with(service, reports, fallback, tiny_capture())
}

pub fn tiny_capture() -> CaptureConfig {
    CaptureConfig {
        image_width: 4,
        image_height: 4,
        ..CaptureConfig::default()
    }
}

pub fn build_pipeline_with(
    service: Arc<dyn ProtectionService>,
    reports: Arc<MemoryReports>,
    fallback: Arc<MemoryFallback>,
    capture: CaptureConfig,
) -> ProtectionPipeline {
    let orchestrator = CaptureOrchestrator::new(
        Arc::new(SolidSource),
        Arc::new(StaticBounds(ArtworkBounds::default())),
        BufferPool::new(2),
        &capture,
    );
    let delivery = DeliveryClient::new(
        service,
        fallback,
        DeliveryConfig {
            retry_delay_ms: 0,
            ..DeliveryConfig::default()
        },
        "tester",
    );
    ProtectionPipeline::new(orchestrator, delivery, reports, TierThresholds::default())
}
