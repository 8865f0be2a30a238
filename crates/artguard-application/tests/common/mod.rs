//! Scripted collaborators for the end-to-end tests.
#![allow(dead_code)]

use artguard_application::{DeliveryClient, ProtectionPipeline};
use artguard_core::capture::{
    ArtworkBounds, BufferPool, CaptureJob, CaptureOrchestrator, ImageSource, PixelBuffer,
    StaticBounds, ViewRequest,
};
use artguard_core::config::{CaptureConfig, DeliveryConfig};
use artguard_core::error::{ArtguardError, Result};
use artguard_core::protection::wire::{HealthResponse, LayerRequest, VerifyRequest, VerifyResponse};
use artguard_core::protection::{
    FallbackReceipt, FallbackStore, ProtectionReport, ProtectionRequest, ProtectionService,
    ReportRepository, TierThresholds,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Gradient image whose colour depends on the view direction.
pub struct GradientSource;

#[async_trait]
impl ImageSource for GradientSource {
    async fn capture(&self, request: &ViewRequest, buffer: &mut PixelBuffer) -> Result<Vec<u8>> {
        let tint = request.direction as u8 * 30;
        let width = buffer.width.max(1) as usize;
        for (i, px) in buffer.rgba.chunks_mut(4).enumerate() {
            let x = (i % width) as u8;
            px.copy_from_slice(&[tint, x.wrapping_mul(40), 255 - tint, 255]);
        }
        Ok(buffer.rgba.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchBehavior {
    AcceptAll,
    Unavailable,
}

/// Protection service with scripted answers and call counters.
pub struct ScriptedService {
    pub batch_support: bool,
    pub batch: BatchBehavior,
    /// Layers accepted per individual attempt, counted from the first layer
    pub individual_successes: usize,
    pub layers_per_attempt: usize,
    pub batch_calls: Mutex<u32>,
    pub layer_calls: Mutex<u32>,
    /// `(entered, release)`: the batch call signals `entered` and waits for `release`
    pub gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedService {
    pub fn batch(behavior: BatchBehavior) -> Self {
        Self {
            batch_support: true,
            batch: behavior,
            individual_successes: 0,
            layers_per_attempt: 18,
            batch_calls: Mutex::new(0),
            layer_calls: Mutex::new(0),
            gate: None,
        }
    }

    pub fn individual(successes: usize, layers: usize) -> Self {
        Self {
            batch_support: false,
            individual_successes: successes,
            layers_per_attempt: layers,
            ..Self::batch(BatchBehavior::Unavailable)
        }
    }

    pub fn gated(entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((entered, release)),
            ..Self::batch(BatchBehavior::AcceptAll)
        }
    }

    pub fn batch_calls(&self) -> u32 {
        *self.batch_calls.lock().unwrap()
    }

    pub fn layer_calls(&self) -> u32 {
        *self.layer_calls.lock().unwrap()
    }
}

#[async_trait]
impl ProtectionService for ScriptedService {
    async fn health(&self) -> Result<HealthResponse> {
        Ok(HealthResponse {
            batch_support: Some(self.batch_support),
            status: Some("ok".to_string()),
        })
    }

    async fn protect_batch(&self, request: &ProtectionRequest) -> Result<Value> {
        *self.batch_calls.lock().unwrap() += 1;
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }

        match self.batch {
            BatchBehavior::Unavailable => Err(ArtguardError::transport(
                "watermark_batch returned 503 Service Unavailable",
            )),
            BatchBehavior::AcceptAll => {
                let results: Vec<Value> = request
                    .layers
                    .iter()
                    .map(|l| {
                        json!({
                            "layer_id": l.layer_id,
                            "success": true,
                            "bit_accuracy": 0.98,
                            "watermark_hash": format!("hash-{}", l.layer_id)
                        })
                    })
                    .collect();
                Ok(json!({
                    "success": true,
                    "session_id": request.session_id,
                    "results": results,
                    "total_processing_time": 1.25
                }))
            }
        }
    }

    async fn protect_layer(&self, request: &LayerRequest) -> Result<Value> {
        let mut calls = self.layer_calls.lock().unwrap();
        let position = (*calls as usize) % self.layers_per_attempt.max(1);
        *calls += 1;
        if position < self.individual_successes {
            Ok(json!({
                "success": true,
                "bit_accuracy": 0.91,
                "hash": format!("hash-{}", request.layer_id),
                "filepath": format!("/srv/out/{}.png", request.layer_id)
            }))
        } else {
            Ok(json!({"success": false, "error": "embedding failed"}))
        }
    }

    async fn verify(&self, _request: &VerifyRequest) -> Result<VerifyResponse> {
        Ok(VerifyResponse {
            detected: true,
            confidence: 0.93,
            message: "watermark found".to_string(),
        })
    }
}

#[derive(Default)]
pub struct MockReportRepository {
    pub reports: Mutex<Vec<ProtectionReport>>,
}

#[async_trait]
impl ReportRepository for MockReportRepository {
    async fn save(&self, report: &ProtectionReport) -> Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<ProtectionReport>> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.session_id() == session_id)
            .cloned())
    }
}

/// Records every backup request along with the payload sizes it was given.
#[derive(Default)]
pub struct MockFallbackStore {
    pub backups: Mutex<Vec<(String, u32, Vec<usize>)>>,
}

#[async_trait]
impl FallbackStore for MockFallbackStore {
    async fn write_backup(
        &self,
        session_id: &str,
        version: u32,
        jobs: &[CaptureJob],
    ) -> Result<FallbackReceipt> {
        let sizes = jobs.iter().map(|j| j.image_bytes.len()).collect();
        self.backups
            .lock()
            .unwrap()
            .push((session_id.to_string(), version, sizes));
        Ok(FallbackReceipt {
            directory: PathBuf::from("/backups").join(session_id).join(format!("v{}", version)),
            files_written: jobs.len(),
        })
    }
}

pub struct Harness {
    pub service: Arc<ScriptedService>,
    pub reports: Arc<MockReportRepository>,
    pub fallback: Arc<MockFallbackStore>,
    pub pipeline: Arc<ProtectionPipeline>,
}

pub fn harness(service: ScriptedService) -> Harness {
    let service = Arc::new(service);
    let reports = Arc::new(MockReportRepository::default());
    let fallback = Arc::new(MockFallbackStore::default());

    let capture = CaptureConfig {
        image_width: 8,
        image_height: 8,
        ..CaptureConfig::default()
    };
    let orchestrator = CaptureOrchestrator::new(
        Arc::new(GradientSource),
        Arc::new(StaticBounds(ArtworkBounds::default())),
        BufferPool::new(capture.buffer_pool_size),
        &capture,
    );
    let delivery = DeliveryClient::new(
        service.clone(),
        fallback.clone(),
        DeliveryConfig {
            retry_delay_ms: 0,
            ..DeliveryConfig::default()
        },
        "e2e-creator",
    );
    let pipeline = ProtectionPipeline::new(
        orchestrator,
        delivery,
        reports.clone(),
        TierThresholds::default(),
    );

    Harness {
        service,
        reports,
        fallback,
        pipeline: Arc::new(pipeline),
    }
}
