//! Delivery of protection requests with capability negotiation, bounded
//! retries and a local fallback.

use crate::aggregator::ResultAggregator;
use artguard_core::capture::CaptureJob;
use artguard_core::config::DeliveryConfig;
use artguard_core::error::{ArtguardError, Result};
use artguard_core::protection::wire::{BatchEnvelope, VerifyRequest, VerifyResponse};
use artguard_core::protection::{
    DeliveryMode, FallbackReceipt, FallbackStore, ProtectionRequest, ProtectionService,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of delivering one request.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// An attempt succeeded.
    Delivered {
        mode: DeliveryMode,
        attempts: u32,
        results: ResultAggregator,
    },
    /// Every attempt failed and the payloads were backed up locally.
    FallbackWritten {
        attempts: u32,
        results: ResultAggregator,
        receipt: FallbackReceipt,
        cause: ArtguardError,
    },
    /// Every attempt failed and the local backup failed too.
    FallbackFailed {
        attempts: u32,
        results: ResultAggregator,
        cause: ArtguardError,
        error: ArtguardError,
    },
}

impl DeliveryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered { attempts, .. }
            | DeliveryOutcome::FallbackWritten { attempts, .. }
            | DeliveryOutcome::FallbackFailed { attempts, .. } => *attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Sends protection requests to the [`ProtectionService`].
///
/// The batch endpoint is used only after a health probe reported
/// `batch_support`; otherwise each layer is sent on its own.
pub struct DeliveryClient {
    service: Arc<dyn ProtectionService>,
    fallback: Arc<dyn FallbackStore>,
    config: DeliveryConfig,
    creator_id: String,
    batch_supported: AtomicBool,
}

impl DeliveryClient {
    pub fn new(
        service: Arc<dyn ProtectionService>,
        fallback: Arc<dyn FallbackStore>,
        config: DeliveryConfig,
        creator_id: impl Into<String>,
    ) -> Self {
        Self {
            service,
            fallback,
            config,
            creator_id: creator_id.into(),
            batch_supported: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    pub fn batch_supported(&self) -> bool {
        self.batch_supported.load(Ordering::Relaxed)
    }

    /// Probes the service and records whether it accepts batches.
    ///
    /// A failed probe leaves the client in individual mode; it never blocks delivery.
    pub async fn probe_capabilities(&self) -> bool {
        let supported = match self.service.health().await {
            Ok(health) => health.supports_batch(),
            Err(e) => {
                tracing::warn!(
                    "[DeliveryClient] Health probe failed, using individual requests: {}",
                    e
                );
                false
            }
        };
        self.batch_supported.store(supported, Ordering::Relaxed);
        tracing::info!(
            "[DeliveryClient] Service batch support: {}",
            if supported { "yes" } else { "no" }
        );
        supported
    }

    /// Delivers `request`, retrying whole attempts and falling back to a local backup of `jobs`.
    pub async fn deliver(&self, request: &ProtectionRequest, jobs: &[CaptureJob]) -> DeliveryOutcome {
        let mode = if self.batch_supported() {
            DeliveryMode::Batch
        } else {
            DeliveryMode::Individual
        };
        let mut results = ResultAggregator::for_request(request);
        let max_attempts = self.config.max_retry_attempts.max(1);
        let mut attempts = 0;
        let mut last_error = ArtguardError::internal("no delivery attempt was made");

        while attempts < max_attempts {
            attempts += 1;
            let attempt = match mode {
                DeliveryMode::Batch => self.attempt_batch(request, &mut results).await,
                _ => self.attempt_individual(request, &mut results).await,
            };

            match attempt {
                Ok(()) => {
                    tracing::info!(
                        "[DeliveryClient] Delivered {} layers in {} mode (attempt {}/{})",
                        request.layer_count,
                        mode,
                        attempts,
                        max_attempts
                    );
                    return DeliveryOutcome::Delivered {
                        mode,
                        attempts,
                        results,
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        "[DeliveryClient] Attempt {}/{} failed: {}",
                        attempts,
                        max_attempts,
                        e
                    );
                    let retryable = e.is_retryable();
                    last_error = e;
                    if !retryable {
                        break;
                    }
                    if attempts < max_attempts {
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }

        match self.write_fallback(&request.session_id, request.version, jobs).await {
            Ok(receipt) => DeliveryOutcome::FallbackWritten {
                attempts,
                results,
                receipt,
                cause: last_error,
            },
            Err(error) => DeliveryOutcome::FallbackFailed {
                attempts,
                results,
                cause: last_error,
                error,
            },
        }
    }

    /// Writes every job payload to the local backup. Not retried.
    pub async fn write_fallback(
        &self,
        session_id: &str,
        version: u32,
        jobs: &[CaptureJob],
    ) -> Result<FallbackReceipt> {
        match self.fallback.write_backup(session_id, version, jobs).await {
            Ok(receipt) => {
                tracing::error!(
                    "[DeliveryClient] Delivery exhausted; {} payloads backed up to {:?}",
                    receipt.files_written,
                    receipt.directory
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(
                    "[DeliveryClient] Fallback backup for session {} failed: {}",
                    session_id,
                    e
                );
                Err(e)
            }
        }
    }

    /// Submits one image to the verify endpoint.
    pub async fn verify(&self, image_bytes: &[u8]) -> Result<VerifyResponse> {
        let request = VerifyRequest {
            image_base64: BASE64_STANDARD.encode(image_bytes),
        };
        self.service.verify(&request).await
    }

    async fn attempt_batch(
        &self,
        request: &ProtectionRequest,
        results: &mut ResultAggregator,
    ) -> Result<()> {
        let body = self.service.protect_batch(request).await?;
        let envelope: BatchEnvelope = serde_json::from_value(body)
            .map_err(|e| ArtguardError::parse(format!("malformed batch response: {}", e)))?;

        // Keep whatever layers came back even when the batch as a whole failed.
        let accepted = results.merge_batch(&envelope.results);

        if !envelope.success {
            return Err(ArtguardError::transport("service reported batch failure"));
        }

        tracing::debug!(
            "[DeliveryClient] Batch response: {} entries accepted, service time {:.2}s",
            accepted,
            envelope.total_processing_time
        );
        Ok(())
    }

    async fn attempt_individual(
        &self,
        request: &ProtectionRequest,
        results: &mut ResultAggregator,
    ) -> Result<()> {
        let total = request.layers.len();
        let yield_every = self.config.yield_every.max(1);
        let mut succeeded = 0usize;

        for (index, layer) in request.layers.iter().enumerate() {
            let body = request.layer_request(layer, &self.creator_id);
            match self.service.protect_layer(&body).await {
                Ok(response) => {
                    if results.merge_individual(&layer.layer_id, &response) == Some(true) {
                        succeeded += 1;
                    }
                }
                Err(e) => {
                    tracing::debug!("[DeliveryClient] Layer {} failed: {}", layer.layer_id, e);
                    results.record_failure(&layer.layer_id, e.to_string());
                }
            }

            if (index + 1) % yield_every == 0 {
                tokio::task::yield_now().await;
            }
        }

        if self.config.meets_success_ratio(succeeded, total) {
            Ok(())
        } else {
            Err(ArtguardError::PartialBatch { succeeded, total })
        }
    }
}
