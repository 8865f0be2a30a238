use super::request::ProtectionRequest;
use super::wire::{HealthResponse, LayerRequest, VerifyRequest, VerifyResponse};
use crate::error::Result;
use async_trait::async_trait;

/// The external watermark-embedding service.
///
/// Protection calls return the raw JSON body on a 2xx response so the result
/// aggregator can drop malformed entries one by one. Non-2xx responses,
/// timeouts and connection failures are returned as transport errors.
#[async_trait]
pub trait ProtectionService: Send + Sync {
    /// Capability probe (`GET /health`).
    async fn health(&self) -> Result<HealthResponse>;

    /// Protects every layer in one call (`POST /watermark_batch`).
    async fn protect_batch(&self, request: &ProtectionRequest) -> Result<serde_json::Value>;

    /// Protects one layer (`POST /watermark`).
    async fn protect_layer(&self, request: &LayerRequest) -> Result<serde_json::Value>;

    /// Checks one image for a watermark (`POST /verify`).
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse>;
}
