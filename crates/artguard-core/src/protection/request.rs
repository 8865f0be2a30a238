//! Packaging of a cycle's capture jobs into one protection request.

use super::wire::{LayerRequest, WireLayer};
use crate::capture::CaptureJob;
use crate::error::{ArtguardError, Result};
use crate::session::CreationSession;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::Serialize;
use std::collections::HashSet;

/// Every layer of one cycle, serialized for the wire.
///
/// Serializes to exactly the `POST /watermark_batch` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtectionRequest {
    pub session_id: String,
    #[serde(skip)]
    pub version: u32,
    pub layer_count: usize,
    pub layers: Vec<WireLayer>,
}

impl ProtectionRequest {
    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.layer_id.as_str())
    }

    /// Builds the individual-endpoint body for one layer.
    pub fn layer_request(&self, layer: &WireLayer, creator_id: &str) -> LayerRequest {
        LayerRequest {
            session_id: self.session_id.clone(),
            creator_id: creator_id.to_string(),
            version: self.version,
            layer_id: layer.layer_id.clone(),
            image_base64: layer.image_base64.clone(),
            strength: layer.strength,
            message: layer.message.clone(),
        }
    }
}

/// Groups all jobs of a cycle into a [`ProtectionRequest`].
///
/// Assembly always happens, whether or not the service accepts batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchAssembler;

impl BatchAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Fails with a serialization error on malformed job data; nothing is sent in that case.
    pub fn assemble(
        &self,
        session: &CreationSession,
        jobs: &[CaptureJob],
    ) -> Result<ProtectionRequest> {
        if jobs.is_empty() {
            return Err(ArtguardError::job_serialization("no capture jobs to assemble"));
        }

        let mut seen = HashSet::with_capacity(jobs.len());
        let mut layers = Vec::with_capacity(jobs.len());

        for job in jobs {
            let layer_id = job.layer_id();
            if !seen.insert(layer_id.clone()) {
                return Err(ArtguardError::job_serialization(format!(
                    "duplicate layer '{}' in one cycle",
                    layer_id
                )));
            }
            if !job.strength.is_finite() || !(0.0..=1.0).contains(&job.strength) {
                return Err(ArtguardError::job_serialization(format!(
                    "layer '{}' has invalid strength {}",
                    layer_id, job.strength
                )));
            }
            if job.message.is_empty() {
                return Err(ArtguardError::job_serialization(format!(
                    "layer '{}' has an empty embed message",
                    layer_id
                )));
            }

            layers.push(WireLayer {
                layer_id,
                image_base64: BASE64_STANDARD.encode(&job.image_bytes),
                strength: job.strength,
                message: job.message.clone(),
            });
        }

        tracing::debug!(
            "[BatchAssembler] Assembled {} layers for session {} v{}",
            layers.len(),
            session.id,
            session.version_number
        );

        Ok(ProtectionRequest {
            session_id: session.id.clone(),
            version: session.version_number,
            layer_count: layers.len(),
            layers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Direction, MapType};
    use chrono::Utc;

    fn job(direction: Direction, map_type: MapType, bytes: &[u8]) -> CaptureJob {
        CaptureJob {
            direction,
            map_type,
            image_bytes: bytes.to_vec(),
            strength: 0.7,
            message: format!("{}_{}_s", direction.tag(), map_type.tag()),
            captured_at: Utc::now(),
            quality_score: 0.5,
            acquisition_error: None,
        }
    }

    #[test]
    fn test_assemble_matches_batch_wire_shape() {
        let session = CreationSession::new();
        let jobs = vec![
            job(Direction::Main, MapType::Depth, b"abc"),
            job(Direction::Main, MapType::Normal, b""),
        ];

        let request = BatchAssembler::new().assemble(&session, &jobs).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["session_id"], session.id.as_str());
        assert_eq!(body["layer_count"], 2);
        assert_eq!(body["layers"][0]["layer_id"], "main_depth");
        assert_eq!(body["layers"][0]["image_base64"], "YWJj");
        assert_eq!(body["layers"][1]["image_base64"], "");
        assert!(body.get("version").is_none());
    }

    #[test]
    fn test_duplicate_layers_abort_assembly() {
        let session = CreationSession::new();
        let jobs = vec![
            job(Direction::Top, MapType::Depth, b"a"),
            job(Direction::Top, MapType::Depth, b"b"),
        ];

        let err = BatchAssembler::new().assemble(&session, &jobs).unwrap_err();
        assert!(err.is_serialization());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_invalid_strength_aborts_assembly() {
        let session = CreationSession::new();
        let mut bad = job(Direction::Top, MapType::Depth, b"a");
        bad.strength = f32::NAN;

        assert!(BatchAssembler::new().assemble(&session, &[bad]).is_err());
        assert!(BatchAssembler::new().assemble(&session, &[]).is_err());
    }

    #[test]
    fn test_layer_request_carries_metadata() {
        let mut session = CreationSession::new();
        session.version_number = 3;
        let jobs = vec![job(Direction::Left, MapType::AmbientOcclusion, b"x")];
        let request = BatchAssembler::new().assemble(&session, &jobs).unwrap();

        let single = request.layer_request(&request.layers[0], "artist-7");
        assert_eq!(single.version, 3);
        assert_eq!(single.creator_id, "artist-7");
        assert_eq!(single.layer_id, "left_ao");
    }
}
