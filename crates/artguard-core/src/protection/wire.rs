//! Wire shapes of the external protection service.

use serde::{Deserialize, Serialize};

/// `GET /health` body. Only `batch_support` matters; absence means no batching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub batch_support: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
}

impl HealthResponse {
    pub fn supports_batch(&self) -> bool {
        self.batch_support.unwrap_or(false)
    }
}

/// One serialized layer inside a batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireLayer {
    pub layer_id: String,
    pub image_base64: String,
    pub strength: f32,
    pub message: String,
}

/// Top-level `POST /watermark_batch` response.
///
/// Per-layer entries stay as raw JSON so one malformed entry can be dropped
/// without discarding the rest.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEnvelope {
    pub success: bool,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub total_processing_time: f64,
}

/// One entry of [`BatchEnvelope::results`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLayerResult {
    pub layer_id: String,
    pub success: bool,
    #[serde(default)]
    pub bit_accuracy: f32,
    #[serde(default)]
    pub watermark_hash: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /watermark` body: one layer plus session metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerRequest {
    pub session_id: String,
    pub creator_id: String,
    pub version: u32,
    pub layer_id: String,
    pub image_base64: String,
    pub strength: f32,
    pub message: String,
}

/// `POST /watermark` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResponse {
    pub success: bool,
    #[serde(default)]
    pub bit_accuracy: Option<f32>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /verify` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyRequest {
    pub image_base64: String,
}

/// `POST /verify` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub detected: bool,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_health_without_flag_means_individual_mode() {
        let health: HealthResponse = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert!(!health.supports_batch());

        let health: HealthResponse =
            serde_json::from_value(json!({"batch_support": true})).unwrap();
        assert!(health.supports_batch());
    }

    #[test]
    fn test_batch_envelope_keeps_entries_raw() {
        let envelope: BatchEnvelope = serde_json::from_value(json!({
            "success": true,
            "session_id": "s1",
            "results": [{"layer_id": "main_depth", "success": true}, {"oops": 1}],
            "total_processing_time": 2.5
        }))
        .unwrap();
        assert_eq!(envelope.results.len(), 2);

        let first: BatchLayerResult = serde_json::from_value(envelope.results[0].clone()).unwrap();
        assert_eq!(first.bit_accuracy, 0.0);
        assert!(serde_json::from_value::<BatchLayerResult>(envelope.results[1].clone()).is_err());
    }
}
