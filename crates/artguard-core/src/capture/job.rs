use super::layer::{Direction, LayerKey, MapType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One captured layer, ready to be packaged for protection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureJob {
    pub direction: Direction,
    pub map_type: MapType,
    /// Encoded image; empty when acquisition failed for this layer
    #[serde(skip)]
    pub image_bytes: Vec<u8>,
    pub strength: f32,
    pub message: String,
    pub captured_at: DateTime<Utc>,
    /// Preview quality in `[0, 1]`, only used to pick the primary preview
    pub quality_score: f32,
    /// Set when the image source failed and a placeholder was substituted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_error: Option<String>,
}

impl CaptureJob {
    pub fn key(&self) -> LayerKey {
        LayerKey::new(self.direction, self.map_type)
    }

    pub fn layer_id(&self) -> String {
        self.key().layer_id()
    }

    pub fn is_placeholder(&self) -> bool {
        self.image_bytes.is_empty()
    }
}
