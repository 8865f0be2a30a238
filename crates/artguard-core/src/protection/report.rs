use super::tier::{TierThresholds, VerificationTier};
use crate::error::{ArtguardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Normalized outcome for one layer, whatever response shape produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResult {
    pub layer_id: String,
    pub protected: bool,
    /// Fraction of embedded bits read back correctly, in `[0, 1]`
    pub bit_accuracy: f32,
    pub watermark_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LayerResult {
    pub fn protected(layer_id: impl Into<String>, bit_accuracy: f32, hash: impl Into<String>) -> Self {
        Self {
            layer_id: layer_id.into(),
            protected: true,
            bit_accuracy: clamp_unit(bit_accuracy),
            watermark_hash: hash.into(),
            error: None,
        }
    }

    pub fn failed(layer_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            layer_id: layer_id.into(),
            protected: false,
            bit_accuracy: 0.0,
            watermark_hash: String::new(),
            error: Some(error.into()),
        }
    }
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// How the results in a report were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Batch,
    Individual,
    /// Remote delivery was exhausted and payloads were written locally
    Fallback,
    Verify,
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeliveryMode::Batch => "batch",
            DeliveryMode::Individual => "individual",
            DeliveryMode::Fallback => "fallback",
            DeliveryMode::Verify => "verify",
        };
        f.write_str(s)
    }
}

/// Outcome of one protection cycle.
///
/// The tier is derived from the protected-layer count when the report is
/// built and cannot be set on its own. Layers missing from `results` count as
/// not protected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtectionReport {
    session_id: String,
    version_number: u32,
    total_layers: usize,
    results: BTreeMap<String, LayerResult>,
    verification_tier: VerificationTier,
    processing_duration_seconds: f64,
    created_at: DateTime<Utc>,
    primary_preview: Option<String>,
    delivery_mode: DeliveryMode,
}

impl ProtectionReport {
    /// Builds a report from per-layer results keyed by layer id.
    ///
    /// # Errors
    ///
    /// Returns `Internal` when there are more results than layers or a
    /// result is filed under a key other than its own `layer_id`.
    pub fn new(
        session_id: impl Into<String>,
        version_number: u32,
        total_layers: usize,
        results: BTreeMap<String, LayerResult>,
        delivery_mode: DeliveryMode,
        thresholds: &TierThresholds,
    ) -> Result<Self> {
        if results.len() > total_layers {
            return Err(ArtguardError::internal(format!(
                "{} layer results for a report of {} layers",
                results.len(),
                total_layers
            )));
        }
        if let Some((key, result)) = results.iter().find(|(key, r)| **key != r.layer_id) {
            return Err(ArtguardError::internal(format!(
                "result for layer '{}' filed under '{}'",
                result.layer_id, key
            )));
        }

        let protected = results.values().filter(|r| r.protected).count();
        let mut report = Self::without_results(
            session_id,
            version_number,
            total_layers,
            delivery_mode,
            thresholds,
        );
        report.verification_tier = thresholds.tier_for(protected, total_layers);
        report.results = results;
        Ok(report)
    }

    /// A report in which no layer has a result.
    pub fn without_results(
        session_id: impl Into<String>,
        version_number: u32,
        total_layers: usize,
        delivery_mode: DeliveryMode,
        thresholds: &TierThresholds,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            version_number,
            total_layers,
            verification_tier: thresholds.tier_for(0, total_layers),
            results: BTreeMap::new(),
            processing_duration_seconds: 0.0,
            created_at: Utc::now(),
            primary_preview: None,
            delivery_mode,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.processing_duration_seconds = seconds.max(0.0);
        self
    }

    pub fn with_primary_preview(mut self, layer_id: Option<String>) -> Self {
        self.primary_preview = layer_id;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn version_number(&self) -> u32 {
        self.version_number
    }

    pub fn total_layers(&self) -> usize {
        self.total_layers
    }

    pub fn results(&self) -> &BTreeMap<String, LayerResult> {
        &self.results
    }

    pub fn result(&self, layer_id: &str) -> Option<&LayerResult> {
        self.results.get(layer_id)
    }

    pub fn protected_count(&self) -> usize {
        self.results.values().filter(|r| r.protected).count()
    }

    pub fn verification_tier(&self) -> VerificationTier {
        self.verification_tier
    }

    pub fn confidence_percent(&self) -> u8 {
        self.verification_tier.confidence_percent()
    }

    pub fn processing_duration_seconds(&self) -> f64 {
        self.processing_duration_seconds
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn primary_preview(&self) -> Option<&str> {
        self.primary_preview.as_deref()
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    /// Mean bit accuracy over protected layers, `None` when nothing was protected.
    pub fn average_bit_accuracy(&self) -> Option<f32> {
        let protected: Vec<f32> = self
            .results
            .values()
            .filter(|r| r.protected)
            .map(|r| r.bit_accuracy)
            .collect();
        if protected.is_empty() {
            None
        } else {
            Some(protected.iter().sum::<f32>() / protected.len() as f32)
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Session {} v{}: {}/{} layers protected - {} ({}% confidence, {})",
            self.session_id,
            self.version_number,
            self.protected_count(),
            self.total_layers,
            self.verification_tier,
            self.confidence_percent(),
            self.delivery_mode
        )
    }
}
