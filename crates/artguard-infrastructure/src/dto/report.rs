//! Protection report DTOs

use artguard_core::error::{ArtguardError, Result};
use artguard_core::protection::{
    DeliveryMode, LayerResult, ProtectionReport, TierThresholds, VerificationTier,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Where the report was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub arch: String,
    pub artguard_version: String,
}

impl EnvironmentInfo {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            artguard_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// V1.0.0: `protection_metadata.json`
///
/// `verification_tier` and the counts are written for readers of the file;
/// on load the tier is derived again from the layer results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocumentV1_0_0 {
    pub version: String,
    pub session_id: String,
    pub version_number: u32,
    pub timestamp: DateTime<Utc>,
    pub total_layers: usize,
    pub protected_layers: usize,
    pub verification_tier: VerificationTier,
    pub confidence_percent: u8,
    pub delivery_mode: DeliveryMode,
    pub processing_duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_bit_accuracy: Option<f32>,
    pub layers: Vec<LayerResult>,
    pub environment: EnvironmentInfo,
}

impl ReportDocumentV1_0_0 {
    pub fn from_domain(report: &ProtectionReport) -> Self {
        Self {
            version: REPORT_SCHEMA_VERSION.to_string(),
            session_id: report.session_id().to_string(),
            version_number: report.version_number(),
            timestamp: report.created_at(),
            total_layers: report.total_layers(),
            protected_layers: report.protected_count(),
            verification_tier: report.verification_tier(),
            confidence_percent: report.confidence_percent(),
            delivery_mode: report.delivery_mode(),
            processing_duration_seconds: report.processing_duration_seconds(),
            primary_preview: report.primary_preview().map(str::to_string),
            average_bit_accuracy: report.average_bit_accuracy(),
            layers: report.results().values().cloned().collect(),
            environment: EnvironmentInfo::current(),
        }
    }

    pub fn into_domain(self, thresholds: &TierThresholds) -> Result<ProtectionReport> {
        if self.version != REPORT_SCHEMA_VERSION {
            return Err(malformed(format!(
                "unsupported report schema version {}",
                self.version
            )));
        }

        if self.layers.len() > self.total_layers {
            return Err(malformed(format!(
                "{} layers listed for a report of {} layers",
                self.layers.len(),
                self.total_layers
            )));
        }

        let mut results = BTreeMap::new();
        for layer in self.layers {
            let layer_id = layer.layer_id.clone();
            if results.insert(layer_id.clone(), layer).is_some() {
                return Err(malformed(format!("layer '{}' listed twice", layer_id)));
            }
        }

        Ok(ProtectionReport::new(
            self.session_id,
            self.version_number,
            self.total_layers,
            results,
            self.delivery_mode,
            thresholds,
        )?
        .with_duration(self.processing_duration_seconds)
        .with_primary_preview(self.primary_preview)
        .with_created_at(self.timestamp))
    }
}

fn malformed(message: String) -> ArtguardError {
    ArtguardError::Serialization {
        format: "JSON".to_string(),
        message,
    }
}
