//! Pipeline configuration.
//!
//! Every field has a default, so a partial `config.toml` (or none at all) is valid.

use crate::capture::{DEFAULT_POOL_SIZE, LayerMatrix, MatrixPreset, StrengthTable};
use crate::error::{ArtguardError, Result};
use crate::protection::TierThresholds;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ProtectionConfig {
    pub service: ServiceConfig,
    pub delivery: DeliveryConfig,
    pub capture: CaptureConfig,
    pub session: SessionConfig,
    pub tiers: TierThresholds,
    pub storage: StorageConfig,
}

impl ProtectionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(ArtguardError::config("service.base_url must not be empty"));
        }
        if self.delivery.max_retry_attempts == 0 {
            return Err(ArtguardError::config(
                "delivery.max_retry_attempts must be at least 1",
            ));
        }
        if !(1..=100).contains(&self.delivery.success_ratio_percent) {
            return Err(ArtguardError::config(format!(
                "delivery.success_ratio_percent must be within 1..=100, got {}",
                self.delivery.success_ratio_percent
            )));
        }
        if self.capture.buffer_pool_size == 0 {
            return Err(ArtguardError::config("capture.buffer_pool_size must be at least 1"));
        }
        if self.capture.image_width == 0 || self.capture.image_height == 0 {
            return Err(ArtguardError::config("capture image size must be non-zero"));
        }
        let matrix = self.capture.layer_matrix();
        if matrix.layer_count() == 0 {
            return Err(ArtguardError::config("capture matrix produces no layers"));
        }
        if let Some(duplicate) = matrix.first_duplicate() {
            return Err(ArtguardError::config(format!(
                "capture matrix lists {} more than once",
                duplicate
            )));
        }
        if let Some((map_type, strength)) = self.capture.strengths.first_out_of_range() {
            return Err(ArtguardError::config(format!(
                "capture strength for {} must be within [0, 1], got {}",
                map_type, strength
            )));
        }
        self.tiers.validate()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
    /// Creator identity sent with individual requests
    pub creator_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout_secs: 60,
            health_timeout_secs: 5,
            creator_id: "anonymous".to_string(),
            api_key: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Whole-request attempts per cycle before falling back
    pub max_retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Individual mode counts an attempt as successful at or above this percentage
    pub success_ratio_percent: u32,
    /// Individual mode yields to the scheduler after this many calls
    pub yield_every: usize,
}

impl DeliveryConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Exact integer comparison, so 80% of 5 (4 layers) passes an 80% threshold.
    pub fn meets_success_ratio(&self, succeeded: usize, total: usize) -> bool {
        total > 0 && succeeded * 100 >= total * self.success_ratio_percent as usize
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            retry_delay_ms: 1000,
            success_ratio_percent: 80,
            yield_every: 3,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub matrix: MatrixPreset,
    pub yield_every: usize,
    pub buffer_pool_size: usize,
    pub image_width: u32,
    pub image_height: u32,
    pub strengths: StrengthTable,
    /// Overrides `matrix` with an explicit descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_matrix: Option<LayerMatrix>,
}

impl CaptureConfig {
    pub fn layer_matrix(&self) -> LayerMatrix {
        self.custom_matrix
            .clone()
            .unwrap_or_else(|| LayerMatrix::from_preset(self.matrix))
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            matrix: MatrixPreset::Standard,
            yield_every: 6,
            buffer_pool_size: DEFAULT_POOL_SIZE,
            image_width: 512,
            image_height: 512,
            strengths: StrengthTable::default(),
            custom_matrix: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Inactivity after which the session is protected and closed
    pub session_timeout_minutes: u64,
    /// How often the watch started with each session checks the timeout; 0 disables it
    pub timeout_check_interval_ms: u64,
    pub protect_on_milestone: bool,
    pub milestone_stroke_interval: u32,
    pub milestone_complexity_threshold: f32,
    pub milestone_min_elapsed_secs: u64,
}

impl SessionConfig {
    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_timeout_minutes as i64)
    }

    pub fn timeout_check_interval(&self) -> Option<Duration> {
        (self.timeout_check_interval_ms > 0)
            .then(|| Duration::from_millis(self.timeout_check_interval_ms))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout_minutes: 30,
            timeout_check_interval_ms: 30_000,
            protect_on_milestone: false,
            milestone_stroke_interval: 50,
            milestone_complexity_threshold: 100.0,
            milestone_min_elapsed_secs: 300,
        }
    }
}

/// Directory overrides; unset fields fall back to the platform data directory.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
}
