//! Configuration service implementation.
//!
//! Loads `ProtectionConfig` from `config.toml` (by default
//! `~/.config/artguard/config.toml`), applies environment overrides and
//! caches the result.
//!
//! Priority: environment (`ARTGUARD_SERVICE_URL`, `ARTGUARD_API_KEY`) > file > defaults

use crate::paths::ArtguardPaths;
use crate::storage::write_atomic_sync;
use artguard_core::config::ProtectionConfig;
use artguard_core::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const ENV_SERVICE_URL: &str = "ARTGUARD_SERVICE_URL";
pub const ENV_API_KEY: &str = "ARTGUARD_API_KEY";

/// Loads and caches the pipeline configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration, filled on first access.
    config: Arc<RwLock<Option<ProtectionConfig>>>,
}

impl ConfigService {
    /// Creates a service reading `path`. Nothing is read until the first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service for the platform config file.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(ArtguardPaths::config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the effective configuration, loading it on first access.
    ///
    /// A missing file yields the defaults. A file that fails to parse or
    /// validate is an error rather than a silent fallback.
    pub fn get_config(&self) -> Result<ProtectionConfig> {
        {
            let cached = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let mut loaded = self.load_file()?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());
        loaded.validate()?;

        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = None;
    }

    /// Validates and writes `config` to the file, then refreshes the cache.
    pub fn save(&self, config: &ProtectionConfig) -> Result<()> {
        config.validate()?;
        let rendered = config.to_toml()?;
        write_atomic_sync(&self.path, rendered.as_bytes())?;
        tracing::info!("[ConfigService] Saved configuration to {:?}", self.path);
        self.invalidate_cache();
        Ok(())
    }

    fn load_file(&self) -> Result<ProtectionConfig> {
        if !self.path.exists() {
            tracing::debug!(
                "[ConfigService] No config file at {:?}, using defaults",
                self.path
            );
            return Ok(ProtectionConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ProtectionConfig::default());
        }

        let config = ProtectionConfig::from_toml_str(&content)?;
        tracing::info!("[ConfigService] Loaded configuration from {:?}", self.path);
        Ok(config)
    }
}

/// Applies environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut ProtectionConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_SERVICE_URL).filter(|v| !v.trim().is_empty()) {
        tracing::debug!("[ConfigService] {} overrides service.base_url", ENV_SERVICE_URL);
        config.service.base_url = url;
    }
    if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
        config.service.api_key = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artguard_core::capture::MatrixPreset;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let service = ConfigService::new(temp.path().join("config.toml"));

        let config = service.load_file().unwrap();
        assert_eq!(config, ProtectionConfig::default());
    }

    #[test]
    fn test_save_then_reload() {
        let temp = TempDir::new().unwrap();
        let service = ConfigService::new(temp.path().join("nested/config.toml"));

        let mut config = ProtectionConfig::default();
        config.capture.matrix = MatrixPreset::Extended;
        config.delivery.max_retry_attempts = 5;
        service.save(&config).unwrap();

        let loaded = service.load_file().unwrap();
        assert_eq!(loaded.capture.matrix, MatrixPreset::Extended);
        assert_eq!(loaded.delivery.max_retry_attempts, 5);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[delivery]\nsuccess_ratio_percent = 0\n").unwrap();

        let err = ConfigService::new(path).get_config().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ProtectionConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            ENV_SERVICE_URL => Some("https://guard.internal:9000".to_string()),
            ENV_API_KEY => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.service.base_url, "https://guard.internal:9000");
        assert_eq!(config.service.api_key, None, "blank values are ignored");
    }

    #[test]
    fn test_config_is_cached_until_invalidated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[delivery]\nmax_retry_attempts = 4\n").unwrap();
        let service = ConfigService::new(&path);

        assert_eq!(service.get_config().unwrap().delivery.max_retry_attempts, 4);

        std::fs::write(&path, "[delivery]\nmax_retry_attempts = 2\n").unwrap();
        assert_eq!(service.get_config().unwrap().delivery.max_retry_attempts, 4);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().delivery.max_retry_attempts, 2);
    }
}
