//! Unified path management for artguard configuration and output files.
//!
//! Paths resolve through the `dirs` crate so they follow platform conventions
//! (XDG on Linux, `Library/` on macOS, `AppData` on Windows).

use artguard_core::config::StorageConfig;
use artguard_core::error::ArtguardError;
use std::path::PathBuf;

const APP_DIR: &str = "artguard";

/// Errors that can occur during path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
    /// The platform data directory could not be determined.
    DataDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
            PathError::DataDirNotFound => write!(f, "Cannot find data directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for ArtguardError {
    fn from(e: PathError) -> Self {
        ArtguardError::config(e.to_string())
    }
}

/// Path layout for artguard.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/artguard/           # Config directory
/// └── config.toml               # ProtectionConfig
///
/// ~/.local/share/artguard/      # Data directory
/// ├── reports/<session_id>/     # protection_metadata.json + protection_report.txt
/// └── backups/<session_id>/v<N>/  # fallback payloads + manifest.json
/// ```
pub struct ArtguardPaths;

impl ArtguardPaths {
    /// Returns the artguard configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/artguard/`)
    /// - `Err(PathError::ConfigDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the artguard data directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to data directory (e.g., `~/.local/share/artguard/`)
    /// - `Err(PathError::DataDirNotFound)`: Could not determine directory
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DataDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn reports_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("reports"))
    }

    pub fn backup_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("backups"))
    }

    /// Reports directory, honouring `storage.reports_dir` when set.
    pub fn resolve_reports_dir(storage: &StorageConfig) -> Result<PathBuf, PathError> {
        match &storage.reports_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::reports_dir(),
        }
    }

    /// Backup directory, honouring `storage.backup_dir` when set.
    pub fn resolve_backup_dir(storage: &StorageConfig) -> Result<PathBuf, PathError> {
        match &storage.backup_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::backup_dir(),
        }
    }
}

/// Rejects session ids that would escape their parent directory.
pub(crate) fn session_dir_name(session_id: &str) -> Result<&str, ArtguardError> {
    let invalid = session_id.is_empty()
        || session_id == "."
        || session_id == ".."
        || session_id.contains(['/', '\\']);
    if invalid {
        Err(ArtguardError::io(format!(
            "invalid session id for a directory name: '{}'",
            session_id
        )))
    } else {
        Ok(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_overrides_take_precedence() {
        let storage = StorageConfig {
            reports_dir: Some(PathBuf::from("/srv/reports")),
            backup_dir: None,
        };
        assert_eq!(
            ArtguardPaths::resolve_reports_dir(&storage).unwrap(),
            PathBuf::from("/srv/reports")
        );
        if let Ok(backups) = ArtguardPaths::resolve_backup_dir(&storage) {
            assert!(backups.ends_with("artguard/backups"));
        }
    }

    #[test]
    fn test_config_file_lives_in_app_dir() {
        if let Ok(path) = ArtguardPaths::config_file() {
            assert!(path.ends_with("artguard/config.toml"));
        }
    }

    #[test]
    fn test_session_dir_name_rejects_traversal() {
        assert!(session_dir_name("4b1c-uuid").is_ok());
        assert!(session_dir_name("..").is_err());
        assert!(session_dir_name("a/b").is_err());
        assert!(session_dir_name("").is_err());
    }
}
