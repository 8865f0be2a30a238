//! Error types for the artguard pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole protection pipeline.
///
/// Variants follow the failure classes the pipeline distinguishes: acquisition
/// failures degrade a single layer, transport and serialization failures are
/// retried and then end in a local fallback, parse failures drop one response.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ArtguardError {
    /// Image acquisition failed for one layer
    #[error("Acquisition error for layer '{layer_id}': {message}")]
    Acquisition { layer_id: String, message: String },

    /// Serialization/deserialization error (malformed job data, bad config file)
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "TOML", "job"
        message: String,
    },

    /// Transport error talking to the protection service
    #[error("Transport error: {message}")]
    Transport { message: String, retryable: bool },

    /// Individual-mode attempt fell below the success threshold
    #[error("Partial batch: {succeeded}/{total} layers succeeded")]
    PartialBatch { succeeded: usize, total: usize },

    /// A response body could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not allowed in the current session state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArtguardError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an Acquisition error
    pub fn acquisition(layer_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Acquisition {
            layer_id: layer_id.into(),
            message: message.into(),
        }
    }

    /// Creates a job Serialization error
    pub fn job_serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            format: "job".to_string(),
            message: message.into(),
        }
    }

    /// Creates a retryable Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Check if this is a parse error
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether the delivery client may spend another attempt after this error.
    ///
    /// Serialization errors describe the request itself, so resending it cannot help.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::PartialBatch { .. } | Self::Parse(_) => true,
            _ => false,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ArtguardError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ArtguardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ArtguardError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ArtguardError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (collaborators written against anyhow)
impl From<anyhow::Error> for ArtguardError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ArtguardError>`.
pub type Result<T> = std::result::Result<T, ArtguardError>;
