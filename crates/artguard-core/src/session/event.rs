use super::trigger::ProtectionTrigger;
use crate::protection::{DeliveryMode, VerificationTier};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle events published by the session manager to its subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        session_id: String,
    },
    ProtectionStarted {
        session_id: String,
        version: u32,
        trigger: ProtectionTrigger,
    },
    ProtectionCompleted {
        session_id: String,
        version: u32,
        protected_layers: usize,
        total_layers: usize,
        tier: VerificationTier,
        delivery_mode: DeliveryMode,
    },
    /// Remote delivery was exhausted and payloads were backed up locally.
    FallbackWritten {
        session_id: String,
        version: u32,
        directory: PathBuf,
        files_written: usize,
    },
    /// A trigger arrived while it could not be acted on.
    TriggerIgnored {
        trigger: ProtectionTrigger,
        reason: String,
    },
    SessionEnded {
        session_id: String,
        /// Number of cycles that ran during the session
        cycles: u32,
    },
}
