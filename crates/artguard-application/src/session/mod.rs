//! Session lifecycle services.
//!
//! The manager owns the live `CreationSession` and turns triggers into
//! protection cycles run by the `ProtectionPipeline`.

mod manager;

pub use manager::{ProtectionSessionManager, TriggerOutcome};
