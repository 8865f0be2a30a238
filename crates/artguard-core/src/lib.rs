//! Domain layer of the artguard protection pipeline.
//!
//! Capture, scoring, packaging and tier rules live here together with the
//! traits for the collaborators the pipeline talks to (`ImageSource`,
//! `ProtectionService`, `ReportRepository`, `FallbackStore`).

pub mod capture;
pub mod config;
pub mod error;
pub mod protection;
pub mod quality;
pub mod session;

// Re-export common error type
pub use error::{ArtguardError, Result};
