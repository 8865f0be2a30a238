//! Data Transfer Objects (DTOs) for persistence.
//!
//! DTOs carry an explicit `version` so the on-disk schema can evolve
//! independently of the domain types.
//!
//! ### ReportDocument Version History
//! - **1.0.0**: Initial schema (counts, tier, per-layer results, environment info)
//!
//! ### BackupManifest Version History
//! - **1.0.0**: Initial schema (one entry per payload file)

mod backup;
mod report;

pub use backup::{BackupEntryV1_0_0, BackupManifestV1_0_0};
pub use report::{EnvironmentInfo, ReportDocumentV1_0_0};
