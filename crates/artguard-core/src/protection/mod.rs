//! Protection domain module.
//!
//! # Module Structure
//!
//! - `wire`: request/response shapes of the external service
//! - `request`: `ProtectionRequest` and the `BatchAssembler`
//! - `report`: `LayerResult`, `ProtectionReport`, `DeliveryMode`
//! - `tier`: `VerificationTier` and `TierThresholds`
//! - `service`: the `ProtectionService` trait
//! - `repository`: `ReportRepository` and `FallbackStore` traits

mod report;
mod repository;
mod request;
mod service;
mod tier;
pub mod wire;

pub use report::{DeliveryMode, LayerResult, ProtectionReport};
pub use repository::{FallbackReceipt, FallbackStore, ReportRepository};
pub use request::{BatchAssembler, ProtectionRequest};
pub use service::ProtectionService;
pub use tier::{Fraction, TierThresholds, VerificationTier};
