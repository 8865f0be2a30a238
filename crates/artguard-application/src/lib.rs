//! Application layer of the artguard protection pipeline.
//!
//! This crate coordinates the domain types from `artguard-core` with the
//! collaborators injected by the caller: delivery with retry and fallback,
//! response aggregation, the per-cycle pipeline and the session lifecycle.

pub mod aggregator;
pub mod delivery;
pub mod pipeline;
pub mod session;

#[cfg(test)]
mod test_support;

pub use aggregator::ResultAggregator;
pub use delivery::{DeliveryClient, DeliveryOutcome};
pub use pipeline::{CycleOutcome, FallbackStatus, ProtectionPipeline, VERIFY_LAYER_ID};
pub use session::{ProtectionSessionManager, TriggerOutcome};
