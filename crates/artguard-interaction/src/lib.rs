//! Adapters for external services used by the artguard pipeline.

pub mod http_protection_service;

pub use http_protection_service::HttpProtectionService;
