//! Infrastructure layer for artguard: paths, configuration loading and
//! file-backed implementations of the persistence collaborators.

pub mod config_service;
pub mod dto;
pub mod file_fallback_store;
pub mod file_report_repository;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::file_fallback_store::FileFallbackStore;
pub use crate::file_report_repository::FileReportRepository;
pub use crate::paths::ArtguardPaths;
