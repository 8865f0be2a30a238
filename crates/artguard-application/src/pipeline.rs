//! One protection cycle as an explicit state machine.
//!
//! ```text
//! Capture -> Assemble -> Deliver -> Aggregate -> Persist -> Done
//!               |                                  ^
//!               +------------ Fallback ------------+
//! ```
//!
//! Each state owns the data produced by the previous phase, so nothing is
//! shared between phases except through the transition itself.

use crate::delivery::{DeliveryClient, DeliveryOutcome};
use artguard_core::capture::{CaptureJob, CaptureOrchestrator};
use artguard_core::error::{ArtguardError, Result};
use artguard_core::protection::{
    BatchAssembler, DeliveryMode, FallbackReceipt, LayerResult, ProtectionReport,
    ProtectionRequest, ReportRepository, TierThresholds,
};
use artguard_core::session::CreationSession;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Layer id used for the single result of a verify call.
pub const VERIFY_LAYER_ID: &str = "verify";

/// What happened to the local backup during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackStatus {
    NotNeeded,
    Written(FallbackReceipt),
    /// Delivery and the backup both failed
    Failed(String),
}

/// Terminal result of one cycle. A cycle never fails as a whole.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub report: ProtectionReport,
    pub fallback: FallbackStatus,
    pub attempts: u32,
    /// Whether the report repository accepted the report
    pub persisted: bool,
}

enum CycleState {
    Capture,
    Assemble {
        jobs: Vec<CaptureJob>,
    },
    Deliver {
        jobs: Vec<CaptureJob>,
        request: ProtectionRequest,
    },
    /// Assembly failed; nothing was sent.
    Fallback {
        jobs: Vec<CaptureJob>,
        cause: ArtguardError,
    },
    Aggregate {
        jobs: Vec<CaptureJob>,
        outcome: DeliveryOutcome,
    },
    Persist {
        report: ProtectionReport,
        fallback: FallbackStatus,
        attempts: u32,
    },
    Done(CycleOutcome),
}

impl CycleState {
    fn name(&self) -> &'static str {
        match self {
            CycleState::Capture => "capture",
            CycleState::Assemble { .. } => "assemble",
            CycleState::Deliver { .. } => "deliver",
            CycleState::Fallback { .. } => "fallback",
            CycleState::Aggregate { .. } => "aggregate",
            CycleState::Persist { .. } => "persist",
            CycleState::Done(_) => "done",
        }
    }
}

/// Capture, delivery, aggregation and persistence for one session version.
pub struct ProtectionPipeline {
    orchestrator: CaptureOrchestrator,
    assembler: BatchAssembler,
    delivery: DeliveryClient,
    reports: Arc<dyn ReportRepository>,
    thresholds: TierThresholds,
}

impl ProtectionPipeline {
    pub fn new(
        orchestrator: CaptureOrchestrator,
        delivery: DeliveryClient,
        reports: Arc<dyn ReportRepository>,
        thresholds: TierThresholds,
    ) -> Self {
        Self {
            orchestrator,
            assembler: BatchAssembler::new(),
            delivery,
            reports,
            thresholds,
        }
    }

    pub fn orchestrator(&self) -> &CaptureOrchestrator {
        &self.orchestrator
    }

    pub fn delivery(&self) -> &DeliveryClient {
        &self.delivery
    }

    /// Runs the service health probe; see [`DeliveryClient::probe_capabilities`].
    pub async fn probe_capabilities(&self) -> bool {
        self.delivery.probe_capabilities().await
    }

    /// Runs one full cycle for the current version of `session`.
    pub async fn run(&self, session: &CreationSession) -> CycleOutcome {
        let span = tracing::info_span!(
            "protection_cycle",
            session_id = %session.id,
            version = session.version_number
        );
        self.run_cycle(session).instrument(span).await
    }

    async fn run_cycle(&self, session: &CreationSession) -> CycleOutcome {
        let started = Instant::now();
        let mut state = CycleState::Capture;

        loop {
            tracing::debug!("[ProtectionPipeline] Entering {} phase", state.name());
            state = match state {
                CycleState::Capture => CycleState::Assemble {
                    jobs: self.orchestrator.produce_jobs(session).await,
                },
                CycleState::Assemble { jobs } => match self.assembler.assemble(session, &jobs) {
                    Ok(request) => CycleState::Deliver { jobs, request },
                    Err(cause) => {
                        tracing::error!(
                            "[ProtectionPipeline] Assembly failed, skipping delivery: {}",
                            cause
                        );
                        CycleState::Fallback { jobs, cause }
                    }
                },
                CycleState::Deliver { jobs, request } => {
                    let outcome = self.delivery.deliver(&request, &jobs).await;
                    CycleState::Aggregate { jobs, outcome }
                }
                CycleState::Fallback { jobs, cause } => {
                    let fallback = match self
                        .delivery
                        .write_fallback(&session.id, session.version_number, &jobs)
                        .await
                    {
                        Ok(receipt) => FallbackStatus::Written(receipt),
                        Err(e) => FallbackStatus::Failed(format!("{} (after: {})", e, cause)),
                    };
                    let report = ProtectionReport::without_results(
                        session.id.as_str(),
                        session.version_number,
                        jobs.len(),
                        DeliveryMode::Fallback,
                        &self.thresholds,
                    )
                    .with_primary_preview(self.primary_preview(&jobs));
                    CycleState::Persist {
                        report,
                        fallback,
                        attempts: 0,
                    }
                }
                CycleState::Aggregate { jobs, outcome } => {
                    let attempts = outcome.attempts();
                    let (mode, results, fallback) = match outcome {
                        DeliveryOutcome::Delivered { mode, results, .. } => {
                            (mode, results, FallbackStatus::NotNeeded)
                        }
                        DeliveryOutcome::FallbackWritten {
                            results, receipt, ..
                        } => (DeliveryMode::Fallback, results, FallbackStatus::Written(receipt)),
                        DeliveryOutcome::FallbackFailed { results, error, .. } => (
                            DeliveryMode::Fallback,
                            results,
                            FallbackStatus::Failed(error.to_string()),
                        ),
                    };
                    let report = results
                        .finish(
                            &session.id,
                            session.version_number,
                            jobs.len(),
                            mode,
                            &self.thresholds,
                        )
                        .unwrap_or_else(|e| {
                            tracing::error!("[ProtectionPipeline] Discarding results: {}", e);
                            ProtectionReport::without_results(
                                session.id.as_str(),
                                session.version_number,
                                jobs.len(),
                                mode,
                                &self.thresholds,
                            )
                        })
                        .with_primary_preview(self.primary_preview(&jobs));
                    CycleState::Persist {
                        report,
                        fallback,
                        attempts,
                    }
                }
                CycleState::Persist {
                    report,
                    fallback,
                    attempts,
                } => {
                    let report = report.with_duration(started.elapsed().as_secs_f64());
                    let persisted = match self.reports.save(&report).await {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!("[ProtectionPipeline] Failed to persist report: {}", e);
                            false
                        }
                    };
                    CycleState::Done(CycleOutcome {
                        report,
                        fallback,
                        attempts,
                        persisted,
                    })
                }
                CycleState::Done(outcome) => {
                    tracing::info!("[ProtectionPipeline] {}", outcome.report.summary());
                    return outcome;
                }
            };
        }
    }

    /// Checks one image for a watermark and reports it as a one-layer result.
    pub async fn verify(&self, image_bytes: &[u8]) -> Result<ProtectionReport> {
        let started = Instant::now();
        let response = self.delivery.verify(image_bytes).await?;
        tracing::info!(
            "[ProtectionPipeline] Verify: detected={}, confidence={:.2}, {}",
            response.detected,
            response.confidence,
            response.message
        );

        let result = if response.detected {
            LayerResult::protected(VERIFY_LAYER_ID, response.confidence, "")
        } else {
            LayerResult::failed(VERIFY_LAYER_ID, response.message)
        };
        let results = BTreeMap::from([(VERIFY_LAYER_ID.to_string(), result)]);

        // A single layer can never reach the Basic minimum, so only Perfect or None.
        Ok(ProtectionReport::new(
            VERIFY_LAYER_ID,
            0,
            1,
            results,
            DeliveryMode::Verify,
            &self.thresholds,
        )?
        .with_duration(started.elapsed().as_secs_f64()))
    }

    fn primary_preview(&self, jobs: &[CaptureJob]) -> Option<String> {
        self.orchestrator
            .scorer()
            .select_primary(jobs)
            .map(|job| job.layer_id())
    }
}
