use crate::pipeline::{CycleOutcome, FallbackStatus, ProtectionPipeline};
use artguard_core::config::SessionConfig;
use artguard_core::error::{ArtguardError, Result};
use artguard_core::protection::ProtectionReport;
use artguard_core::session::{
    CreationSession, MilestonePolicy, ProtectionTrigger, SessionEvent, SessionState,
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of handing a trigger to the manager.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// A cycle ran to completion (possibly ending in a fallback).
    Completed(Box<CycleOutcome>),
    /// The trigger was a no-op in the current state.
    Ignored { reason: String },
}

impl TriggerOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, TriggerOutcome::Ignored { .. })
    }

    pub fn cycle(&self) -> Option<&CycleOutcome> {
        match self {
            TriggerOutcome::Completed(outcome) => Some(outcome),
            TriggerOutcome::Ignored { .. } => None,
        }
    }
}

#[derive(Debug)]
struct ManagerState {
    state: SessionState,
    session: Option<CreationSession>,
    cycles: u32,
    last_report: Option<ProtectionReport>,
    timeout_watch: Option<JoinHandle<()>>,
}

/// Owns the live [`CreationSession`] and drives its lifecycle.
///
/// `ProtectionSessionManager` is responsible for:
/// - Starting and closing sessions
/// - Recording authoring activity on the session
/// - Turning triggers into protection cycles, at most one at a time
/// - Publishing [`SessionEvent`]s to subscribers
///
/// A trigger that arrives while a cycle is running, or while no session is
/// active, is logged and dropped. It is never queued.
pub struct ProtectionSessionManager {
    me: Weak<Self>,
    pipeline: Arc<ProtectionPipeline>,
    config: SessionConfig,
    milestones: MilestonePolicy,
    inner: RwLock<ManagerState>,
    events: broadcast::Sender<SessionEvent>,
}

impl ProtectionSessionManager {
    /// Creates a manager in the `Idle` state.
    ///
    /// The manager is returned shared: the timeout watch started with each
    /// session holds a weak reference to it.
    ///
    /// # Arguments
    ///
    /// * `pipeline` - The pipeline that runs each protection cycle
    /// * `config` - Timeout, watch period and milestone settings
    pub fn new(pipeline: Arc<ProtectionPipeline>, config: SessionConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            pipeline,
            milestones: MilestonePolicy::from_config(&config),
            config,
            inner: RwLock::new(ManagerState {
                state: SessionState::Idle,
                session: None,
                cycles: 0,
                last_report: None,
                timeout_watch: None,
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> SessionState {
        self.inner.read().await.state
    }

    /// Returns a snapshot of the live session, if any.
    pub async fn current_session(&self) -> Option<CreationSession> {
        self.inner.read().await.session.clone()
    }

    pub async fn last_report(&self) -> Option<ProtectionReport> {
        self.inner.read().await.last_report.clone()
    }

    /// Starts a new session, starts its timeout watch and probes the service
    /// for batch support.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the manager is `Idle`.
    pub async fn start_session(&self) -> Result<CreationSession> {
        self.start_session_at(Utc::now()).await
    }

    pub async fn start_session_at(&self, now: DateTime<Utc>) -> Result<CreationSession> {
        let session = {
            let mut inner = self.inner.write().await;
            if inner.state != SessionState::Idle {
                return Err(ArtguardError::invalid_state(format!(
                    "cannot start a session while {:?}",
                    inner.state
                )));
            }
            let session = CreationSession::started_at(now);
            inner.session = Some(session.clone());
            inner.cycles = 0;
            inner.state = SessionState::Active;
            if let Some(previous) = inner.timeout_watch.take() {
                previous.abort();
            }
            inner.timeout_watch = self.spawn_timeout_watch(session.id.clone());
            session
        };

        tracing::info!("[SessionManager] Session {} started", session.id);
        self.publish(SessionEvent::SessionStarted {
            session_id: session.id.clone(),
        });

        self.pipeline.probe_capabilities().await;
        Ok(session)
    }

    /// Records one brush stroke. Returns the new stroke count.
    pub async fn record_stroke(&self) -> Result<u32> {
        self.with_session(|session| {
            session.stroke_count += 1;
            session.stroke_count
        })
        .await
    }

    pub async fn record_tool(&self, tool: impl Into<String>) -> Result<()> {
        let tool = tool.into();
        self.with_session(move |session| {
            session.tools_used.insert(tool);
        })
        .await
    }

    /// Sets the complexity reported by the host's complexity estimator.
    pub async fn set_complexity(&self, complexity: f32) -> Result<()> {
        self.with_session(|session| session.complexity = complexity.max(0.0))
            .await
    }

    /// Marks activity without changing any counter.
    pub async fn touch(&self) -> Result<()> {
        self.with_session(|_| ()).await
    }

    /// Requests a manual protection cycle.
    pub async fn request_protection(&self) -> TriggerOutcome {
        self.trigger(ProtectionTrigger::Manual).await
    }

    /// Protects the final version and closes the session.
    pub async fn end_session(&self) -> TriggerOutcome {
        self.trigger(ProtectionTrigger::ExplicitEnd).await
    }

    /// Evaluates the timeout and, when enabled, the milestone predicates.
    ///
    /// Returns `None` when nothing fired.
    pub async fn tick(&self) -> Option<TriggerOutcome> {
        self.tick_at(Utc::now()).await
    }

    pub async fn tick_at(&self, now: DateTime<Utc>) -> Option<TriggerOutcome> {
        let fired = self.due_trigger(now, self.config.protect_on_milestone).await?;
        Some(self.trigger_at(fired, now).await)
    }

    /// Evaluates the inactivity timeout only.
    pub async fn check_timeout_at(&self, now: DateTime<Utc>) -> Option<TriggerOutcome> {
        let fired = self.due_trigger(now, false).await?;
        Some(self.trigger_at(fired, now).await)
    }

    async fn due_trigger(
        &self,
        now: DateTime<Utc>,
        with_milestones: bool,
    ) -> Option<ProtectionTrigger> {
        let inner = self.inner.read().await;
        let session = match (&inner.state, &inner.session) {
            (SessionState::Active, Some(session)) => session,
            _ => return None,
        };

        if session.idle_for(now) >= self.config.session_timeout() {
            Some(ProtectionTrigger::Timeout)
        } else if with_milestones {
            self.milestones
                .evaluate(session, now)
                .map(|milestone| ProtectionTrigger::Milestone { milestone })
        } else {
            None
        }
    }

    /// Checks the timeout of `session_id` every watch period until that
    /// session is no longer the live one. `None` when the watch is disabled.
    fn spawn_timeout_watch(&self, session_id: String) -> Option<JoinHandle<()>> {
        let period = self.config.timeout_check_interval()?;
        let manager = self.me.clone();

        Some(tokio::spawn(async move {
            let first = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                match manager.current_session().await {
                    Some(session) if session.id == session_id => {}
                    _ => {
                        tracing::debug!(
                            "[SessionManager] Timeout watch for session {} finished",
                            session_id
                        );
                        break;
                    }
                }
                manager.check_timeout_at(Utc::now()).await;
            }
        }))
    }

    /// Handles one trigger.
    pub async fn trigger(&self, trigger: ProtectionTrigger) -> TriggerOutcome {
        self.trigger_at(trigger, Utc::now()).await
    }

    async fn trigger_at(&self, trigger: ProtectionTrigger, now: DateTime<Utc>) -> TriggerOutcome {
        let snapshot = {
            let mut inner = self.inner.write().await;
            let state = inner.state;
            match (state, inner.session.as_mut()) {
                (SessionState::Active, Some(session)) => {
                    session.refresh_duration(now);
                    session.strokes_at_last_cycle = session.stroke_count;
                    session.complexity_at_last_cycle = session.complexity;
                    let snapshot = session.clone();
                    inner.state = SessionState::Processing;
                    snapshot
                }
                (SessionState::Processing, _) => {
                    return self.ignore(trigger, "a protection cycle is already running");
                }
                _ => return self.ignore(trigger, "no active session"),
            }
        };

        tracing::info!(
            "[SessionManager] {} trigger: protecting session {} v{}",
            trigger,
            snapshot.id,
            snapshot.version_number
        );
        self.publish(SessionEvent::ProtectionStarted {
            session_id: snapshot.id.clone(),
            version: snapshot.version_number,
            trigger,
        });

        let outcome = self.pipeline.run(&snapshot).await;
        self.finish_cycle(trigger, &snapshot, &outcome).await;
        TriggerOutcome::Completed(Box::new(outcome))
    }

    async fn finish_cycle(
        &self,
        trigger: ProtectionTrigger,
        snapshot: &CreationSession,
        outcome: &CycleOutcome,
    ) {
        let finished_at = Utc::now();
        let ended_cycles = {
            let mut inner = self.inner.write().await;
            inner.cycles += 1;
            inner.last_report = Some(outcome.report.clone());

            if let Some(session) = inner.session.as_mut() {
                session.version_number += 1;
                session.last_protected_at = Some(finished_at);
            }

            if trigger.is_terminal() {
                if let Some(session) = inner.session.as_mut() {
                    session.closed_at = Some(finished_at);
                    session.refresh_duration(finished_at);
                }
                inner.session = None;
                inner.state = SessionState::Idle;
                Some(inner.cycles)
            } else {
                inner.state = SessionState::Active;
                None
            }
        };

        if let FallbackStatus::Written(receipt) = &outcome.fallback {
            self.publish(SessionEvent::FallbackWritten {
                session_id: snapshot.id.clone(),
                version: snapshot.version_number,
                directory: receipt.directory.clone(),
                files_written: receipt.files_written,
            });
        }

        let report = &outcome.report;
        self.publish(SessionEvent::ProtectionCompleted {
            session_id: snapshot.id.clone(),
            version: snapshot.version_number,
            protected_layers: report.protected_count(),
            total_layers: report.total_layers(),
            tier: report.verification_tier(),
            delivery_mode: report.delivery_mode(),
        });

        if let Some(cycles) = ended_cycles {
            tracing::info!(
                "[SessionManager] Session {} closed after {} cycle(s)",
                snapshot.id,
                cycles
            );
            self.publish(SessionEvent::SessionEnded {
                session_id: snapshot.id.clone(),
                cycles,
            });
        }
    }

    async fn with_session<T>(&self, update: impl FnOnce(&mut CreationSession) -> T) -> Result<T> {
        let mut inner = self.inner.write().await;
        let session = inner
            .session
            .as_mut()
            .ok_or_else(|| ArtguardError::invalid_state("no active session"))?;
        let value = update(session);
        session.last_activity_at = Utc::now();
        Ok(value)
    }

    fn ignore(&self, trigger: ProtectionTrigger, reason: &str) -> TriggerOutcome {
        tracing::warn!("[SessionManager] Ignoring {} trigger: {}", trigger, reason);
        self.publish(SessionEvent::TriggerIgnored {
            trigger,
            reason: reason.to_string(),
        });
        TriggerOutcome::Ignored {
            reason: reason.to_string(),
        }
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}
