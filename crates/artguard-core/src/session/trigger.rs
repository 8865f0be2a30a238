//! Lifecycle states, protection triggers and milestone predicates.

use super::model::CreationSession;
use crate::config::SessionConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session manager state: `Idle -> Active -> Processing -> Idle | Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Active,
    Processing,
}

/// Which milestone predicate fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    StrokeInterval,
    Complexity,
    Elapsed,
}

/// Why a protection cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtectionTrigger {
    Manual,
    Milestone { milestone: MilestoneKind },
    Timeout,
    ExplicitEnd,
}

impl ProtectionTrigger {
    /// Terminal triggers close the session once their cycle finishes.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProtectionTrigger::Timeout | ProtectionTrigger::ExplicitEnd)
    }
}

impl fmt::Display for ProtectionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectionTrigger::Manual => f.write_str("manual"),
            ProtectionTrigger::Milestone { milestone } => write!(f, "milestone:{:?}", milestone),
            ProtectionTrigger::Timeout => f.write_str("timeout"),
            ProtectionTrigger::ExplicitEnd => f.write_str("end"),
        }
    }
}

/// Milestone predicates evaluated while a session is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MilestonePolicy {
    pub stroke_interval: u32,
    pub complexity_threshold: f32,
    pub min_elapsed: chrono::Duration,
}

impl MilestonePolicy {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            stroke_interval: config.milestone_stroke_interval,
            complexity_threshold: config.milestone_complexity_threshold,
            min_elapsed: chrono::Duration::seconds(config.milestone_min_elapsed_secs as i64),
        }
    }

    /// Returns the first milestone reached since the previous cycle, if any.
    ///
    /// Each predicate compares against the state recorded when the last cycle
    /// started, so a milestone fires once rather than on every tick.
    pub fn evaluate(&self, session: &CreationSession, now: DateTime<Utc>) -> Option<MilestoneKind> {
        if self.stroke_interval > 0
            && session.stroke_count > 0
            && session.stroke_count % self.stroke_interval == 0
            && session.stroke_count != session.strokes_at_last_cycle
        {
            return Some(MilestoneKind::StrokeInterval);
        }

        if session.complexity >= self.complexity_threshold
            && session.complexity_at_last_cycle < self.complexity_threshold
        {
            return Some(MilestoneKind::Complexity);
        }

        if session.since_last_protection(now) >= self.min_elapsed {
            return Some(MilestoneKind::Elapsed);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> MilestonePolicy {
        MilestonePolicy {
            stroke_interval: 50,
            complexity_threshold: 100.0,
            min_elapsed: chrono::Duration::seconds(300),
        }
    }

    #[test]
    fn test_stroke_milestone_fires_once_per_multiple() {
        let now = Utc::now();
        let mut session = CreationSession::started_at(now);

        session.stroke_count = 49;
        assert_eq!(policy().evaluate(&session, now), None);

        session.stroke_count = 50;
        assert_eq!(policy().evaluate(&session, now), Some(MilestoneKind::StrokeInterval));

        session.strokes_at_last_cycle = 50;
        assert_eq!(policy().evaluate(&session, now), None);
    }

    #[test]
    fn test_complexity_milestone_needs_crossing() {
        let now = Utc::now();
        let mut session = CreationSession::started_at(now);
        session.complexity = 120.0;
        assert_eq!(policy().evaluate(&session, now), Some(MilestoneKind::Complexity));

        session.complexity_at_last_cycle = 110.0;
        assert_eq!(policy().evaluate(&session, now), None);
    }

    #[test]
    fn test_elapsed_milestone_counts_from_last_cycle() {
        let start = Utc::now();
        let mut session = CreationSession::started_at(start);
        let later = start + chrono::Duration::seconds(301);
        assert_eq!(policy().evaluate(&session, later), Some(MilestoneKind::Elapsed));

        session.last_protected_at = Some(start + chrono::Duration::seconds(200));
        assert_eq!(policy().evaluate(&session, later), None);
    }

    #[test]
    fn test_terminal_triggers() {
        assert!(ProtectionTrigger::Timeout.is_terminal());
        assert!(ProtectionTrigger::ExplicitEnd.is_terminal());
        assert!(!ProtectionTrigger::Manual.is_terminal());
    }
}
