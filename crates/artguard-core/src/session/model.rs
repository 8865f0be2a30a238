use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// One authoring session, from start to explicit end or timeout.
///
/// Only the session manager mutates a live session; everyone else sees clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
    /// Version the next protection cycle will protect; starts at 1
    pub version_number: u32,
    pub complexity: f32,
    pub duration_seconds: f64,
    pub tools_used: BTreeSet<String>,
    pub stroke_count: u32,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default)]
    pub last_protected_at: Option<DateTime<Utc>>,
    /// Stroke count when the last cycle started
    #[serde(default)]
    pub strokes_at_last_cycle: u32,
    /// Complexity when the last cycle started
    #[serde(default)]
    pub complexity_at_last_cycle: f32,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl CreationSession {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: now,
            version_number: 1,
            complexity: 0.0,
            duration_seconds: 0.0,
            tools_used: BTreeSet::new(),
            stroke_count: 0,
            last_activity_at: now,
            last_protected_at: None,
            strokes_at_last_cycle: 0,
            complexity_at_last_cycle: 0.0,
            closed_at: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity_at
    }

    /// Time since the last completed cycle, or since the start if none ran yet.
    pub fn since_last_protection(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_protected_at.unwrap_or(self.started_at)
    }

    pub fn refresh_duration(&mut self, now: DateTime<Utc>) {
        self.duration_seconds = ((now - self.started_at).num_milliseconds().max(0) as f64) / 1000.0;
    }
}

impl Default for CreationSession {
    fn default() -> Self {
        Self::new()
    }
}
