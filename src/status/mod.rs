//! Event-driven session status engine.
//!
//! Agents running inside a work session report lifecycle events (via
//! `roster hook`); the engine persists one small record per agent, combines
//! them into a session-level state, and decorates the session's tmux window
//! so the status line shows which sessions need attention.
//!
//! All coordination happens through the filesystem: every record lives in its
//! own file and is only ever replaced wholesale, so any number of concurrent
//! hook invocations can read and write without locks.

pub mod aggregate;
pub mod event;
pub mod handler;
pub mod sanitize;
pub mod store;

pub use aggregate::recompute_session;
pub use event::{map_event, HookEvent};
pub use handler::{handle_event, HookContext};
pub use store::{StateStore, StoreError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a session or of a single agent within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Assistant initialized or finished a turn, awaiting new work
    Idle,
    /// Actively processing a turn or invoking a tool
    Running,
    /// Blocked on a user decision (permission or elicitation prompt)
    WaitingForInput,
    /// Session or agent terminated
    Stopped,
    /// Encountered an unrecoverable condition
    Error,
    /// Event type not recognized; no assumption made
    #[default]
    Unknown,
}

impl SessionState {
    /// Aggregation rank, low to high. States demanding human attention win;
    /// `Stopped` and `Unknown` carry no actionable signal and rank lowest.
    pub fn priority(self) -> u8 {
        match self {
            SessionState::Unknown => 0,
            SessionState::Stopped => 1,
            SessionState::Idle => 2,
            SessionState::Running => 3,
            SessionState::WaitingForInput => 4,
            SessionState::Error => 5,
        }
    }

    /// Emoji prefix shown in the tmux window name.
    pub fn indicator(self) -> &'static str {
        match self {
            SessionState::Running => "🟢",
            SessionState::WaitingForInput => "❓",
            SessionState::Idle => "💬",
            SessionState::Stopped => "⚫",
            SessionState::Error => "⚠️",
            SessionState::Unknown => "❓",
        }
    }

    /// Stable lowercase name, matching the on-disk serialization.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::WaitingForInput => "waiting_for_input",
            SessionState::Stopped => "stopped",
            SessionState::Error => "error",
            SessionState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted unit of truth: the state of one entity (a session aggregate or
/// one of its agents) at `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: SessionState,
    pub updated_at: DateTime<Utc>,
    /// Opaque per-agent identifier; absent on the session-level aggregate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl StateRecord {
    pub fn new(state: SessionState, session_id: Option<String>) -> Self {
        Self {
            state,
            updated_at: Utc::now(),
            session_id,
        }
    }

    /// Whether this record is older than `threshold_secs`.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold_secs: i64) -> bool {
        now.signed_duration_since(self.updated_at).num_seconds() > threshold_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_priority_ordering() {
        let order = [
            SessionState::Unknown,
            SessionState::Stopped,
            SessionState::Idle,
            SessionState::Running,
            SessionState::WaitingForInput,
            SessionState::Error,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].priority() < pair[1].priority());
        }
    }

    #[test]
    fn test_indicator_total_over_enum() {
        // Every state must render something; the status line never shows a blank
        for state in [
            SessionState::Idle,
            SessionState::Running,
            SessionState::WaitingForInput,
            SessionState::Stopped,
            SessionState::Error,
            SessionState::Unknown,
        ] {
            assert!(!state.indicator().is_empty());
        }
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&SessionState::WaitingForInput).unwrap();
        assert_eq!(json, "\"waiting_for_input\"");

        let back: SessionState = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(back, SessionState::Running);
    }

    #[test]
    fn test_record_staleness() {
        let now = Utc::now();
        let mut record = StateRecord::new(SessionState::Running, Some("a1".to_string()));

        record.updated_at = now - Duration::seconds(30);
        assert!(!record.is_stale(now, 60));

        record.updated_at = now - Duration::seconds(120);
        assert!(record.is_stale(now, 60));
    }

    #[test]
    fn test_record_omits_absent_agent_id() {
        let record = StateRecord::new(SessionState::Idle, None);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("session_id"));
    }
}
