//! Session-level state aggregation.
//!
//! The aggregate is always derived from a full scan of the session's
//! per-agent record files, never from the previous aggregate, so concurrent
//! recomputations are commutative: whichever write lands last reflects a
//! valid snapshot, and the next event retriggers a correct recompute.

use chrono::Utc;
use tracing::{debug, warn};

use super::store::{StateStore, StoreError};
use super::{SessionState, StateRecord};

/// Recompute and persist the session-level state from all fresh per-agent
/// records. Stale records (older than `stale_after_secs`) are deleted as a
/// side effect and excluded. With zero fresh agents the aggregate file is
/// removed and the result is [`SessionState::Stopped`].
///
/// Idempotent and safe to call concurrently for the same session: each call
/// independently rederives the aggregate, last writer wins.
pub fn recompute_session(
    store: &StateStore,
    session: &str,
    stale_after_secs: i64,
) -> Result<SessionState, StoreError> {
    let now = Utc::now();
    let mut fresh: Vec<StateRecord> = Vec::new();

    for path in store.agent_files(session)? {
        let record = match StateStore::read_path(&path) {
            Ok(record) => record,
            // Deleted by a concurrent recompute between scan and read
            Err(StoreError::NotFound) => continue,
            // Fail open: one unreadable record must not wedge the session
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable agent record");
                continue;
            }
        };

        if record.is_stale(now, stale_after_secs) {
            debug!(
                path = %path.display(),
                updated_at = %record.updated_at,
                "evicting stale agent record"
            );
            if let Err(e) = StateStore::remove_path(&path) {
                warn!(path = %path.display(), error = %e, "failed to evict stale record");
            }
            continue;
        }

        fresh.push(record);
    }

    if fresh.is_empty() {
        store.remove(session, None)?;
        return Ok(SessionState::Stopped);
    }

    let winner = fresh
        .iter()
        .map(|r| r.state)
        .max_by_key(|s| s.priority())
        .unwrap_or(SessionState::Unknown);

    store.write(session, None, &StateRecord::new(winner, None))?;
    Ok(winner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    const STALE_AFTER: i64 = 600;

    fn write_agent(store: &StateStore, session: &str, agent: &str, state: SessionState) {
        store
            .write(
                session,
                Some(agent),
                &StateRecord::new(state, Some(agent.to_string())),
            )
            .unwrap();
    }

    #[test]
    fn test_no_agents_aggregates_to_stopped_without_file() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());

        let state = recompute_session(&store, "empty", STALE_AFTER).unwrap();
        assert_eq!(state, SessionState::Stopped);
        // Verified via absence: a "stopped" file would read as a live session
        assert!(!store.session_path("empty").exists());
    }

    #[test]
    fn test_highest_priority_state_wins() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());

        write_agent(&store, "repo", "a1", SessionState::Idle);
        write_agent(&store, "repo", "a2", SessionState::Running);
        write_agent(&store, "repo", "a3", SessionState::WaitingForInput);

        let state = recompute_session(&store, "repo", STALE_AFTER).unwrap();
        assert_eq!(state, SessionState::WaitingForInput);

        let aggregate = store.read("repo", None).unwrap();
        assert_eq!(aggregate.state, SessionState::WaitingForInput);
        assert!(aggregate.session_id.is_none());
    }

    #[test]
    fn test_error_outranks_running() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());

        write_agent(&store, "repo", "a1", SessionState::Error);
        write_agent(&store, "repo", "a2", SessionState::Running);

        assert_eq!(
            recompute_session(&store, "repo", STALE_AFTER).unwrap(),
            SessionState::Error
        );
    }

    #[test]
    fn test_stale_records_evicted_and_excluded() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());

        write_agent(&store, "repo", "live", SessionState::Idle);

        let mut old = StateRecord::new(SessionState::Running, Some("dead".to_string()));
        old.updated_at = Utc::now() - Duration::seconds(STALE_AFTER + 60);
        store.write("repo", Some("dead"), &old).unwrap();

        let state = recompute_session(&store, "repo", STALE_AFTER).unwrap();
        // The stale Running agent must not outrank the fresh Idle one
        assert_eq!(state, SessionState::Idle);
        assert!(!store.agent_path("repo", "dead").exists());
    }

    #[test]
    fn test_only_stale_records_means_stopped_and_no_aggregate() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());

        let mut old = StateRecord::new(SessionState::Running, Some("a1".to_string()));
        old.updated_at = Utc::now() - Duration::seconds(STALE_AFTER * 2);
        store.write("repo", Some("a1"), &old).unwrap();
        // Leftover aggregate from when the agent was alive
        store
            .write("repo", None, &StateRecord::new(SessionState::Running, None))
            .unwrap();

        let state = recompute_session(&store, "repo", STALE_AFTER).unwrap();
        assert_eq!(state, SessionState::Stopped);
        assert!(!store.session_path("repo").exists());
        assert!(!store.agent_path("repo", "a1").exists());
    }

    #[test]
    fn test_corrupt_agent_record_is_skipped() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());

        write_agent(&store, "repo", "good", SessionState::Running);
        std::fs::write(store.agent_path("repo", "bad"), "{garbage").unwrap();

        let state = recompute_session(&store, "repo", STALE_AFTER).unwrap();
        assert_eq!(state, SessionState::Running);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());

        write_agent(&store, "repo", "a1", SessionState::Running);

        let first = recompute_session(&store, "repo", STALE_AFTER).unwrap();
        let second = recompute_session(&store, "repo", STALE_AFTER).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_does_not_mix_sessions() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path());

        write_agent(&store, "alpha", "a1", SessionState::Error);
        write_agent(&store, "beta", "b1", SessionState::Idle);

        assert_eq!(
            recompute_session(&store, "beta", STALE_AFTER).unwrap(),
            SessionState::Idle
        );
    }
}
