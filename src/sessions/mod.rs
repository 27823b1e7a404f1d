//! Work-session management: one tmux session per repository checkout.
//!
//! Creation clones the repository when no local checkout exists, then starts
//! a detached tmux session rooted at it. Creation is serialized by an
//! exclusive file lock so two concurrent invocations cannot race a duplicate
//! clone; the status engine itself needs no such lock (per-entity files are
//! independently addressed).

pub mod git;

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use fs2::FileExt;
use tracing::{debug, warn};

use crate::config::Config;
use crate::discovery::Repo;
use crate::heuristics;
use crate::status::{recompute_session, SessionState, StateStore, StoreError};
use crate::tmux::{TmuxClient, TmuxError};

/// One work session as shown by `roster ls`.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub name: String,
    pub state: SessionState,
    pub attached: bool,
    /// False when the state came from pane-content heuristics instead of
    /// event-driven records.
    pub event_driven: bool,
}

/// Manager for the repository-backed tmux sessions.
pub struct SessionManager<'a> {
    config: &'a Config,
    tmux: &'a dyn TmuxClient,
    store: StateStore,
}

impl<'a> SessionManager<'a> {
    pub fn new(config: &'a Config, tmux: &'a dyn TmuxClient) -> Self {
        let store = StateStore::new(config.status_path());
        Self {
            config,
            tmux,
            store,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Tmux-safe session name for a repository. tmux rejects `.` and `:` in
    /// session names.
    pub fn session_name_for(repo_name: &str) -> String {
        repo_name.replace(['.', ':'], "-")
    }

    /// Create (or reuse) the work session for `repo`, cloning if needed.
    /// Returns the session name.
    pub fn create(&self, repo: &Repo) -> Result<String> {
        let name = Self::session_name_for(&repo.name);
        let _lock = CreateLock::acquire(self.config.create_lock_path())?;

        if self.tmux.session_exists(&name)? {
            debug!(session = %name, "session already exists; reusing");
            return Ok(name);
        }

        let checkout = match &repo.path {
            Some(path) => path.clone(),
            None => {
                let dest = self.config.clones_path().join(&repo.name);
                if !git::is_git_repo(&dest) {
                    let url = repo
                        .clone_url
                        .as_deref()
                        .ok_or_else(|| anyhow!("no checkout or clone URL for '{}'", repo.name))?;
                    git::clone(url, &dest)
                        .with_context(|| format!("cloning '{}'", repo.name))?;
                }
                dest
            }
        };

        self.tmux
            .create_session(&name, &checkout.to_string_lossy())
            .with_context(|| format!("creating tmux session '{name}'"))?;

        // Start with the undecorated label; hook events decorate it
        if let Err(e) = self
            .tmux
            .rename_window(&name, &self.config.status.window_label)
        {
            warn!(session = %name, error = %e, "could not set initial window label");
        }

        Ok(name)
    }

    /// Current state of one session. Event-driven records win; pane-content
    /// heuristics fill in for sessions with no records. Unknown sessions are
    /// an error.
    pub fn status(&self, session: &str) -> Result<SessionState> {
        let state = recompute_session(&self.store, session, self.config.status.stale_after_secs)?;
        if state != SessionState::Stopped {
            return Ok(state);
        }

        // No fresh records; fall back to looking at the pane
        if self.tmux.session_exists(session)? {
            let content = self.tmux.capture_pane(session)?;
            Ok(heuristics::infer_state(&content))
        } else if self.store.tracked_sessions()?.iter().any(|s| s == session) {
            Ok(SessionState::Stopped)
        } else {
            bail!("unknown session '{session}'")
        }
    }

    /// All live tmux sessions with their states.
    pub fn list(&self) -> Result<Vec<SessionInfo>> {
        let mut infos = Vec::new();

        for session in self.tmux.list_sessions(None)? {
            let state =
                recompute_session(&self.store, &session.name, self.config.status.stale_after_secs)?;
            let (state, event_driven) = if state == SessionState::Stopped {
                let inferred = self
                    .tmux
                    .capture_pane(&session.name)
                    .map(|content| heuristics::infer_state(&content))
                    .unwrap_or(SessionState::Unknown);
                (inferred, false)
            } else {
                (state, true)
            };

            infos.push(SessionInfo {
                name: session.name,
                state,
                attached: session.attached,
                event_driven,
            });
        }

        Ok(infos)
    }

    /// Attach the terminal to a session.
    pub fn attach(&self, session: &str) -> Result<()> {
        self.tmux
            .attach_session(session)
            .with_context(|| format!("attaching to '{session}'"))
    }

    /// Kill a session and tear down all of its state records.
    pub fn kill(&self, session: &str) -> Result<()> {
        match self.tmux.kill_session(session) {
            Ok(()) => {}
            // Still clean up records for a session whose tmux side is gone
            Err(TmuxError::SessionNotFound(_)) => {
                debug!(session = %session, "tmux session already gone");
            }
            Err(e) => return Err(e.into()),
        }

        for path in self.store.agent_files(session)? {
            if let Err(e) = StateStore::remove_path(&path) {
                warn!(path = %path.display(), error = %e, "could not remove agent record");
            }
        }
        match self.store.remove(session, None) {
            Ok(()) | Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Exclusive lock held for the duration of a session creation.
struct CreateLock {
    file: File,
}

impl CreateLock {
    fn acquire(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)
            .with_context(|| format!("opening lock file {}", path.display()))?;
        file.lock_exclusive()
            .context("waiting for session-creation lock")?;
        Ok(Self { file })
    }
}

impl Drop for CreateLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StateRecord;
    use crate::tmux::MockTmuxClient;
    use tempfile::TempDir;

    fn test_config(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.status = temp.path().join("status").to_string_lossy().to_string();
        config.paths.clones = temp.path().join("clones").to_string_lossy().to_string();
        config
    }

    fn local_repo(temp: &TempDir, name: &str) -> Repo {
        let path = temp.path().join(name);
        std::fs::create_dir_all(path.join(".git")).unwrap();
        Repo {
            name: name.to_string(),
            path: Some(path),
            clone_url: None,
        }
    }

    #[test]
    fn test_session_name_is_tmux_safe() {
        assert_eq!(SessionManager::session_name_for("my.repo"), "my-repo");
        assert_eq!(SessionManager::session_name_for("a:b"), "a-b");
        assert_eq!(SessionManager::session_name_for("plain"), "plain");
    }

    #[test]
    fn test_create_starts_detached_session_with_plain_label() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let tmux = MockTmuxClient::new();
        let manager = SessionManager::new(&config, &tmux);

        let repo = local_repo(&temp, "myrepo");
        let name = manager.create(&repo).unwrap();

        assert_eq!(name, "myrepo");
        assert!(tmux.session_exists("myrepo").unwrap());
        assert_eq!(tmux.window_name("myrepo").as_deref(), Some("claude"));
    }

    #[test]
    fn test_create_reuses_existing_session() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let tmux = MockTmuxClient::new();
        let manager = SessionManager::new(&config, &tmux);

        let repo = local_repo(&temp, "myrepo");
        manager.create(&repo).unwrap();
        let renames = tmux.rename_log().len();

        // Second create is a no-op reuse, not an error
        manager.create(&repo).unwrap();
        assert_eq!(tmux.rename_log().len(), renames);
    }

    #[test]
    fn test_create_without_source_fails() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let tmux = MockTmuxClient::new();
        let manager = SessionManager::new(&config, &tmux);

        let repo = Repo {
            name: "ghost".to_string(),
            path: None,
            clone_url: None,
        };
        assert!(manager.create(&repo).is_err());
    }

    #[test]
    fn test_status_prefers_event_driven_record() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let tmux = MockTmuxClient::new();
        tmux.add_session("myrepo", "/tmp/myrepo");
        tmux.set_session_content("myrepo", "$ ");
        let manager = SessionManager::new(&config, &tmux);

        manager
            .store()
            .write(
                "myrepo",
                Some("a1"),
                &StateRecord::new(SessionState::Running, Some("a1".to_string())),
            )
            .unwrap();

        // The idle-looking pane must not override the Running record
        assert_eq!(manager.status("myrepo").unwrap(), SessionState::Running);
    }

    #[test]
    fn test_status_falls_back_to_heuristics() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let tmux = MockTmuxClient::new();
        tmux.add_session("myrepo", "/tmp/myrepo");
        tmux.set_session_content("myrepo", "Do you want to continue? [y/n]");
        let manager = SessionManager::new(&config, &tmux);

        assert_eq!(
            manager.status("myrepo").unwrap(),
            SessionState::WaitingForInput
        );
    }

    #[test]
    fn test_status_unknown_session_is_error() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let tmux = MockTmuxClient::new();
        let manager = SessionManager::new(&config, &tmux);

        assert!(manager.status("nope").is_err());
    }

    #[test]
    fn test_kill_removes_state_records() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let tmux = MockTmuxClient::new();
        tmux.add_session("myrepo", "/tmp/myrepo");
        let manager = SessionManager::new(&config, &tmux);

        let store = manager.store();
        store
            .write(
                "myrepo",
                Some("a1"),
                &StateRecord::new(SessionState::Running, Some("a1".to_string())),
            )
            .unwrap();
        store
            .write("myrepo", None, &StateRecord::new(SessionState::Running, None))
            .unwrap();

        manager.kill("myrepo").unwrap();
        assert!(!tmux.session_exists("myrepo").unwrap());
        assert!(store.agent_files("myrepo").unwrap().is_empty());
        assert!(matches!(
            store.read("myrepo", None),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_kill_cleans_records_when_tmux_side_gone() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let tmux = MockTmuxClient::new();
        let manager = SessionManager::new(&config, &tmux);

        manager
            .store()
            .write(
                "dead",
                Some("a1"),
                &StateRecord::new(SessionState::Idle, Some("a1".to_string())),
            )
            .unwrap();

        manager.kill("dead").unwrap();
        assert!(manager.store().agent_files("dead").unwrap().is_empty());
    }

    #[test]
    fn test_list_merges_records_and_heuristics() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let tmux = MockTmuxClient::new();
        tmux.add_session("tracked", "/a");
        tmux.add_session("untracked", "/b");
        tmux.set_session_content("untracked", "⠋ Working");
        let manager = SessionManager::new(&config, &tmux);

        manager
            .store()
            .write(
                "tracked",
                Some("a1"),
                &StateRecord::new(SessionState::WaitingForInput, Some("a1".to_string())),
            )
            .unwrap();

        let infos = manager.list().unwrap();
        assert_eq!(infos.len(), 2);

        let tracked = infos.iter().find(|i| i.name == "tracked").unwrap();
        assert_eq!(tracked.state, SessionState::WaitingForInput);
        assert!(tracked.event_driven);

        let untracked = infos.iter().find(|i| i.name == "untracked").unwrap();
        assert_eq!(untracked.state, SessionState::Running);
        assert!(!untracked.event_driven);
    }
}
