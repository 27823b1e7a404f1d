//! Tmux abstraction layer.
//!
//! Provides a trait-based abstraction over tmux operations to enable:
//! - Unit testing without real tmux
//! - Mocking session behavior
//! - Graceful handling when tmux is unavailable
//!
//! The status engine consumes this as its only external collaborator: pane
//! ownership queries on the way in, window renames on the way out.

use std::collections::HashMap;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Errors specific to tmux operations
#[derive(Error, Debug)]
pub enum TmuxError {
    #[error("tmux is not installed or not in PATH")]
    NotInstalled,

    #[error("tmux version {0} is below minimum required version {1}")]
    VersionTooOld(String, String),

    #[error("session '{0}' already exists")]
    SessionExists(String),

    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("failed to create session '{0}': {1}")]
    SessionCreationFailed(String, String),

    #[error("tmux command failed: {0}")]
    CommandFailed(String),
}

/// Version information for tmux
#[derive(Debug, Clone, PartialEq)]
pub struct TmuxVersion {
    pub major: u32,
    pub minor: u32,
    pub raw: String,
}

impl TmuxVersion {
    /// Parse a version string like "tmux 3.4" or "tmux 3.3a"
    pub fn parse(version_str: &str) -> Option<Self> {
        let parts: Vec<&str> = version_str.split_whitespace().collect();
        if parts.len() < 2 {
            return None;
        }

        let numeric_part: String = parts[1]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let mut version_nums = numeric_part.split('.');
        let major: u32 = version_nums.next()?.parse().ok()?;
        let minor: u32 = version_nums.next().unwrap_or("0").parse().unwrap_or(0);

        Some(Self {
            major,
            minor,
            raw: version_str.to_string(),
        })
    }

    /// Check if this version meets the minimum requirement
    pub fn meets_minimum(&self, min_major: u32, min_minor: u32) -> bool {
        self.major > min_major || (self.major == min_major && self.minor >= min_minor)
    }
}

/// Information about a tmux session
#[derive(Debug, Clone)]
pub struct TmuxSession {
    pub name: String,
    pub created: Option<String>,
    pub attached: bool,
}

/// Trait abstracting tmux operations for testability
pub trait TmuxClient: Send + Sync {
    /// Check if tmux is available and return version info
    fn check_available(&self) -> Result<TmuxVersion, TmuxError>;

    /// Check if a session exists
    fn session_exists(&self, name: &str) -> Result<bool, TmuxError>;

    /// Create a new detached session rooted at `working_dir`
    fn create_session(&self, name: &str, working_dir: &str) -> Result<(), TmuxError>;

    /// Kill a session
    fn kill_session(&self, name: &str) -> Result<(), TmuxError>;

    /// List all sessions, optionally filtered by name prefix
    fn list_sessions(&self, prefix: Option<&str>) -> Result<Vec<TmuxSession>, TmuxError>;

    /// Attach the current terminal to a session (blocks until detach)
    fn attach_session(&self, session: &str) -> Result<(), TmuxError>;

    /// Capture the visible pane content of a session
    fn capture_pane(&self, session: &str) -> Result<String, TmuxError>;

    /// Resolve the session owning a pane. `Ok(None)` when the pane is gone
    /// or not tmux-managed; callers treat that as "outside a tracked session".
    fn pane_session_name(&self, pane_id: &str) -> Result<Option<String>, TmuxError>;

    /// Rename the current window of the target session
    fn rename_window(&self, session: &str, name: &str) -> Result<(), TmuxError>;
}

/// Real implementation using system tmux
pub struct SystemTmuxClient;

impl SystemTmuxClient {
    pub fn new() -> Self {
        Self
    }

    fn run_tmux(&self, args: &[&str]) -> Result<Output, TmuxError> {
        Command::new("tmux").args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TmuxError::NotInstalled
            } else {
                TmuxError::CommandFailed(e.to_string())
            }
        })
    }
}

impl Default for SystemTmuxClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TmuxClient for SystemTmuxClient {
    fn check_available(&self) -> Result<TmuxVersion, TmuxError> {
        let output = self.run_tmux(&["-V"])?;

        if !output.status.success() {
            return Err(TmuxError::NotInstalled);
        }

        let version_str = String::from_utf8_lossy(&output.stdout);
        TmuxVersion::parse(version_str.trim()).ok_or_else(|| {
            TmuxError::CommandFailed(format!("could not parse version: {}", version_str))
        })
    }

    fn session_exists(&self, name: &str) -> Result<bool, TmuxError> {
        // Exact match with -t=
        let output = self.run_tmux(&["has-session", "-t", &format!("={}", name)]);

        match output {
            Ok(out) => Ok(out.status.success()),
            Err(TmuxError::NotInstalled) => Err(TmuxError::NotInstalled),
            Err(_) => Ok(false), // Server not running means no session
        }
    }

    fn create_session(&self, name: &str, working_dir: &str) -> Result<(), TmuxError> {
        if self.session_exists(name)? {
            return Err(TmuxError::SessionExists(name.to_string()));
        }

        let output = self.run_tmux(&["new-session", "-d", "-s", name, "-c", working_dir])?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TmuxError::SessionCreationFailed(
                name.to_string(),
                stderr.to_string(),
            ));
        }

        Ok(())
    }

    fn kill_session(&self, name: &str) -> Result<(), TmuxError> {
        let output = self.run_tmux(&["kill-session", "-t", name])?;

        if !output.status.success() {
            return Err(TmuxError::SessionNotFound(name.to_string()));
        }

        Ok(())
    }

    fn list_sessions(&self, prefix: Option<&str>) -> Result<Vec<TmuxSession>, TmuxError> {
        let output = self.run_tmux(&[
            "list-sessions",
            "-F",
            "#{session_name}\t#{session_created}\t#{session_attached}",
        ]);

        match output {
            Ok(out) if out.status.success() => {
                let stdout = String::from_utf8_lossy(&out.stdout);
                let sessions = stdout
                    .lines()
                    .filter_map(|line| {
                        let parts: Vec<&str> = line.split('\t').collect();
                        let name = (*parts.first()?).to_string();

                        if let Some(p) = prefix {
                            if !name.starts_with(p) {
                                return None;
                            }
                        }

                        Some(TmuxSession {
                            name,
                            created: parts.get(1).map(|s| (*s).to_string()),
                            attached: parts.get(2).map(|s| *s == "1").unwrap_or(false),
                        })
                    })
                    .collect();

                Ok(sessions)
            }
            Ok(_) => Ok(Vec::new()), // No sessions or server not running
            Err(TmuxError::NotInstalled) => Err(TmuxError::NotInstalled),
            Err(_) => Ok(Vec::new()),
        }
    }

    fn attach_session(&self, session: &str) -> Result<(), TmuxError> {
        // status() instead of output() so the user interacts with the
        // session directly; the caller owns terminal state around this.
        let status = Command::new("tmux")
            .args(["attach-session", "-t", session])
            .status()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TmuxError::NotInstalled
                } else {
                    TmuxError::CommandFailed(e.to_string())
                }
            })?;

        if !status.success() {
            return Err(TmuxError::CommandFailed(format!(
                "tmux attach failed with exit code: {:?}",
                status.code()
            )));
        }

        Ok(())
    }

    fn capture_pane(&self, session: &str) -> Result<String, TmuxError> {
        let output = self.run_tmux(&["capture-pane", "-p", "-t", session])?;

        if !output.status.success() {
            return Err(TmuxError::SessionNotFound(session.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn pane_session_name(&self, pane_id: &str) -> Result<Option<String>, TmuxError> {
        let output = match self.run_tmux(&[
            "display-message",
            "-p",
            "-t",
            pane_id,
            "#{session_name}",
        ]) {
            Ok(out) => out,
            Err(TmuxError::NotInstalled) => return Err(TmuxError::NotInstalled),
            Err(_) => return Ok(None),
        };

        if !output.status.success() {
            return Ok(None);
        }

        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if name.is_empty() {
            Ok(None)
        } else {
            Ok(Some(name))
        }
    }

    fn rename_window(&self, session: &str, name: &str) -> Result<(), TmuxError> {
        let output = self.run_tmux(&["rename-window", "-t", session, name])?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TmuxError::CommandFailed(format!(
                "failed to rename window on {}: {}",
                session,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Mock implementation for testing
#[derive(Default)]
pub struct MockTmuxClient {
    /// Simulated sessions: name -> session data
    sessions: Arc<Mutex<HashMap<String, MockSession>>>,
    /// Pane ownership: pane id -> session name
    panes: Arc<Mutex<HashMap<String, String>>>,
    /// Record of window renames as (session, new_name)
    pub renames: Arc<Mutex<Vec<(String, String)>>>,
    /// Whether tmux is "installed"
    pub installed: Arc<Mutex<bool>>,
}

#[derive(Debug, Clone)]
pub struct MockSession {
    pub working_dir: String,
    pub content: String,
    pub attached: bool,
    pub window_name: String,
}

impl MockTmuxClient {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            panes: Arc::new(Mutex::new(HashMap::new())),
            renames: Arc::new(Mutex::new(Vec::new())),
            installed: Arc::new(Mutex::new(true)),
        }
    }

    /// Create a mock that simulates tmux not being installed
    pub fn not_installed() -> Self {
        let mock = Self::new();
        *mock.installed.lock().unwrap() = false;
        mock
    }

    /// Add a pre-existing session
    pub fn add_session(&self, name: &str, working_dir: &str) {
        self.sessions.lock().unwrap().insert(
            name.to_string(),
            MockSession {
                working_dir: working_dir.to_string(),
                content: String::new(),
                attached: false,
                window_name: String::new(),
            },
        );
    }

    /// Map a pane id to an owning session
    pub fn add_pane(&self, pane_id: &str, session: &str) {
        self.panes
            .lock()
            .unwrap()
            .insert(pane_id.to_string(), session.to_string());
    }

    /// Set pane content for a session (simulates agent output)
    pub fn set_session_content(&self, name: &str, content: &str) {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(name) {
            session.content = content.to_string();
        }
    }

    /// Current window name of a session (for test assertions)
    pub fn window_name(&self, name: &str) -> Option<String> {
        self.sessions
            .lock()
            .unwrap()
            .get(name)
            .map(|s| s.window_name.clone())
    }

    /// All recorded renames (for test assertions)
    pub fn rename_log(&self) -> Vec<(String, String)> {
        self.renames.lock().unwrap().clone()
    }

    fn check_installed(&self) -> Result<(), TmuxError> {
        if *self.installed.lock().unwrap() {
            Ok(())
        } else {
            Err(TmuxError::NotInstalled)
        }
    }
}

impl TmuxClient for MockTmuxClient {
    fn check_available(&self) -> Result<TmuxVersion, TmuxError> {
        self.check_installed()?;
        Ok(TmuxVersion {
            major: 3,
            minor: 4,
            raw: "tmux 3.4".to_string(),
        })
    }

    fn session_exists(&self, name: &str) -> Result<bool, TmuxError> {
        self.check_installed()?;
        Ok(self.sessions.lock().unwrap().contains_key(name))
    }

    fn create_session(&self, name: &str, working_dir: &str) -> Result<(), TmuxError> {
        self.check_installed()?;
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(name) {
            return Err(TmuxError::SessionExists(name.to_string()));
        }
        sessions.insert(
            name.to_string(),
            MockSession {
                working_dir: working_dir.to_string(),
                content: String::new(),
                attached: false,
                window_name: String::new(),
            },
        );
        Ok(())
    }

    fn kill_session(&self, name: &str) -> Result<(), TmuxError> {
        self.check_installed()?;
        if self.sessions.lock().unwrap().remove(name).is_none() {
            return Err(TmuxError::SessionNotFound(name.to_string()));
        }
        self.panes.lock().unwrap().retain(|_, s| s.as_str() != name);
        Ok(())
    }

    fn list_sessions(&self, prefix: Option<&str>) -> Result<Vec<TmuxSession>, TmuxError> {
        self.check_installed()?;
        let sessions = self.sessions.lock().unwrap();
        let mut list: Vec<TmuxSession> = sessions
            .iter()
            .filter(|(name, _)| prefix.map_or(true, |p| name.starts_with(p)))
            .map(|(name, s)| TmuxSession {
                name: name.clone(),
                created: None,
                attached: s.attached,
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    fn attach_session(&self, session: &str) -> Result<(), TmuxError> {
        self.check_installed()?;
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(session) {
            Some(s) => {
                s.attached = true;
                Ok(())
            }
            None => Err(TmuxError::SessionNotFound(session.to_string())),
        }
    }

    fn capture_pane(&self, session: &str) -> Result<String, TmuxError> {
        self.check_installed()?;
        self.sessions
            .lock()
            .unwrap()
            .get(session)
            .map(|s| s.content.clone())
            .ok_or_else(|| TmuxError::SessionNotFound(session.to_string()))
    }

    fn pane_session_name(&self, pane_id: &str) -> Result<Option<String>, TmuxError> {
        self.check_installed()?;
        Ok(self.panes.lock().unwrap().get(pane_id).cloned())
    }

    fn rename_window(&self, session: &str, name: &str) -> Result<(), TmuxError> {
        self.check_installed()?;
        let mut sessions = self.sessions.lock().unwrap();
        let entry = sessions
            .get_mut(session)
            .ok_or_else(|| TmuxError::SessionNotFound(session.to_string()))?;
        entry.window_name = name.to_string();
        self.renames
            .lock()
            .unwrap()
            .push((session.to_string(), name.to_string()));
        Ok(())
    }
}
