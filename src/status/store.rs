//! Atomic per-entity state record files.
//!
//! Every tracked entity (a session aggregate, or one agent within a session)
//! owns exactly one file in the status directory. Records are replaced
//! wholesale via write-to-temp + rename, so a concurrent reader either sees
//! the previous complete record or the new one, never a partial write.
//! Absence of a file is meaningful state ("never started" or "ended"), not
//! an error, and is surfaced as a dedicated [`StoreError::NotFound`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::sanitize::sanitize_component;
use super::StateRecord;

/// Errors from reading or writing state record files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record file does not exist. Meaningful state for callers, not a
    /// failure: the entity never started or has already ended.
    #[error("state record not found")]
    NotFound,

    #[error("corrupt state record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("state store I/O error: {0}")]
    Io(#[from] io::Error),
}

/// File-per-entity store of [`StateRecord`]s under one status directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the session-level aggregate record.
    pub fn session_path(&self, session: &str) -> PathBuf {
        self.dir
            .join(format!("{}.state", sanitize_component(session)))
    }

    /// Path of one agent's record. The `.agent.` infix keeps agent files out
    /// of the aggregate's namespace for the same session name.
    pub fn agent_path(&self, session: &str, agent_id: &str) -> PathBuf {
        self.dir.join(format!(
            "{}.agent.{}.state",
            sanitize_component(session),
            sanitize_component(agent_id)
        ))
    }

    /// File name prefix shared by all of a session's agent records.
    pub(crate) fn agent_prefix(&self, session: &str) -> String {
        format!("{}.agent.", sanitize_component(session))
    }

    /// Persist a record, creating the status directory if needed. The record
    /// becomes visible atomically: it is written to a temp file in the same
    /// directory and renamed into place.
    pub fn write(
        &self,
        session: &str,
        agent_id: Option<&str>,
        record: &StateRecord,
    ) -> Result<(), StoreError> {
        let path = match agent_id {
            Some(agent) => self.agent_path(session, agent),
            None => self.session_path(session),
        };
        fs::create_dir_all(&self.dir)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "record".to_string());
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", file_name, std::process::id()));

        let json = serde_json::to_vec(record).map_err(|source| StoreError::Corrupt {
            path: tmp.clone(),
            source,
        })?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        debug!(path = %path.display(), state = %record.state, "wrote state record");
        Ok(())
    }

    /// Read the current record for an entity.
    pub fn read(&self, session: &str, agent_id: Option<&str>) -> Result<StateRecord, StoreError> {
        let path = match agent_id {
            Some(agent) => self.agent_path(session, agent),
            None => self.session_path(session),
        };
        Self::read_path(&path)
    }

    /// Read a record at a known path (used by aggregation over a directory
    /// listing).
    pub fn read_path(path: &Path) -> Result<StateRecord, StoreError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(StoreError::Io(e)),
        };
        serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Delete an entity's record. Removing an absent record is a no-op
    /// success; deletion is idempotent.
    pub fn remove(&self, session: &str, agent_id: Option<&str>) -> Result<(), StoreError> {
        let path = match agent_id {
            Some(agent) => self.agent_path(session, agent),
            None => self.session_path(session),
        };
        Self::remove_path(&path)
    }

    /// Idempotent delete of a record at a known path.
    pub fn remove_path(path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// All record files belonging to agents of `session`. An absent status
    /// directory yields an empty list; other enumeration failures surface.
    pub fn agent_files(&self, session: &str) -> Result<Vec<PathBuf>, StoreError> {
        let prefix = self.agent_prefix(session);
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(".state") {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Session names that currently have any record file (aggregate or
    /// per-agent). Used by the list surface.
    pub fn tracked_sessions(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut sessions = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name.strip_suffix(".state") else {
                continue;
            };
            let session = match stem.split_once(".agent.") {
                Some((session, _)) => session,
                None => stem,
            };
            sessions.push(session.to_string());
        }
        sessions.sort();
        sessions.dedup();
        Ok(sessions)
    }
}
