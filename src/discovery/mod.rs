//! Repository discovery: the list of repositories a work session can be
//! created for.
//!
//! Two sources feed the picker: local checkouts under the configured
//! workspace roots, and the GitHub API for a configured user or
//! organization. A failure in one source degrades to a warning; the other
//! source's results are still shown.

pub mod github;
pub mod local;

use std::path::PathBuf;

use tracing::warn;

use crate::config::Config;

/// A selectable repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub name: String,
    /// Local checkout, when one exists.
    pub path: Option<PathBuf>,
    /// Remote clone URL, when discovered on GitHub.
    pub clone_url: Option<String>,
}

impl Repo {
    pub fn is_local(&self) -> bool {
        self.path.is_some()
    }

    /// One-line origin tag for list UIs.
    pub fn origin(&self) -> &'static str {
        if self.is_local() {
            "local"
        } else {
            "github"
        }
    }
}

/// Gather repositories from all configured sources, merged by name. A local
/// checkout and a GitHub entry with the same name collapse into one repo
/// that knows both its path and its clone URL.
pub fn discover_repos(config: &Config) -> Vec<Repo> {
    let mut repos: Vec<Repo> = Vec::new();

    for root in config.workspace_paths() {
        match local::scan_root(&root) {
            Ok(found) => repos.extend(found),
            Err(e) => warn!(root = %root.display(), error = %e, "skipping workspace root"),
        }
    }

    match github::GithubClient::from_env() {
        Ok(Some(client)) => match client.list_repos(&config.github) {
            Ok(found) => repos.extend(found),
            Err(e) => warn!(error = %e, "GitHub discovery failed"),
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "GitHub client unavailable"),
    }

    merge_by_name(repos)
}

/// Sort by name and collapse duplicates, preferring local information.
pub(crate) fn merge_by_name(mut repos: Vec<Repo>) -> Vec<Repo> {
    repos.sort_by(|a, b| a.name.cmp(&b.name).then(b.is_local().cmp(&a.is_local())));

    let mut merged: Vec<Repo> = Vec::new();
    for repo in repos {
        match merged.last_mut() {
            Some(prev) if prev.name == repo.name => {
                if prev.path.is_none() {
                    prev.path = repo.path;
                }
                if prev.clone_url.is_none() {
                    prev.clone_url = repo.clone_url;
                }
            }
            _ => merged.push(repo),
        }
    }
    merged
}
