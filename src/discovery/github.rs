//! GitHub repository discovery.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

use crate::config::GithubConfig;

use super::Repo;

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

/// GitHub API client
pub struct GithubClient {
    token: String,
    client: reqwest::blocking::Client,
}

// Response type for API deserialization
#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    ssh_url: Option<String>,
    clone_url: Option<String>,
    #[serde(default)]
    archived: bool,
}

impl RepoResponse {
    fn into_repo(self) -> Repo {
        Repo {
            name: self.name,
            path: None,
            clone_url: self.ssh_url.or(self.clone_url),
        }
    }
}

impl GithubClient {
    /// Create a client from the ROSTER_GITHUB_TOKEN environment variable.
    /// Without a token, discovery silently runs local-only.
    pub fn from_env() -> Result<Option<Self>> {
        match env::var("ROSTER_GITHUB_TOKEN") {
            Ok(token) if !token.is_empty() => {
                let client = reqwest::blocking::Client::builder()
                    .user_agent("roster/0.1.0")
                    .build()
                    .context("Failed to build HTTP client")?;
                Ok(Some(Self { token, client }))
            }
            _ => Ok(None),
        }
    }

    /// List repositories for the configured user and/or organization.
    pub fn list_repos(&self, config: &GithubConfig) -> Result<Vec<Repo>> {
        let mut repos = Vec::new();

        if let Some(ref user) = config.user {
            let url = format!("{}/users/{}/repos", GITHUB_API_BASE, user);
            repos.extend(self.list_paged(&url)?);
        }
        if let Some(ref org) = config.org {
            let url = format!("{}/orgs/{}/repos", GITHUB_API_BASE, org);
            repos.extend(self.list_paged(&url)?);
        }

        Ok(repos)
    }

    fn list_paged(&self, url: &str) -> Result<Vec<Repo>> {
        let mut repos = Vec::new();
        let mut page = 1;

        loop {
            let response: Vec<RepoResponse> = self
                .client
                .get(url)
                .query(&[("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())])
                .header("Accept", "application/vnd.github+json")
                .header("Authorization", format!("Bearer {}", self.token))
                .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
                .send()
                .context("Failed to send request to GitHub API")?
                .error_for_status()
                .context("GitHub API returned error status")?
                .json()
                .context("Failed to parse GitHub repository response")?;

            let count = response.len();
            repos.extend(
                response
                    .into_iter()
                    .filter(|r| !r.archived)
                    .map(RepoResponse::into_repo),
            );

            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(repos)
    }
}

/// Parse owner and repo name from an `owner/name` string.
pub fn parse_repo_spec(spec: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = spec.split('/').collect();
    if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
        Some((parts[0], parts[1]))
    } else {
        None
    }
}
