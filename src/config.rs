use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the state record files. Empty = per-user default.
    #[serde(default)]
    pub status: String,

    /// Directory repositories are cloned into.
    #[serde(default = "default_clones_dir")]
    pub clones: String,

    /// Additional directories scanned for existing local checkouts.
    #[serde(default)]
    pub workspaces: Vec<String>,
}

fn default_clones_dir() -> String {
    "~/roster".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            status: String::new(),
            clones: default_clones_dir(),
            workspaces: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Seconds after which an agent record with no new events is considered
    /// abandoned and evicted from aggregation.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: i64,

    /// Undecorated window label; the state emoji is prefixed to it.
    #[serde(default = "default_window_label")]
    pub window_label: String,
}

fn default_stale_after_secs() -> i64 {
    600
}

fn default_window_label() -> String {
    "claude".to_string()
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
            window_label: default_window_label(),
        }
    }
}

/// GitHub repository discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GithubConfig {
    /// User whose repositories are listed
    #[serde(default)]
    pub user: Option<String>,

    /// Organization whose repositories are listed
    #[serde(default)]
    pub org: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to file in picker mode (false = stderr for debugging)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so roster works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        // User config in ~/.config/roster/
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("roster").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with ROSTER_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("ROSTER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Directory holding the state record files.
    pub fn status_path(&self) -> PathBuf {
        if self.paths.status.is_empty() {
            data_dir().join("status")
        } else {
            expand_tilde(&self.paths.status)
        }
    }

    /// Directory repositories are cloned into.
    pub fn clones_path(&self) -> PathBuf {
        expand_tilde(&self.paths.clones)
    }

    /// Directories scanned for existing local checkouts: the clone root plus
    /// any configured workspaces.
    pub fn workspace_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.clones_path()];
        paths.extend(self.paths.workspaces.iter().map(|p| expand_tilde(p)));
        paths.dedup();
        paths
    }

    /// Directory for picker-mode log files.
    pub fn logs_path(&self) -> PathBuf {
        data_dir().join("logs")
    }

    /// Lock file serializing session creation. Lives next to the state
    /// records; store scans only consider `*.state` files, so it is ignored.
    pub fn create_lock_path(&self) -> PathBuf {
        self.status_path().join(".create.lock")
    }
}

/// Per-user data directory for roster.
fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roster")
}

/// Expand ~ to home directory in a path
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.status.stale_after_secs, 600);
        assert_eq!(config.status.window_label, "claude");
        assert!(config.github.user.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_status_path_default_is_per_user() {
        let config = Config::default();
        let path = config.status_path();
        assert!(path.ends_with("roster/status"));
    }

    #[test]
    fn test_status_path_override() {
        let mut config = Config::default();
        config.paths.status = "/var/tmp/roster-status".to_string();
        assert_eq!(
            config.status_path(),
            PathBuf::from("/var/tmp/roster-status")
        );
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/work");
        assert!(expanded.is_absolute());
        assert!(expanded.ends_with("work"));

        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn test_workspace_paths_include_clone_root() {
        let mut config = Config::default();
        config.paths.workspaces = vec!["/srv/checkouts".to_string()];

        let paths = config.workspace_paths();
        assert_eq!(paths[0], config.clones_path());
        assert!(paths.contains(&PathBuf::from("/srv/checkouts")));
    }
}
