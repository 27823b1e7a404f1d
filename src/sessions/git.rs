//! Git CLI wrapper for clone operations.
//!
//! Uses the git CLI directly (rather than libgit2) to ensure compatibility
//! with credential helpers, SSH config, and other git features.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Execute a git command and return stdout
fn run_git(args: &[&str]) -> Result<String> {
    debug!(?args, "Running git command");

    let output = Command::new("git")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("Failed to execute git command")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "git {} failed: {}",
            args.first().unwrap_or(&""),
            stderr.trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Clone `url` into `dest`. The parent directory is created if needed.
pub fn clone(url: &str, dest: &Path) -> Result<()> {
    which::which("git").map_err(|_| anyhow!("git is not installed or not in PATH"))?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).context("Failed to create clone root")?;
    }
    run_git(&["clone", url, &dest.to_string_lossy()])?;
    Ok(())
}

/// Whether `path` looks like a git checkout.
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_is_git_repo() {
        let temp = tempdir().unwrap();
        assert!(!is_git_repo(temp.path()));

        std::fs::create_dir(temp.path().join(".git")).unwrap();
        assert!(is_git_repo(temp.path()));
    }

    #[test]
    fn test_clone_invalid_url_fails() {
        let temp = tempdir().unwrap();
        let result = clone("/nonexistent/definitely-not-a-repo", &temp.path().join("dest"));
        assert!(result.is_err());
    }
}
