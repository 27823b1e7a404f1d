//! Installation of the assistant-side hook configuration.
//!
//! Wires `roster hook` into the assistant's settings file so every lifecycle
//! event reaches the status engine. Installation only ever appends entries
//! it owns and recognizes; it never rewrites hook entries belonging to other
//! tools.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::info;

/// Events the status engine consumes.
pub const HOOK_EVENTS: &[&str] = &[
    "SessionStart",
    "UserPromptSubmit",
    "PreToolUse",
    "Stop",
    "SessionEnd",
    "Notification",
];

/// Command installed for each event. Recognized as ours by substring match.
pub const HOOK_COMMAND: &str = "roster hook";

/// Outcome of an installation run.
#[derive(Debug, Default)]
pub struct InstallSummary {
    pub added: Vec<String>,
    pub already_installed: Vec<String>,
}

/// Default assistant settings file.
pub fn default_settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("settings.json")
}

/// Ensure every lifecycle event invokes `roster hook`. Existing entries from
/// other tools are left untouched; a settings file whose hook section has an
/// unexpected shape is refused rather than rewritten.
pub fn install_hooks(settings_path: &Path) -> Result<InstallSummary> {
    let mut settings: Value = match fs::read_to_string(settings_path) {
        Ok(text) => serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", settings_path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => json!({}),
        Err(e) => return Err(e.into()),
    };

    let Some(root) = settings.as_object_mut() else {
        bail!(
            "{} is not a JSON object; refusing to rewrite it",
            settings_path.display()
        );
    };

    let hooks_value = root.entry("hooks").or_insert_with(|| json!({}));
    let Some(hooks) = hooks_value.as_object_mut() else {
        bail!(
            "'hooks' in {} is not an object; refusing to rewrite it",
            settings_path.display()
        );
    };

    let mut summary = InstallSummary::default();

    for event in HOOK_EVENTS {
        let entries = hooks.entry(*event).or_insert_with(|| json!([]));
        let Some(entries) = entries.as_array_mut() else {
            bail!("hook entry '{event}' has an unexpected shape; refusing to rewrite it");
        };

        if entries.iter().any(contains_our_command) {
            summary.already_installed.push((*event).to_string());
            continue;
        }

        entries.push(json!({
            "hooks": [ { "type": "command", "command": HOOK_COMMAND } ]
        }));
        summary.added.push((*event).to_string());
    }

    if let Some(parent) = settings_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(&settings)?;
    fs::write(settings_path, text + "\n")
        .with_context(|| format!("writing {}", settings_path.display()))?;

    info!(
        path = %settings_path.display(),
        added = summary.added.len(),
        "hook configuration installed"
    );
    Ok(summary)
}

fn contains_our_command(entry: &Value) -> bool {
    entry["hooks"]
        .as_array()
        .map(|hooks| {
            hooks.iter().any(|h| {
                h["command"]
                    .as_str()
                    .map(|c| c.contains(HOOK_COMMAND))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_install_adds_all_events() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");

        let summary = install_hooks(&path).unwrap();
        assert_eq!(summary.added.len(), HOOK_EVENTS.len());
        assert!(summary.already_installed.is_empty());

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        for event in HOOK_EVENTS {
            let entries = written["hooks"][event].as_array().unwrap();
            assert!(entries.iter().any(contains_our_command));
        }
    }

    #[test]
    fn test_second_install_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");

        install_hooks(&path).unwrap();
        let summary = install_hooks(&path).unwrap();

        assert!(summary.added.is_empty());
        assert_eq!(summary.already_installed.len(), HOOK_EVENTS.len());

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["hooks"]["Stop"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_preserves_foreign_entries_and_settings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(
            &path,
            r#"{
                "model": "opus",
                "hooks": {
                    "Stop": [ { "hooks": [ { "type": "command", "command": "other-tool notify" } ] } ]
                }
            }"#,
        )
        .unwrap();

        install_hooks(&path).unwrap();

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["model"], "opus");

        let stop = written["hooks"]["Stop"].as_array().unwrap();
        assert_eq!(stop.len(), 2);
        assert_eq!(
            stop[0]["hooks"][0]["command"].as_str().unwrap(),
            "other-tool notify"
        );
    }

    #[test]
    fn test_refuses_malformed_hook_section() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, r#"{"hooks": {"Stop": "not an array"}}"#).unwrap();

        assert!(install_hooks(&path).is_err());
        // The malformed file must be left exactly as it was
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            r#"{"hooks": {"Stop": "not an array"}}"#
        );
    }
}
