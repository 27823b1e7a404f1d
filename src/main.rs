use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use roster::config::Config;
use roster::discovery::{self, Repo};
use roster::hooks_install;
use roster::logging::{self, LogMode};
use roster::picker;
use roster::sessions::SessionManager;
use roster::status::{handle_event, HookContext, HookEvent, StateStore};
use roster::tmux::{SystemTmuxClient, TmuxClient, TmuxError};

/// Check if tmux is available and meets version requirements
fn check_tmux_available(client: &dyn TmuxClient) -> Result<(), TmuxError> {
    let version = client.check_available()?;

    // Minimum version 2.1 for the features we use
    const MIN_MAJOR: u32 = 2;
    const MIN_MINOR: u32 = 1;

    if !version.meets_minimum(MIN_MAJOR, MIN_MINOR) {
        return Err(TmuxError::VersionTooOld(
            version.raw,
            format!("{}.{}", MIN_MAJOR, MIN_MINOR),
        ));
    }

    tracing::debug!(version = %version.raw, "tmux available");
    Ok(())
}

/// Print a helpful error message for tmux issues
fn print_tmux_error(err: &TmuxError) {
    eprintln!("Error: {}", err);
    eprintln!();

    match err {
        TmuxError::NotInstalled => {
            eprintln!("tmux is required to run roster.");
            eprintln!();
            eprintln!("Install tmux:");
            eprintln!("  macOS:         brew install tmux");
            eprintln!("  Ubuntu/Debian: sudo apt install tmux");
            eprintln!("  Fedora/RHEL:   sudo dnf install tmux");
            eprintln!("  Arch:          sudo pacman -S tmux");
        }
        TmuxError::VersionTooOld(current, required) => {
            eprintln!(
                "Your tmux version ({}) is older than the minimum required ({}).",
                current, required
            );
        }
        _ => {
            eprintln!("Please ensure tmux is properly installed and working.");
        }
    }
}

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Tmux work-session manager with a live AI-agent status line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a work session for a repository (cloning if needed)
    New {
        /// Local path, owner/name, git URL, or discovered repository name
        repo: String,
    },

    /// List work sessions with their states
    Ls,

    /// Print the state of one session
    Status {
        /// Session name
        session: String,
    },

    /// Attach to a session
    Attach {
        /// Session name
        session: String,
    },

    /// Kill a session and remove its state records
    Kill {
        /// Session name
        session: String,
    },

    /// Handle one lifecycle event from stdin (wired into assistant hooks)
    Hook {
        /// Pane the event belongs to (defaults to $TMUX_PANE)
        #[arg(long)]
        pane: Option<String>,
    },

    /// Install the assistant hook configuration invoking `roster hook`
    InstallHooks {
        /// Settings file to modify (defaults to the assistant's per-user file)
        #[arg(long)]
        settings: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let mode = match cli.command {
        None => LogMode::Picker,
        Some(Commands::Hook { .. }) => LogMode::Hook,
        Some(_) => LogMode::Cli,
    };
    let _logging_handle = logging::init_logging(&config, mode, cli.debug)?;

    let tmux = SystemTmuxClient::new();

    match cli.command {
        Some(Commands::New { repo }) => cmd_new(&config, &tmux, &repo),
        Some(Commands::Ls) => cmd_ls(&config, &tmux),
        Some(Commands::Status { session }) => cmd_status(&config, &tmux, &session),
        Some(Commands::Attach { session }) => cmd_attach(&config, &tmux, &session),
        Some(Commands::Kill { session }) => cmd_kill(&config, &tmux, &session),
        Some(Commands::Hook { pane }) => cmd_hook(&config, &tmux, pane),
        Some(Commands::InstallHooks { settings }) => cmd_install_hooks(settings),
        None => run_picker(&config, &tmux),
    }
}

fn run_picker(config: &Config, tmux: &dyn TmuxClient) -> Result<()> {
    if let Err(err) = check_tmux_available(tmux) {
        print_tmux_error(&err);
        std::process::exit(1);
    }

    let repos = discovery::discover_repos(config);
    if repos.is_empty() {
        println!("No repositories found.");
        println!(
            "Clone something under {} or configure [github] in the config file.",
            config.clones_path().display()
        );
        return Ok(());
    }

    let Some(repo) = picker::run(repos)? else {
        return Ok(());
    };

    let manager = SessionManager::new(config, tmux);
    let name = manager.create(&repo)?;
    manager.attach(&name)
}

fn cmd_new(config: &Config, tmux: &dyn TmuxClient, spec: &str) -> Result<()> {
    if let Err(err) = check_tmux_available(tmux) {
        print_tmux_error(&err);
        std::process::exit(1);
    }

    let repo = resolve_repo_spec(config, spec)?;
    let manager = SessionManager::new(config, tmux);
    let name = manager.create(&repo)?;
    println!("Session '{}' ready", name);
    manager.attach(&name)
}

/// Turn a `roster new` argument into a repository: an existing local
/// checkout, an `owner/name` GitHub spec, a git URL, or the name of a
/// discovered repository.
fn resolve_repo_spec(config: &Config, spec: &str) -> Result<Repo> {
    let as_path = roster::config::expand_tilde(spec);
    if as_path.join(".git").exists() {
        let name = as_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("workspace")
            .to_string();
        return Ok(Repo {
            name,
            path: Some(as_path),
            clone_url: None,
        });
    }

    if spec.contains("://") || spec.starts_with("git@") {
        let name = spec
            .rsplit('/')
            .next()
            .unwrap_or(spec)
            .trim_end_matches(".git")
            .to_string();
        return Ok(Repo {
            name,
            path: None,
            clone_url: Some(spec.to_string()),
        });
    }

    if let Some((owner, name)) = discovery::github::parse_repo_spec(spec) {
        return Ok(Repo {
            name: name.to_string(),
            path: None,
            clone_url: Some(format!("git@github.com:{}/{}.git", owner, name)),
        });
    }

    let repos = discovery::discover_repos(config);
    repos
        .into_iter()
        .find(|r| r.name == spec)
        .with_context(|| format!("no repository named '{spec}' found"))
}

fn cmd_ls(config: &Config, tmux: &dyn TmuxClient) -> Result<()> {
    let manager = SessionManager::new(config, tmux);
    let sessions = manager.list()?;

    if sessions.is_empty() {
        println!("No sessions");
        return Ok(());
    }

    for info in sessions {
        let attached = if info.attached { "*" } else { " " };
        let source = if info.event_driven { "" } else { " (inferred)" };
        println!(
            "{} {}{} {}{}",
            info.state.indicator(),
            attached,
            info.name,
            info.state,
            source
        );
    }

    Ok(())
}

fn cmd_status(config: &Config, tmux: &dyn TmuxClient, session: &str) -> Result<()> {
    let manager = SessionManager::new(config, tmux);
    let state = manager.status(session)?;
    println!("{}", state);
    Ok(())
}

fn cmd_attach(config: &Config, tmux: &dyn TmuxClient, session: &str) -> Result<()> {
    let manager = SessionManager::new(config, tmux);
    manager.attach(session)
}

fn cmd_kill(config: &Config, tmux: &dyn TmuxClient, session: &str) -> Result<()> {
    let manager = SessionManager::new(config, tmux);
    manager.kill(session)?;
    println!("Killed '{}'", session);
    Ok(())
}

fn cmd_hook(config: &Config, tmux: &dyn TmuxClient, pane: Option<String>) -> Result<()> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("reading event payload from stdin")?;

    let event = HookEvent::from_json(&raw).context("decoding event payload")?;

    let ctx = HookContext {
        pane_id: pane.or_else(|| std::env::var("TMUX_PANE").ok()),
        window_label: config.status.window_label.clone(),
        stale_after_secs: config.status.stale_after_secs,
    };

    let store = StateStore::new(config.status_path());
    let outcome = handle_event(&event, &ctx, &store, tmux)?;
    tracing::debug!(?outcome, "hook handled");
    Ok(())
}

fn cmd_install_hooks(settings: Option<String>) -> Result<()> {
    let path = match settings {
        Some(path) => PathBuf::from(path),
        None => hooks_install::default_settings_path(),
    };

    let summary = hooks_install::install_hooks(&path)?;
    for event in &summary.added {
        println!("  + {}", event);
    }
    for event in &summary.already_installed {
        println!("  = {} (already installed)", event);
    }
    println!("Hook configuration written to {}", path.display());
    Ok(())
}
