//! Roster - tmux work-session manager with a live AI-agent status line
//!
//! One tmux session per cloned repository; agents inside report lifecycle
//! events through `roster hook`, and the status engine keeps each window
//! name decorated with the session's aggregate state.

pub mod config;
pub mod discovery;
pub mod heuristics;
pub mod hooks_install;
pub mod logging;
pub mod picker;
pub mod sessions;
pub mod status;
pub mod tmux;
