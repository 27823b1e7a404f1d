//! Legacy pane-content state inference.
//!
//! Before hook events existed, session state was guessed by scanning the
//! last screenful of captured pane text for prompt and spinner patterns.
//! This is best-effort and non-authoritative: it is consulted only by the
//! read-side commands (`ls`, `status`) when no event-driven record exists,
//! never by the event handler or the aggregator.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::status::SessionState;

/// How many trailing lines of pane content are considered.
const SCAN_LINES: usize = 20;

static RE_WAITING_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)(Type a message|Press Enter|waiting for input|\[y/n\]|\(y/N\)|\(Y/n\))")
        .unwrap()
});

static RE_RUNNING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)(Thinking\.{3}|Processing|Working|⠋|⠙|⠹|⠸|⠼|⠴|⠦|⠧|⠇|⠏|\.\.\.$)").unwrap()
});

static RE_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)(^Error:|^error:|Exception|panic|fatal)").unwrap());

static RE_IDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)(^\$\s*$|^❯\s*$|^>\s*$)").unwrap());

/// Guess a state from captured pane content.
///
/// Precedence mirrors aggregation: error beats waiting beats running beats
/// idle, and anything undecidable is `Unknown`.
pub fn infer_state(content: &str) -> SessionState {
    let lines: Vec<&str> = content.lines().rev().take(SCAN_LINES).collect();
    let recent: String = lines.into_iter().rev().collect::<Vec<_>>().join("\n");

    if RE_ERROR.is_match(&recent) {
        return SessionState::Error;
    }
    if RE_WAITING_INPUT.is_match(&recent) {
        return SessionState::WaitingForInput;
    }
    if RE_RUNNING.is_match(&recent) {
        return SessionState::Running;
    }
    if RE_IDLE.is_match(&recent) {
        return SessionState::Idle;
    }

    SessionState::Unknown
}
