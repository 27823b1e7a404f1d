//! Sanitization of untrusted identifiers into filesystem-safe path segments.
//!
//! Session names come from tmux and agent ids from the hook payload; neither
//! is validated upstream. Record file names are derived from them, so a
//! malicious identifier must never be able to escape the status directory.

/// Placeholder used when an identifier reduces to nothing usable.
const PLACEHOLDER: &str = "_";

/// Reduce an arbitrary identifier to a safe single path segment.
///
/// Only the final path component survives (basename semantics): separators
/// are treated as component boundaries and `.`/`..` components are dropped,
/// so `../../etc/passwd` yields `passwd`. An input that reduces to nothing
/// yields a fixed placeholder rather than an error; a malformed identifier
/// must not fail the hot path.
///
/// Deterministic: the same raw identifier always resolves to the same file.
pub fn sanitize_component(raw: &str) -> String {
    raw.split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .next_back()
        .map_or_else(|| PLACEHOLDER.to_string(), ToString::to_string)
}
