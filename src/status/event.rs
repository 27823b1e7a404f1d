//! Inbound lifecycle events and the event-to-state mapping.

use serde::Deserialize;

use super::SessionState;

/// One lifecycle event as emitted by the assistant runtime's hooks, received
/// as a single line of JSON on the hook handler's stdin. Unknown extra fields
/// are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct HookEvent {
    /// Event name, e.g. "SessionStart", "Stop", "Notification".
    pub hook_event_name: String,

    /// Present only on Notification events.
    #[serde(default)]
    pub notification_type: Option<String>,

    /// Opaque per-agent identifier.
    #[serde(default)]
    pub session_id: String,
}

impl HookEvent {
    /// Decode a raw payload. A payload that is not valid JSON, or that lacks
    /// `hook_event_name`, is a hard failure: it indicates a protocol mismatch
    /// with the upstream event source, not a state to be guessed at.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Map a lifecycle event to a state. Pure table lookup: unrecognized event
/// names and notification subtypes map to [`SessionState::Unknown`] rather
/// than failing; the caller decides whether `unknown` warrants action.
pub fn map_event(event: &HookEvent) -> SessionState {
    match event.hook_event_name.as_str() {
        "SessionStart" => SessionState::Idle,
        "UserPromptSubmit" => SessionState::Running,
        "PreToolUse" => SessionState::Running,
        "Stop" => SessionState::Idle,
        "SessionEnd" => SessionState::Stopped,
        "Notification" => match event.notification_type.as_deref() {
            Some("permission_prompt") | Some("elicitation_dialog") => {
                SessionState::WaitingForInput
            }
            Some("idle_prompt") => SessionState::Idle,
            _ => SessionState::Unknown,
        },
        _ => SessionState::Unknown,
    }
}
