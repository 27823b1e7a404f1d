//! Hook event orchestration: one lifecycle event in, one state transition
//! out, reflected on the tmux window.
//!
//! The handler is a function of `(event, context) -> effects`; ambient
//! context (which pane the event came from) is resolved by the caller and
//! passed in explicitly, so tests never touch the process environment.

use anyhow::Result;
use tracing::{debug, warn};

use crate::tmux::TmuxClient;

use super::aggregate::recompute_session;
use super::event::{map_event, HookEvent};
use super::store::{StateStore, StoreError};
use super::{SessionState, StateRecord};

/// Ambient context for one hook invocation.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Multiplexer pane the event originated in (`$TMUX_PANE`), if any.
    pub pane_id: Option<String>,
    /// Undecorated window label; the aggregate's emoji is prefixed to it.
    pub window_label: String,
    /// Age beyond which a per-agent record is considered abandoned.
    pub stale_after_secs: i64,
}

/// What a hook invocation did, mostly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// No tracked session resolvable from the context; nothing to update.
    OutsideSession,
    /// Agent already in this state; no write, no display call.
    Unchanged(SessionState),
    /// Agent record updated; the session aggregate is now this state.
    Updated(SessionState),
    /// Terminal event: agent record removed; aggregate recomputed to this.
    Ended(SessionState),
}

/// Handle one decoded lifecycle event.
///
/// The persisted record is the source of truth; the window rename is
/// advisory and its failure never fails the state transition.
pub fn handle_event(
    event: &HookEvent,
    ctx: &HookContext,
    store: &StateStore,
    tmux: &dyn TmuxClient,
) -> Result<HookOutcome> {
    let Some(pane_id) = ctx.pane_id.as_deref() else {
        debug!("no pane in context; event ignored");
        return Ok(HookOutcome::OutsideSession);
    };

    let session = match tmux.pane_session_name(pane_id) {
        Ok(Some(session)) => session,
        Ok(None) => {
            debug!(pane = pane_id, "pane has no owning session; event ignored");
            return Ok(HookOutcome::OutsideSession);
        }
        Err(e) => {
            warn!(pane = pane_id, error = %e, "could not resolve pane owner; event ignored");
            return Ok(HookOutcome::OutsideSession);
        }
    };

    let state = map_event(event);
    let agent_id = event.session_id.as_str();
    debug!(
        session = %session,
        agent = agent_id,
        event = %event.hook_event_name,
        state = %state,
        "handling hook event"
    );

    if state == SessionState::Stopped {
        // Strip the decoration before the record disappears, then let the
        // recompute re-decorate if other agents are still live.
        decorate(tmux, &session, &ctx.window_label);
        store.remove(&session, Some(agent_id))?;
        let aggregate = recompute_session(store, &session, ctx.stale_after_secs)?;
        if aggregate != SessionState::Stopped {
            decorate(
                tmux,
                &session,
                &format!("{}{}", aggregate.indicator(), ctx.window_label),
            );
        }
        return Ok(HookOutcome::Ended(aggregate));
    }

    match store.read(&session, Some(agent_id)) {
        Ok(existing) if existing.state == state => {
            // Steady-state event storm; skip the write and the rename
            return Ok(HookOutcome::Unchanged(state));
        }
        Ok(_) | Err(StoreError::NotFound) => {}
        Err(e) => {
            // A corrupt record is replaced wholesale by the write below
            warn!(session = %session, agent = agent_id, error = %e, "replacing unreadable agent record");
        }
    }

    store.write(
        &session,
        Some(agent_id),
        &StateRecord::new(state, Some(agent_id.to_string())),
    )?;
    let aggregate = recompute_session(store, &session, ctx.stale_after_secs)?;
    decorate(
        tmux,
        &session,
        &format!("{}{}", aggregate.indicator(), ctx.window_label),
    );

    Ok(HookOutcome::Updated(aggregate))
}

/// Best-effort window rename; display is advisory.
fn decorate(tmux: &dyn TmuxClient, session: &str, name: &str) {
    if let Err(e) = tmux.rename_window(session, name) {
        warn!(session = %session, error = %e, "window rename failed");
    }
}
