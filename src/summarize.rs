//! Drives a summary session against the configured provider.
//!
//! User intents take the workspace lock briefly; the streaming task takes it
//! once per fragment and never holds it across a network await. Every
//! transition is broadcast as a [`SessionEvent`] for live display.

use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{ProviderError, Result};
use crate::models::{SavedNote, SummaryEditRequest};
use crate::provider::SummaryRequest;
use crate::session::{Displaced, SessionSnapshot, SessionTicket};
use crate::AppState;

#[cfg(test)]
#[path = "summarize_test.rs"]
mod summarize_test;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionEvent {
    Started { generation: u64 },
    Streaming { generation: u64 },
    /// `buffer` is the accumulated summary including `text`.
    Fragment {
        generation: u64,
        text: String,
        buffer: String,
    },
    Ready { generation: u64, buffer: String },
    Cancelled { generation: u64 },
    Failed { generation: u64, error: String },
    Saved { generation: u64, note: SavedNote },
}

fn emit(state: &AppState, event: SessionEvent) {
    // No subscribers is fine; the snapshot endpoint still has the state.
    state.events.send(event).ok();
}

// ============================================================================
// User Intents
// ============================================================================

/// Validate and start a session without spawning the provider task.
pub async fn begin_summary(state: &Arc<AppState>) -> Result<(SessionTicket, SummaryRequest)> {
    let mut guard = state.workspace.lock().await;
    let ws = &mut *guard;

    let (ticket, displaced) = ws.session.start(ws.draft.text())?;
    match displaced {
        Displaced::Cancelled(old) => {
            info!(generation = old.0, "previous summary superseded");
            emit(state, SessionEvent::Cancelled { generation: old.0 });
        }
        Displaced::Discarded => debug!("unsaved summary discarded"),
        Displaced::Nothing => {}
    }

    let request = ws.summary_request(&state.config);
    info!(generation = ticket.0, chars = request.note.len(), "summary started");
    emit(state, SessionEvent::Started { generation: ticket.0 });

    Ok((ticket, request))
}

/// Start a session and stream the provider response in the background.
pub async fn start_summary(state: &Arc<AppState>) -> Result<SessionSnapshot> {
    let (ticket, request) = begin_summary(state).await?;
    let snapshot = state.workspace.lock().await.session.snapshot();

    let task_state = Arc::clone(state);
    tokio::spawn(async move {
        drive_summary(task_state, ticket, request).await;
    });

    Ok(snapshot)
}

/// Returns the snapshot after cancelling; cancelling an idle session is a no-op.
pub async fn cancel_summary(state: &Arc<AppState>) -> (bool, SessionSnapshot) {
    let mut ws = state.workspace.lock().await;
    let cancelled = match ws.session.cancel() {
        Some(ticket) => {
            info!(generation = ticket.0, "summary cancelled");
            emit(state, SessionEvent::Cancelled { generation: ticket.0 });
            true
        }
        None => false,
    };
    (cancelled, ws.session.snapshot())
}

pub async fn edit_summary(
    state: &Arc<AppState>,
    edit: &SummaryEditRequest,
) -> Result<SessionSnapshot> {
    let mut ws = state.workspace.lock().await;
    if let Some(text) = &edit.text {
        ws.session.edit(text)?;
    }
    if let Some(title) = &edit.title {
        ws.session.set_title(title)?;
    }
    Ok(ws.session.snapshot())
}

pub async fn save_summary(state: &Arc<AppState>, title: Option<&str>) -> Result<SavedNote> {
    let mut ws = state.workspace.lock().await;
    let generation = ws.session.generation();
    let note = ws.save_summary(title)?;
    info!(id = note.id, title = %note.title, "summary saved");
    emit(
        state,
        SessionEvent::Saved {
            generation,
            note: note.clone(),
        },
    );
    Ok(note)
}

// ============================================================================
// Streaming Task
// ============================================================================

async fn fail_session(state: &AppState, ticket: SessionTicket, error: &ProviderError) {
    let mut ws = state.workspace.lock().await;
    if ws.session.fail(ticket, &error.to_string()) {
        warn!(generation = ticket.0, %error, "summary failed");
        emit(
            state,
            SessionEvent::Failed {
                generation: ticket.0,
                error: error.to_string(),
            },
        );
    } else {
        debug!(generation = ticket.0, %error, "ignoring error from stale summary");
    }
}

/// Fold the provider's fragments into the session. Stops as soon as the
/// ticket goes stale.
pub async fn drive_summary(state: Arc<AppState>, ticket: SessionTicket, request: SummaryRequest) {
    let mut fragments = match state.provider.summarize(request).await {
        Ok(stream) => stream,
        Err(e) => {
            fail_session(&state, ticket, &e).await;
            return;
        }
    };

    {
        let mut ws = state.workspace.lock().await;
        if !ws.session.begin_streaming(ticket) {
            debug!(generation = ticket.0, "summary went stale before streaming");
            return;
        }
        emit(&state, SessionEvent::Streaming { generation: ticket.0 });
    }

    while let Some(item) = fragments.next().await {
        match item {
            Ok(text) => {
                let mut ws = state.workspace.lock().await;
                if !ws.session.push_fragment(ticket, &text) {
                    debug!(generation = ticket.0, "dropping fragments of stale summary");
                    return;
                }
                emit(
                    &state,
                    SessionEvent::Fragment {
                        generation: ticket.0,
                        text,
                        buffer: ws.session.buffer().to_string(),
                    },
                );
            }
            Err(e) => {
                fail_session(&state, ticket, &e).await;
                return;
            }
        }
    }

    let mut ws = state.workspace.lock().await;
    if ws.session.finish(ticket) {
        let buffer = ws.session.buffer().to_string();
        info!(generation = ticket.0, chars = buffer.len(), "summary ready");
        emit(
            &state,
            SessionEvent::Ready {
                generation: ticket.0,
                buffer,
            },
        );
    }
}
