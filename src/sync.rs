//! Best-effort remote persistence for edited notes.
//!
//! The local store is the source of truth. Edits are applied first, then
//! pushed with PUT semantics; a failed push is reported and never rolled back.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{info, warn};
use url::Url;

use crate::errors::{Result, SyncError};
use crate::models::{Notice, SavedNote};
use crate::AppState;

pub trait NoteSync: Send + Sync {
    fn put_note(&self, note: SavedNote) -> BoxFuture<'static, Result<(), SyncError>>;
}

/// Used when no sync URL is configured.
pub struct DisabledSync;

impl NoteSync for DisabledSync {
    fn put_note(&self, _note: SavedNote) -> BoxFuture<'static, Result<(), SyncError>> {
        async { Ok(()) }.boxed()
    }
}

/// PUTs the full note as JSON to a fixed endpoint.
pub struct HttpNoteSync {
    client: reqwest::Client,
    url: Url,
}

impl HttpNoteSync {
    pub fn new(url: Url) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, url })
    }
}

impl NoteSync for HttpNoteSync {
    fn put_note(&self, note: SavedNote) -> BoxFuture<'static, Result<(), SyncError>> {
        let request = self.client.put(self.url.clone()).json(&note);
        async move {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(SyncError::Rejected(response.status().as_u16()));
            }
            Ok(())
        }
        .boxed()
    }
}

// ============================================================================
// Edit + Sync
// ============================================================================

#[derive(Debug)]
pub struct EditOutcome {
    pub note: SavedNote,
    pub sync_error: Option<SyncError>,
}

impl EditOutcome {
    pub fn notice(&self) -> Notice {
        match &self.sync_error {
            None => Notice::info("Note updated", "Your note has been updated successfully."),
            Some(_) => Notice::error("Failed to update note. Please try again."),
        }
    }
}

/// Apply an edit locally, then push it. Only a local failure (unknown id) is
/// an error; a failed push is reported in the outcome.
///
/// Edits and their pushes are serialized, so the remote never ends up with
/// an older version than the last local edit.
pub async fn edit_note(
    state: &Arc<AppState>,
    id: i64,
    title: &str,
    content: &str,
) -> Result<EditOutcome> {
    let _order = state.sync_order.lock().await;
    let note = {
        let mut ws = state.workspace.lock().await;
        ws.notes.edit(id, title, content)?.clone()
    };

    let sync_error = match state.sync.put_note(note.clone()).await {
        Ok(()) => {
            info!(id, "note synced");
            None
        }
        Err(e) => {
            warn!(id, error = %e, "note sync failed, keeping local edit");
            Some(e)
        }
    };

    Ok(EditOutcome { note, sync_error })
}
