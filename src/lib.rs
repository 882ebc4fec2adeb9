//! Meeting minutes library - re-exports for testing and external use.
//!
//! A single-user meeting-notes tool: type notes, pick a template, stream a
//! summary from a local Ollama model, and keep the results in memory.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

pub mod config;
pub mod draft;
pub mod errors;
pub mod handlers;
pub mod ids;
pub mod models;
pub mod provider;
pub mod saved_notes;
pub mod services;
pub mod session;
pub mod settings;
pub mod summarize;
pub mod sync;
pub mod template_registry;
pub mod workspace;

use config::Config;
use errors::NotesError;
use provider::{OllamaProvider, SummaryProvider};
use summarize::SessionEvent;
use sync::{DisabledSync, HttpNoteSync, NoteSync};
use workspace::Workspace;

/// Buffered session events per subscriber before slow readers start lagging.
pub const EVENT_CAPACITY: usize = 256;

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub config: Config,
    pub workspace: Mutex<Workspace>,
    pub provider: Arc<dyn SummaryProvider>,
    pub sync: Arc<dyn NoteSync>,
    /// Held across a note edit and its push so pushes reach the remote in
    /// the order the edits were applied. Never held with `workspace` across
    /// an await.
    pub sync_order: Mutex<()>,
    pub events: broadcast::Sender<SessionEvent>,
}

impl AppState {
    /// Wire up the Ollama provider and, if configured, HTTP note sync.
    pub fn new(config: Config) -> Result<Self, NotesError> {
        let provider = Arc::new(OllamaProvider::new()?);
        let sync: Arc<dyn NoteSync> = match &config.sync_url {
            Some(url) => {
                info!(%url, "note sync enabled");
                Arc::new(HttpNoteSync::new(url.clone())?)
            }
            None => {
                info!("note sync disabled (set NOTES_SYNC_URL to enable)");
                Arc::new(DisabledSync)
            }
        };
        Ok(Self::with_parts(config, provider, sync))
    }

    pub fn with_parts(
        config: Config,
        provider: Arc<dyn SummaryProvider>,
        sync: Arc<dyn NoteSync>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            workspace: Mutex::new(Workspace::new(Local::now().date_naive())),
            provider,
            sync,
            sync_order: Mutex::new(()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

// Re-export commonly used types
pub use errors::{ProviderError, SyncError};
pub use models::{AiService, Notice, SavedNote, Settings, Template};
pub use provider::{decode_ndjson, FragmentStream, SummaryRequest};
pub use session::{SessionSnapshot, SessionState, SummarySession};
pub use summarize::{cancel_summary, drive_summary, save_summary, start_summary};
