//! Summary session state machine.
//!
//! A session moves `Idle -> Requesting -> Streaming -> Ready` and back to
//! `Idle` on save, cancel or failure. Every start issues a fresh
//! [`SessionTicket`]; transitions driven by the streaming task carry their
//! ticket and are ignored once it is stale, so a cancelled or superseded
//! request can never touch the buffer again.

use serde::Serialize;

use crate::errors::{NotesError, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Requesting,
    Streaming,
    Ready,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Requesting => "requesting",
            SessionState::Streaming => "streaming",
            SessionState::Ready => "ready",
        }
    }

    /// A provider request is outstanding.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Requesting | SessionState::Streaming)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of one started session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionTicket(pub u64);

/// What `start` displaced, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Displaced {
    Nothing,
    /// An in-flight request was implicitly cancelled.
    Cancelled(SessionTicket),
    /// A finished but unsaved summary was discarded.
    Discarded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub generation: u64,
    pub buffer: String,
    pub title: String,
    pub last_error: Option<String>,
}

/// Content and title handed to the saved notes store.
#[derive(Debug, Clone, PartialEq)]
pub struct Finished {
    pub content: String,
    pub title: Option<String>,
}

#[derive(Debug, Default)]
pub struct SummarySession {
    state: SessionState,
    generation: u64,
    buffer: String,
    title: String,
    last_error: Option<String>,
}

impl SummarySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            generation: self.generation,
            buffer: self.buffer.clone(),
            title: self.title.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn is_current(&self, ticket: SessionTicket) -> bool {
        ticket.0 == self.generation
    }

    fn reset_to_idle(&mut self) {
        self.state = SessionState::Idle;
        self.buffer.clear();
        self.title.clear();
    }

    // ------------------------------------------------------------------------
    // User intents
    // ------------------------------------------------------------------------

    /// Begin a new session for `draft`. An empty draft is rejected and
    /// nothing changes.
    pub fn start(&mut self, draft: &str) -> Result<(SessionTicket, Displaced)> {
        if draft.is_empty() {
            return Err(NotesError::validation(
                "Please enter some content to summarize.",
            ));
        }

        let displaced = match self.state() {
            SessionState::Idle => Displaced::Nothing,
            SessionState::Ready => Displaced::Discarded,
            SessionState::Requesting | SessionState::Streaming => {
                Displaced::Cancelled(SessionTicket(self.generation))
            }
        };

        self.generation += 1;
        self.buffer.clear();
        self.title.clear();
        self.last_error = None;
        self.state = SessionState::Requesting;

        Ok((SessionTicket(self.generation), displaced))
    }

    /// Stop the current session and drop its buffer. Returns the ticket that
    /// was cancelled, or `None` when there was nothing to cancel.
    pub fn cancel(&mut self) -> Option<SessionTicket> {
        if self.state() == SessionState::Idle {
            return None;
        }
        let ticket = SessionTicket(self.generation);
        // Bump the generation so the streaming task sees its ticket go stale.
        self.generation += 1;
        self.reset_to_idle();
        Some(ticket)
    }

    /// Replace the buffer with user text. Only a finished summary is editable.
    pub fn edit(&mut self, text: &str) -> Result<()> {
        if self.state() != SessionState::Ready {
            return Err(NotesError::InvalidTransition {
                action: "edit",
                state: self.state().as_str(),
            });
        }
        self.buffer = text.to_string();
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        if self.state() == SessionState::Idle {
            return Err(NotesError::InvalidTransition {
                action: "set a title",
                state: self.state().as_str(),
            });
        }
        self.title = title.to_string();
        Ok(())
    }

    /// Take the finished summary out of the session, returning to `Idle`.
    pub fn take_for_save(&mut self) -> Result<Finished> {
        if self.state() != SessionState::Ready {
            return Err(NotesError::InvalidTransition {
                action: "save",
                state: self.state().as_str(),
            });
        }
        let content = std::mem::take(&mut self.buffer);
        let title = std::mem::take(&mut self.title);
        self.reset_to_idle();
        Ok(Finished {
            content,
            title: Some(title).filter(|t| !t.trim().is_empty()),
        })
    }

    // ------------------------------------------------------------------------
    // Provider-driven transitions
    // ------------------------------------------------------------------------

    /// The provider accepted the request and a fragment stream is open.
    pub fn begin_streaming(&mut self, ticket: SessionTicket) -> bool {
        if !self.is_current(ticket) || self.state() != SessionState::Requesting {
            return false;
        }
        self.state = SessionState::Streaming;
        true
    }

    pub fn push_fragment(&mut self, ticket: SessionTicket, fragment: &str) -> bool {
        if !self.is_current(ticket) || self.state() != SessionState::Streaming {
            return false;
        }
        self.buffer.push_str(fragment);
        true
    }

    pub fn finish(&mut self, ticket: SessionTicket) -> bool {
        if !self.is_current(ticket) || !self.state().is_active() {
            return false;
        }
        self.state = SessionState::Ready;
        true
    }

    pub fn fail(&mut self, ticket: SessionTicket, error: &str) -> bool {
        if !self.is_current(ticket) || !self.state().is_active() {
            return false;
        }
        self.last_error = Some(error.to_string());
        self.reset_to_idle();
        true
    }
}
