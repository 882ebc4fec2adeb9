//! Error types shared by the workspace, the summary pipeline and the HTTP layer.
//!
//! Nothing here is fatal: every variant is surfaced to the user as a notice and
//! the process keeps running.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::Notice;

// ============================================================================
// Provider / Sync Errors
// ============================================================================

/// Failure while talking to the summarization provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Model error: {0}")]
    Model(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        ProviderError::Transport(error.to_string())
    }
}

/// Failure while pushing an edited note to the persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Sync request failed: {0}")]
    Transport(String),

    #[error("Sync rejected with HTTP {0}")]
    Rejected(u16),
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        SyncError::Transport(error.to_string())
    }
}

// ============================================================================
// NotesError
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotesError {
    #[error("{0}")]
    Validation(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("{0}")]
    Protected(String),

    #[error("Cannot {action} while the summary is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl NotesError {
    pub fn validation(msg: impl Into<String>) -> Self {
        NotesError::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<i64>) -> Self {
        NotesError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            NotesError::Validation(_) | NotesError::Config(_) => StatusCode::BAD_REQUEST,
            NotesError::NotFound { .. } => StatusCode::NOT_FOUND,
            NotesError::Protected(_) => StatusCode::FORBIDDEN,
            NotesError::InvalidTransition { .. } => StatusCode::CONFLICT,
            NotesError::Provider(_) | NotesError::Sync(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for NotesError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        let body = serde_json::json!({
            "error": message,
            "notice": Notice::error(&message),
        });
        (status, Json(body)).into_response()
    }
}

pub type Result<T, E = NotesError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            NotesError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            NotesError::not_found("Template", 3u32).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            NotesError::Protected("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            NotesError::from(ProviderError::Malformed("bad".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_messages() {
        let err = NotesError::not_found("Note", 42i64);
        assert_eq!(err.to_string(), "Note 42 not found");

        let err = NotesError::InvalidTransition {
            action: "save",
            state: "streaming",
        };
        assert_eq!(err.to_string(), "Cannot save while the summary is streaming");

        let err = NotesError::from(SyncError::Rejected(500));
        assert_eq!(err.to_string(), "Sync rejected with HTTP 500");
    }
}
