//! Data models for the meeting notes application.
//!
//! Core records (templates, saved notes, AI services, settings), the user-visible
//! notice type, and the request/response bodies used by the HTTP handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedNote {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl SavedNote {
    /// Text placed on the clipboard when the user copies a saved note.
    pub fn clipboard_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiService {
    pub id: i64,
    pub name: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub prompt: String,
    pub temperature: f32,
}

// ============================================================================
// Notices
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// A toast shown to the user after an intent is handled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn info(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant: NoticeVariant::Default,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }
}

/// Envelope for every mutating endpoint: the resulting data plus an optional toast.
#[derive(Debug, Clone, Serialize)]
pub struct Reply<T: Serialize> {
    pub data: T,
    pub notice: Option<Notice>,
}

impl<T: Serialize> Reply<T> {
    pub fn new(data: T, notice: Notice) -> Self {
        Self {
            data,
            notice: Some(notice),
        }
    }

    pub fn quiet(data: T) -> Self {
        Self { data, notice: None }
    }
}

// ============================================================================
// Request Bodies
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateRequest {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiServiceRequest {
    pub name: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteEditRequest {
    pub title: String,
    pub content: String,
}

/// Edit the in-progress summary. Either field may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryEditRequest {
    pub text: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummarySaveRequest {
    pub title: Option<String>,
}

// ============================================================================
// Response Bodies
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct NoteEditResult {
    pub note: SavedNote,
    pub synced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub id: i64,
    pub removed: bool,
}
