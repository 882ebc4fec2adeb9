//! In-memory store of finalized notes.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{NotesError, Result};
use crate::ids::IdClock;
use crate::models::SavedNote;

#[derive(Debug, Default, Clone)]
pub struct SavedNotesStore {
    notes: Vec<SavedNote>,
}

impl SavedNotesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[SavedNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&SavedNote> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Append a note. A missing or blank title becomes "Note N".
    pub fn save(&mut self, content: &str, title: Option<&str>, ids: &mut IdClock) -> &SavedNote {
        self.save_at(content, title, ids, Utc::now())
    }

    pub fn save_at(
        &mut self,
        content: &str,
        title: Option<&str>,
        ids: &mut IdClock,
        now: DateTime<Utc>,
    ) -> &SavedNote {
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Note {}", self.notes.len() + 1),
        };

        let mut id = ids.next_at(now.timestamp_millis());
        while self.get(id).is_some() {
            id = ids.next_at(now.timestamp_millis());
        }

        self.notes.push(SavedNote {
            id,
            title,
            content: content.to_string(),
            created_at: now,
        });
        debug!(id, "note saved");

        &self.notes[self.notes.len() - 1]
    }

    pub fn edit(&mut self, id: i64, title: &str, content: &str) -> Result<&SavedNote> {
        let note = self
            .notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| NotesError::not_found("Note", id))?;
        note.title = title.to_string();
        note.content = content.to_string();
        debug!(id, "note edited");
        Ok(&*note)
    }

    /// Returns whether anything was removed.
    pub fn delete(&mut self, id: i64) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        self.notes.len() != before
    }
}
