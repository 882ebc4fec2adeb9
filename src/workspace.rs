//! All user-facing state, owned in one place.
//!
//! Each component keeps its own invariants; the workspace only handles the
//! few operations that cross component boundaries.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::Config;
use crate::draft::NoteDraft;
use crate::errors::Result;
use crate::ids::IdClock;
use crate::models::{AiService, SavedNote, Settings, Template};
use crate::provider::SummaryRequest;
use crate::saved_notes::SavedNotesStore;
use crate::services::AiServiceRegistry;
use crate::session::{SessionSnapshot, SummarySession};
use crate::template_registry::{default_template_content, TemplateRegistry, DEFAULT_TEMPLATE_ID};

#[derive(Debug)]
pub struct Workspace {
    pub draft: NoteDraft,
    pub templates: TemplateRegistry,
    pub services: AiServiceRegistry,
    pub notes: SavedNotesStore,
    pub settings: Settings,
    pub session: SummarySession,
    pub ids: IdClock,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub draft: String,
    pub templates: Vec<Template>,
    pub selected_template_id: i64,
    pub services: Vec<AiService>,
    pub default_service_id: i64,
    pub notes: Vec<SavedNote>,
    pub settings: Settings,
    pub session: SessionSnapshot,
}

impl Workspace {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            draft: NoteDraft::new(),
            templates: TemplateRegistry::new(default_template_content(today)),
            services: AiServiceRegistry::new(),
            notes: SavedNotesStore::new(),
            settings: Settings::default(),
            session: SummarySession::new(),
            ids: IdClock::new(),
        }
    }

    /// Delete a template and fall back to the Default selection if it was
    /// the selected one.
    pub fn delete_template(&mut self, id: i64) -> Result<Template> {
        let removed = self.templates.delete(id)?;
        if self.templates.selected_id() == id {
            self.templates.select(DEFAULT_TEMPLATE_ID)?;
        }
        Ok(removed)
    }

    pub fn add_service(&mut self, name: &str, api_key: &str) -> Result<AiService> {
        Ok(self.services.add(name, api_key, &mut self.ids)?.clone())
    }

    pub fn save_note(&mut self, content: &str, title: Option<&str>) -> SavedNote {
        self.notes.save(content, title, &mut self.ids).clone()
    }

    /// Commit the finished summary as a saved note and clear the draft.
    /// `title` overrides the session title; nothing changes unless the
    /// session is `Ready`.
    pub fn save_summary(&mut self, title: Option<&str>) -> Result<SavedNote> {
        let finished = self.session.take_for_save()?;
        let title = title.or(finished.title.as_deref());
        let note = self.save_note(&finished.content, title);
        self.draft.clear();
        Ok(note)
    }

    /// Build the provider request from the current draft, template and settings.
    pub fn summary_request(&self, config: &Config) -> SummaryRequest {
        let service = self.services.default_service();
        SummaryRequest {
            base_url: config.ollama_base_url.clone(),
            model: config.model.clone(),
            temperature: self.settings.temperature,
            prompt: self.settings.prompt.clone(),
            template: self.templates.active_content().to_string(),
            note: self.draft.text().to_string(),
            api_key: Some(service.api_key.clone()).filter(|k| !k.is_empty()),
        }
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            draft: self.draft.text().to_string(),
            templates: self.templates.list().to_vec(),
            selected_template_id: self.templates.selected_id(),
            services: self.services.list().to_vec(),
            default_service_id: self.services.default_id(),
            notes: self.notes.list().to_vec(),
            settings: self.settings.clone(),
            session: self.session.snapshot(),
        }
    }
}
