//! Summary templates: an ordered list of named text skeletons with one
//! protected Default entry and a single selected template.

use chrono::NaiveDate;
use tracing::debug;

use crate::errors::{NotesError, Result};
use crate::models::Template;

pub const DEFAULT_TEMPLATE_ID: i64 = 0;
pub const DEFAULT_TEMPLATE_NAME: &str = "Default";

/// The meeting-minutes skeleton seeded as the Default template.
pub fn default_template_content(today: NaiveDate) -> String {
    format!(
        "Meeting Minutes Summary [ENTER TITLE]

Date: {}

Attendees:

[Name 1]
[Name 2]
[Name 3]

Agenda:
[Agenda Item 1]
[Agenda Item 2]
[Agenda Item 3]

Discussion Points:

[Key Point 1]
[Key Point 2]
[Key Point 3]

Action Items:

[Action Item 1] - [Responsible Person] - [Due Date]
[Action Item 2] - [Responsible Person] - [Due Date]

Next Meeting: // None if no next meeting on note
[Date and Time]

Summary of Meeting:
",
        today.format("%A, %B %-d, %Y")
    )
}

#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
    selected: i64,
}

impl TemplateRegistry {
    /// Registry holding only the Default template, selected.
    pub fn new(default_content: impl Into<String>) -> Self {
        Self {
            templates: vec![Template {
                id: DEFAULT_TEMPLATE_ID,
                name: DEFAULT_TEMPLATE_NAME.to_string(),
                content: default_content.into(),
            }],
            selected: DEFAULT_TEMPLATE_ID,
        }
    }

    pub fn list(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn add(&mut self, name: &str, content: &str) -> Result<&Template> {
        if name.is_empty() || content.is_empty() {
            return Err(NotesError::validation(
                "Template name and content are required",
            ));
        }

        let id = self.templates.iter().map(|t| t.id).max().unwrap_or(DEFAULT_TEMPLATE_ID) + 1;
        self.templates.push(Template {
            id,
            name: name.to_string(),
            content: content.to_string(),
        });
        debug!(id, name, "template added");

        Ok(&self.templates[self.templates.len() - 1])
    }

    pub fn update(&mut self, id: i64, name: &str, content: &str) -> Result<&Template> {
        if name.is_empty() || content.is_empty() {
            return Err(NotesError::validation(
                "Template name and content are required",
            ));
        }
        if id == DEFAULT_TEMPLATE_ID && name != DEFAULT_TEMPLATE_NAME {
            return Err(NotesError::Protected(
                "The Default template cannot be renamed".to_string(),
            ));
        }

        let template = self
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| NotesError::not_found("Template", id))?;
        template.name = name.to_string();
        template.content = content.to_string();
        debug!(id, "template updated");

        Ok(&*template)
    }

    /// Remove a template. Selection is left untouched; callers that removed
    /// the selected template must reselect the Default one.
    pub fn delete(&mut self, id: i64) -> Result<Template> {
        if id == DEFAULT_TEMPLATE_ID {
            return Err(NotesError::Protected(
                "The Default template cannot be deleted".to_string(),
            ));
        }

        let index = self
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| NotesError::not_found("Template", id))?;
        debug!(id, "template deleted");

        Ok(self.templates.remove(index))
    }

    pub fn select(&mut self, id: i64) -> Result<&Template> {
        let template = self
            .templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| NotesError::not_found("Template", id))?;
        self.selected = id;
        Ok(template)
    }

    pub fn selected_id(&self) -> i64 {
        self.selected
    }

    pub fn selected(&self) -> Option<&Template> {
        self.get(self.selected)
    }

    /// Content fed into the next summarization request.
    pub fn active_content(&self) -> &str {
        self.selected()
            .or_else(|| self.get(DEFAULT_TEMPLATE_ID))
            .map(|t| t.content.as_str())
            .unwrap_or("")
    }
}
