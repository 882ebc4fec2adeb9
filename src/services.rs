//! AI service credentials with a single default entry.
//!
//! The seeded Ollama entry is permanent, so the default pointer always has
//! somewhere to fall back to.

use tracing::{debug, info};

use crate::errors::{NotesError, Result};
use crate::ids::IdClock;
use crate::models::AiService;

pub const SEEDED_SERVICE_ID: i64 = 1;
pub const SEEDED_SERVICE_NAME: &str = "Ollama";

#[derive(Debug, Clone)]
pub struct AiServiceRegistry {
    services: Vec<AiService>,
    default_id: i64,
}

impl Default for AiServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AiServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: vec![AiService {
                id: SEEDED_SERVICE_ID,
                name: SEEDED_SERVICE_NAME.to_string(),
                api_key: String::new(),
            }],
            default_id: SEEDED_SERVICE_ID,
        }
    }

    pub fn list(&self) -> &[AiService] {
        &self.services
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&AiService> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn default_id(&self) -> i64 {
        self.default_id
    }

    pub fn default_service(&self) -> &AiService {
        // The seeded entry is never removed, so index 0 always exists.
        self.get(self.default_id).unwrap_or(&self.services[0])
    }

    pub fn add(&mut self, name: &str, api_key: &str, ids: &mut IdClock) -> Result<&AiService> {
        if name.is_empty() || api_key.is_empty() {
            return Err(NotesError::validation(
                "Service name and API key are required",
            ));
        }

        let mut id = ids.next();
        while self.get(id).is_some() {
            id = ids.next();
        }
        self.services.push(AiService {
            id,
            name: name.to_string(),
            api_key: api_key.to_string(),
        });
        debug!(id, name, "AI service added");

        Ok(&self.services[self.services.len() - 1])
    }

    pub fn delete(&mut self, id: i64) -> Result<AiService> {
        if id == SEEDED_SERVICE_ID {
            return Err(NotesError::Protected(format!(
                "{} cannot be deleted",
                SEEDED_SERVICE_NAME
            )));
        }

        let index = self
            .services
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| NotesError::not_found("AI service", id))?;
        let removed = self.services.remove(index);

        if self.default_id == id {
            self.default_id = self.services[0].id;
            info!(
                removed = id,
                default = self.default_id,
                "default AI service deleted, falling back to first entry"
            );
        }

        Ok(removed)
    }

    pub fn set_default(&mut self, id: i64) -> Result<&AiService> {
        let service = self
            .services
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| NotesError::not_found("AI service", id))?;
        self.default_id = id;
        Ok(service)
    }
}
