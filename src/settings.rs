//! LLM settings: the instruction prompt and sampling temperature.

use crate::errors::{NotesError, Result};
use crate::models::Settings;

pub const DEFAULT_PROMPT: &str = "You are a helpful assistant. Generate a meeting minute summary but capture most of the content and expand on topics as needed. Do not use markdown or ** in the output. If there are abbreviations like AS, PS, HW, etc., leave them as is without changes.";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

impl Default for Settings {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Settings {
    pub fn update(&mut self, prompt: String, temperature: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(NotesError::validation(format!(
                "Temperature must be between 0 and 1, got {}",
                temperature
            )));
        }
        self.prompt = prompt;
        self.temperature = temperature;
        Ok(())
    }
}

/// Join the user prompt, template and note into the text sent to the model.
pub fn compose_prompt(prompt: &str, template: &str, note: &str) -> String {
    format!(
        "{}\n\nUse the following template for the summary:\n\n{}\n\nInput text:\n{}",
        prompt, template, note
    )
}
