//! The note the user is currently typing.

#[derive(Debug, Default, Clone)]
pub struct NoteDraft {
    text: String,
}

impl NoteDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Whitespace counts as content; only a truly empty draft is rejected.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
