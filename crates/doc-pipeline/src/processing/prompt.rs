//! Prompt template for document analysis

use crate::config::CONTENT_PLACEHOLDER;

/// Fixed prompt with a `{content}` slot for the document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Embed the document text into the template
    pub fn render(&self, content: &str) -> String {
        self.template.replace(CONTENT_PLACEHOLDER, content)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(crate::config::InferenceConfig::default().prompt_template)
    }
}
