use serde::{Deserialize, Serialize};

/// Source text to summarize
///
/// Built once from a literal string or extracted PDF text and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Full source text
    content: String,

    /// Where the text came from (file path, "stdin", ...)
    source: Option<String>,
}

impl Document {
    /// Create a document from raw text
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
        }
    }

    /// Attach a source identifier
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Full text
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Source identifier, if any
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// True when there is no non-whitespace text
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

impl From<String> for Document {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

impl From<&str> for Document {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}
