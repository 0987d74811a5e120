//! Summarist text sources
//!
//! Literal text, plain-text files and PDF documents

pub mod pdf;

use std::path::{Path, PathBuf};
use summarist_common::{Document, Result};
use tracing::info;

/// Where the text to summarize comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    /// Text given directly
    Literal(String),
    /// UTF-8 text file
    File(PathBuf),
    /// PDF document
    Pdf(PathBuf),
}

impl TextSource {
    /// Pick the source kind from the file extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if pdf::is_pdf(&path) {
            Self::Pdf(path)
        } else {
            Self::File(path)
        }
    }

    /// Load the text as a document
    pub async fn load(&self) -> Result<Document> {
        match self {
            Self::Literal(text) => Ok(Document::new(text.as_str())),
            Self::File(path) => {
                let text = tokio::fs::read_to_string(path).await?;
                info!("Loaded {} chars from {}", text.chars().count(), path.display());
                Ok(Document::new(text).with_source(path.display().to_string()))
            }
            Self::Pdf(path) => {
                let text = pdf::extract_text(path).await?;
                Ok(Document::new(text).with_source(path.display().to_string()))
            }
        }
    }

    /// File path, if the source is a file
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Literal(_) => None,
            Self::File(path) | Self::Pdf(path) => Some(path),
        }
    }
}
