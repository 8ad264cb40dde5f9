//! Raw text extraction from source files

use async_trait::async_trait;
use std::path::Path;

use crate::error::{Error, Result};

/// Turns a source file into plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor handles the file
    fn supports(&self, path: &Path) -> bool;

    /// Extract the full text of a file
    async fn extract(&self, path: &Path) -> Result<String>;
}

/// Reads UTF-8 text and markdown files as-is
#[derive(Debug, Clone)]
pub struct PlainTextExtractor {
    extensions: Vec<String>,
}

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self {
            extensions: vec!["txt".to_string(), "md".to_string()],
        }
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        if !self.supports(path) {
            return Err(Error::extraction(
                path.display().to_string(),
                "unsupported file type",
            ));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::extraction(path.display().to_string(), e.to_string()))?;

        String::from_utf8(bytes)
            .map_err(|e| Error::extraction(path.display().to_string(), e.to_string()))
    }
}
