//! Chunk and document types with source tracking

use serde::{Deserialize, Serialize};

/// A bounded span of source text; the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content (whitespace-normalized window of words)
    pub text: String,
    /// Path of the source document
    pub source_path: String,
    /// Window index within the source (counts discarded windows too)
    pub ordinal: u32,
    /// Character length of the full source text
    pub original_doc_length: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        text: String,
        source_path: impl Into<String>,
        ordinal: u32,
        original_doc_length: usize,
    ) -> Self {
        Self {
            text,
            source_path: source_path.into(),
            ordinal,
            original_doc_length,
        }
    }

    /// Character count of the chunk text
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Registry entry for a processed source; created once, never mutated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Ordinals of the chunks stored for this source, in ingestion order
    pub chunk_ordinals: Vec<u32>,
    /// Character length of the full source text
    pub original_doc_length: usize,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl DocumentRecord {
    /// Create a record stamped with the current time
    pub fn new(chunk_ordinals: Vec<u32>, original_doc_length: usize) -> Self {
        Self {
            chunk_ordinals,
            original_doc_length,
            ingested_at: chrono::Utc::now(),
        }
    }
}
