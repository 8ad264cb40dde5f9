//! Response types for retrieval and answers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::document::Chunk;
use crate::intent::Intent;

/// A retrieved chunk and its cosine similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// A grounded answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Single-line answer text
    pub text: String,
    /// Source paths of the results used, first-seen order, no duplicates
    pub sources: Vec<String>,
    /// True when the text was synthesized extractively instead of generated
    pub used_fallback: bool,
}

impl Answer {
    /// Answer returned when retrieval found nothing
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            sources: Vec::new(),
            used_fallback: false,
        }
    }

    /// Whether the answer is the "no information" reply
    pub fn is_not_found(&self) -> bool {
        self.sources.is_empty() && !self.used_fallback
    }
}

/// Aggregate statistics over the stored corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeStats {
    /// Stored chunk/vector records
    pub total_chunks: usize,
    /// Distinct processed source paths
    pub unique_sources: usize,
    /// Index dimension
    pub dimension: usize,
    /// Number of chunks carrying each tag
    pub tag_counts: BTreeMap<String, usize>,
}

/// Result of an ingest call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub source_path: String,
    pub chunks_added: usize,
    /// True when the source had already been processed
    pub skipped: bool,
}

/// Reply to a chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub intent: Intent,
    pub reply: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub used_fallback: bool,
}

/// One search hit as returned over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub source_path: String,
    pub chunk_ordinal: u32,
    pub text: String,
    pub score: f32,
}

impl From<RetrievalResult> for SearchHit {
    fn from(result: RetrievalResult) -> Self {
        Self {
            source_path: result.chunk.source_path,
            chunk_ordinal: result.chunk.ordinal,
            text: result.chunk.text,
            score: result.score,
        }
    }
}

/// Search results, best first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}
