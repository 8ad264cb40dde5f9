//! Request types for the HTTP surface

use serde::{Deserialize, Serialize};

/// Ingest raw text under a source path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Identifier of the source document, usually its path
    pub source_path: String,
    /// Already-extracted plain text
    pub text: String,
}

/// Semantic search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query
    pub query: String,
    /// Number of results (defaults to `retrieval.top_k`)
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Grounded answer request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// The question to answer
    pub query: String,
}

/// Chat message routed through intent classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}
