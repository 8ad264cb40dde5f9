//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, DocumentRecord};
pub use query::{AnswerRequest, ChatRequest, IngestRequest, SearchRequest};
pub use response::{
    Answer, ChatResponse, IngestResponse, KnowledgeStats, RetrievalResult, SearchHit,
    SearchResponse,
};
