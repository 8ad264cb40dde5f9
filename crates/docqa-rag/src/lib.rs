//! docqa-rag: document question answering over a local knowledge base
//!
//! Documents are split into overlapping word windows, embedded, and stored in
//! an append-only exact vector index persisted next to its chunk metadata.
//! Questions are answered by retrieving the closest chunks and asking a text
//! generator; when generation fails or returns too little, an extractive
//! answer is assembled from the retrieved passages instead.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod intent;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod service;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use intent::{Intent, IntentRouter};
pub use service::RagService;
pub use types::{Answer, Chunk, KnowledgeStats, RetrievalResult};
