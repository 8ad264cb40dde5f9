//! Provider abstractions for embeddings and text generation
//!
//! Trait-based so the service can run against a local Ollama server, the
//! offline hashing embedder, or test doubles.

pub mod embedding;
pub mod hashing;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use hashing::HashingEmbedder;
pub use llm::{GenerationParams, TextGenerator};
pub use ollama::{OllamaEmbedder, OllamaGenerator, OllamaProvider};
