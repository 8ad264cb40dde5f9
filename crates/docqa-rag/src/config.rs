//! Configuration for the RAG system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming a TOML config file
pub const CONFIG_ENV_VAR: &str = "DOCQA_CONFIG";

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Retrieval defaults
    pub retrieval: RetrievalConfig,
    /// Answer synthesis configuration
    pub answer: AnswerConfig,
    /// On-disk storage configuration
    pub storage: StorageConfig,
    /// Source documents directory
    pub documents: DocumentsConfig,
    /// Topic tagging table
    pub tagging: TaggingConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file; missing fields take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: RagConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, then `DOCQA_CONFIG`, then defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(env_path) => Self::from_file(PathBuf::from(env_path)),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Reject settings that would break index or chunking invariants
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be > 0".to_string()));
        }
        if self.chunking.window_words == 0 {
            return Err(Error::Config("chunking.window_words must be > 0".to_string()));
        }
        if self.chunking.overlap_words >= self.chunking.window_words {
            return Err(Error::Config(format!(
                "chunking.overlap_words ({}) must be smaller than window_words ({})",
                self.chunking.overlap_words, self.chunking.window_words
            )));
        }
        if self.answer.max_results_used == 0 {
            return Err(Error::Config("answer.max_results_used must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Offline feature-hashing embedder
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend provider
    pub backend: EmbeddingBackend,
    /// Embedding dimensions, fixed for the lifetime of an index
    pub dimensions: usize,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ollama,
            dimensions: 768, // nomic-embed-text
            timeout_secs: 30,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in whitespace-delimited words
    pub window_words: usize,
    /// Words shared between consecutive windows
    pub overlap_words: usize,
    /// Chunks with fewer characters are never stored
    pub min_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_words: 300,
            overlap_words: 50,
            min_chunk_chars: 50,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Maximum new tokens per answer
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling threshold
    pub top_p: f32,
    /// Repetition penalty
    pub repetition_penalty: f32,
    /// Generation timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "phi3".to_string(),
            max_tokens: 200,
            temperature: 0.8,
            top_p: 0.9,
            repetition_penalty: 1.1,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Retrieval defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results fetched for `answer` and when a search omits `top_k`
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Answer synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// Results concatenated into the prompt / fallback
    pub max_results_used: usize,
    /// Per-result character cap inside the prompt
    pub max_context_chars: usize,
    /// Extracted answers shorter than this are rejected
    pub min_answer_chars: usize,
    /// Marker token preceding the answer in generator output
    pub answer_marker: String,
    /// Cap on the synthesized fallback text
    pub fallback_max_chars: usize,
    /// Snippet length used when a passage has no sentence terminator
    pub fallback_snippet_chars: usize,
    /// Text placed before the extracted sentences in a fallback answer
    pub fallback_preamble: String,
    /// Reply used when retrieval finds nothing
    pub no_information_message: String,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            max_results_used: 2,
            max_context_chars: 400,
            min_answer_chars: 20,
            answer_marker: "Answer:".to_string(),
            fallback_max_chars: 300,
            fallback_snippet_chars: 150,
            fallback_preamble: "Based on the retrieved documents:".to_string(),
            no_information_message:
                "I couldn't find relevant information in the knowledge base to answer your question."
                    .to_string(),
        }
    }
}

/// On-disk storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the vector and metadata files
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
            .join("docqa-rag");

        Self { data_dir }
    }
}

/// Source documents configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Directory scanned at startup and on a chat refresh
    pub dir: Option<PathBuf>,
}

/// One tag and the keywords that trigger it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRule {
    pub tag: String,
    pub keywords: Vec<String>,
}

impl TagRule {
    fn new(tag: &str, keywords: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Topic tagging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    pub rules: Vec<TagRule>,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                TagRule::new("classes", &["class", "object", "constructor", "destructor", "member function"]),
                TagRule::new("templates", &["template", "typename"]),
                TagRule::new("inheritance", &["inheritance", "derived", "base class", "virtual", "polymorphism"]),
                TagRule::new("pointers", &["pointer", "reference", "dereference", "smart pointer"]),
                TagRule::new("memory", &["memory", "heap", "stack", "new", "delete", "malloc", "free"]),
                TagRule::new("stl", &["vector", "map", "set", "algorithm", "iterator", "stl"]),
                TagRule::new("functions", &["function", "parameter", "return", "overload", "lambda"]),
                TagRule::new("operators", &["operator", "friend function"]),
                TagRule::new("exceptions", &["exception", "try", "catch", "throw"]),
                TagRule::new("modern-cpp", &["auto", "move semantics", "constexpr", "c++11", "c++14", "c++17", "c++20"]),
            ],
        }
    }
}
