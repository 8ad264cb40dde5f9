//! Answer generation: prompt building, Ollama client, extraction, and fallback

pub mod extraction;
pub mod fallback;
pub mod ollama;
pub mod prompt;
mod synthesizer;

pub use extraction::{extract_answer, ExtractionState};
pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;
pub use synthesizer::AnswerSynthesizer;
