//! Grounded answer synthesis with extractive fallback

use std::sync::Arc;
use std::time::Duration;

use crate::config::AnswerConfig;
use crate::error::{Error, Result};
use crate::providers::{GenerationParams, TextGenerator};
use crate::types::{Answer, RetrievalResult};

use super::extraction::{extract_answer, passes_quality_gate};
use super::fallback;
use super::prompt::PromptBuilder;

/// Builds prompts, calls the generator, and validates what comes back
///
/// Generator failures never reach the caller: an error, a timeout, or an
/// answer that fails the quality gate all produce an extractive fallback.
pub struct AnswerSynthesizer {
    generator: Arc<dyn TextGenerator>,
    prompt: PromptBuilder,
    params: GenerationParams,
    config: AnswerConfig,
    timeout: Duration,
}

impl AnswerSynthesizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        params: GenerationParams,
        config: AnswerConfig,
        timeout: Duration,
    ) -> Self {
        let prompt = PromptBuilder::new(
            config.max_results_used,
            config.max_context_chars,
            config.answer_marker.clone(),
        );

        Self {
            generator,
            prompt,
            params,
            config,
            timeout,
        }
    }

    /// Answer `query` from already-retrieved results
    pub async fn answer(&self, query: &str, results: &[RetrievalResult]) -> Answer {
        if results.is_empty() {
            return Answer::not_found(self.config.no_information_message.clone());
        }

        let used = &results[..results.len().min(self.config.max_results_used)];
        let sources = unique_sources(used);
        let prompt = self.prompt.build(query, used);

        tracing::debug!("Prompt length: {} chars, {} sources", prompt.len(), used.len());

        match self.generate(&prompt).await {
            Ok(raw) => {
                let (state, text) = extract_answer(&raw, &prompt, self.prompt.marker());
                tracing::debug!("Extracted answer via {:?}", state);

                if passes_quality_gate(&text, self.config.min_answer_chars) {
                    return Answer {
                        text,
                        sources,
                        used_fallback: false,
                    };
                }
                tracing::info!("Generated answer too short ({} chars), using fallback", text.chars().count());
            }
            Err(e) => {
                tracing::warn!("Generation failed, using fallback: {}", e);
            }
        }

        Answer {
            text: self.fallback_text(used),
            sources,
            used_fallback: true,
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.generator.generate(prompt, &self.params)).await {
            Ok(result) => result,
            Err(_) => Err(Error::generation(format!(
                "generation timed out after {:?}",
                self.timeout
            ))),
        }
    }

    fn fallback_text(&self, used: &[RetrievalResult]) -> String {
        fallback::synthesize(
            &self.config.fallback_preamble,
            used.iter().map(|r| r.chunk.text.as_str()),
            self.config.fallback_snippet_chars,
            self.config.fallback_max_chars,
        )
    }
}

/// Source paths in first-seen order without duplicates
fn unique_sources(results: &[RetrievalResult]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for result in results {
        if !sources.contains(&result.chunk.source_path) {
            sources.push(result.chunk.source_path.clone());
        }
    }
    sources
}
