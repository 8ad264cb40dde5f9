//! Prompt templates for grounded answer generation

use crate::types::RetrievalResult;

/// Prompt builder for answer queries
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    /// Results included as context
    max_results: usize,
    /// Per-result character cap
    max_context_chars: usize,
    /// Marker the prompt ends with
    marker: String,
}

impl PromptBuilder {
    pub fn new(max_results: usize, max_context_chars: usize, marker: impl Into<String>) -> Self {
        Self {
            max_results,
            max_context_chars,
            marker: marker.into(),
        }
    }

    /// Marker the generated answer follows
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Build context from search results, one `Source i:` block per result
    pub fn build_context(&self, results: &[RetrievalResult]) -> String {
        let mut context = String::new();

        for (i, result) in results.iter().take(self.max_results).enumerate() {
            let content = truncate_chars(&collapse_whitespace(&result.chunk.text), self.max_context_chars);
            context.push_str(&format!("Source {}: {}\n\n", i + 1, content));
        }

        context
    }

    /// Build the full prompt for a question
    pub fn build(&self, question: &str, results: &[RetrievalResult]) -> String {
        format!(
            "Here is some information from documents:\n\n{context}\nBased on this information, answer the following question: {question}\n\n{marker}",
            context = self.build_context(results),
            question = question,
            marker = self.marker,
        )
    }
}

/// Join all whitespace runs into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to `max` characters, appending `...` when anything was removed
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
