//! Answer extraction from raw generator output

/// How the answer text was located in the generator output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionState {
    /// Output began with the prompt; the remainder is the answer
    PromptEchoed,
    /// Output contained the answer marker; text after its last occurrence
    MarkerFound,
    /// Neither; the whole output is taken
    Raw,
}

/// Locate the answer in `raw`, then trim and keep the first line
pub fn extract_answer(raw: &str, prompt: &str, marker: &str) -> (ExtractionState, String) {
    let (state, body) = if let Some(rest) = raw.strip_prefix(prompt) {
        (ExtractionState::PromptEchoed, rest)
    } else if let Some(pos) = (!marker.is_empty()).then(|| raw.rfind(marker)).flatten() {
        (ExtractionState::MarkerFound, &raw[pos + marker.len()..])
    } else {
        (ExtractionState::Raw, raw)
    };

    let first_line = body.trim().lines().next().unwrap_or("").trim();
    (state, first_line.to_string())
}

/// Whether an extracted answer is long enough to return
pub fn passes_quality_gate(answer: &str, min_chars: usize) -> bool {
    !answer.is_empty() && answer.chars().count() >= min_chars
}
