//! Extractive fallback answers built from retrieved passages

use super::prompt::truncate_chars;

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// First sentence of `text` including its terminator, or its first
/// `snippet_chars` characters when there is no terminator
pub fn first_sentence(text: &str, snippet_chars: usize) -> String {
    let text = text.trim();

    if let Some(pos) = text.find(SENTENCE_TERMINATORS) {
        let sentence = text[..=pos].trim();
        // a bare terminator is not a sentence
        if sentence.chars().count() > 1 {
            return sentence.to_string();
        }
    }

    text.chars().take(snippet_chars).collect::<String>().trim().to_string()
}

/// Preamble followed by the first sentence of each passage, capped to
/// `max_chars` with `...`
pub fn synthesize<'a>(
    preamble: &str,
    passages: impl IntoIterator<Item = &'a str>,
    snippet_chars: usize,
    max_chars: usize,
) -> String {
    let key_points: Vec<String> = passages
        .into_iter()
        .map(|p| first_sentence(p, snippet_chars))
        .filter(|s| !s.is_empty())
        .collect();

    let text = if preamble.is_empty() {
        key_points.join(" ")
    } else {
        format!("{} {}", preamble, key_points.join(" "))
    };

    truncate_chars(text.trim(), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sentence_with_terminator() {
        assert_eq!(
            first_sentence("  Classes bundle state. They also bundle behavior.", 150),
            "Classes bundle state."
        );
        assert_eq!(first_sentence("Is it? Yes.", 150), "Is it?");
    }

    #[test]
    fn test_first_sentence_without_terminator() {
        let text = "x".repeat(200);
        assert_eq!(first_sentence(&text, 150).len(), 150);
        assert_eq!(first_sentence("no terminator here", 150), "no terminator here");
    }

    #[test]
    fn test_leading_terminator_falls_back_to_snippet() {
        assert_eq!(first_sentence(". leading dot", 5), ". lea");
    }

    #[test]
    fn test_synthesize_joins_and_prefixes() {
        let text = synthesize(
            "Based on the retrieved documents:",
            ["First fact. More.", "Second fact! Tail"],
            150,
            300,
        );
        assert_eq!(text, "Based on the retrieved documents: First fact. Second fact!");
    }

    #[test]
    fn test_synthesize_capped() {
        let long = "word ".repeat(100);
        let text = synthesize("Summary:", [long.as_str()], 150, 50);

        assert!(text.ends_with("..."));
        assert_eq!(text.chars().count(), 53);
    }
}
