//! Keyword-based topic tagging of chunk text

use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

use crate::config::{TagRule, TaggingConfig};
use crate::error::{Error, Result};

/// Compiled `(tag, pattern)` table
///
/// Each keyword matches as a whole word, case-insensitively, with an
/// optional plural suffix ("template" matches "Templates"). Multi-word
/// keywords tolerate any run of whitespace between words.
#[derive(Debug, Clone)]
pub struct TopicTagger {
    rules: Vec<(String, Regex)>,
}

impl TopicTagger {
    /// Compile the configured tag table
    pub fn from_config(config: &TaggingConfig) -> Result<Self> {
        Self::new(&config.rules)
    }

    /// Compile a tag table
    pub fn new(rules: &[TagRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .filter(|rule| !rule.keywords.is_empty())
            .map(|rule| -> Result<(String, Regex)> { Ok((rule.tag.clone(), compile_rule(rule)?)) })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Tags whose keywords occur in `text`
    pub fn tags(&self, text: &str) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|(_, pattern)| pattern.is_match(text))
            .map(|(tag, _)| tag.clone())
            .collect()
    }

    /// All tag names in table order
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(tag, _)| tag.as_str())
    }
}

fn compile_rule(rule: &TagRule) -> Result<Regex> {
    let alternatives: Vec<String> = rule.keywords.iter().map(|k| keyword_pattern(k)).collect();
    let pattern = alternatives.join("|");

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::Config(format!("invalid keywords for tag '{}': {}", rule.tag, e)))
}

fn keyword_pattern(keyword: &str) -> String {
    let body = keyword
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");

    let starts_word = keyword.chars().next().is_some_and(is_word_char);
    let ends_word = keyword.chars().last().is_some_and(is_word_char);

    format!(
        "(?:{}{}{})",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"(?:e?s)?\b" } else { "" },
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
