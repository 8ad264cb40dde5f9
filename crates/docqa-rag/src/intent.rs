//! Chat message intent classification

use serde::{Deserialize, Serialize};

use crate::ingestion::TopicTagger;

/// What a chat message is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Farewell,
    Thanks,
    Help,
    /// Rescan the configured documents directory
    Refresh,
    ListTopics,
    Status,
    /// Anything else; answered from the knowledge base
    Question,
}

impl Intent {
    /// Fixed reply for purely conversational intents
    pub fn canned_reply(self) -> Option<&'static str> {
        match self {
            Intent::Greeting => Some("Hello! Ask me anything about the documents in the knowledge base."),
            Intent::Farewell => Some("Goodbye!"),
            Intent::Thanks => Some("You're welcome! Let me know if you have more questions."),
            Intent::Help => Some(
                "Ask a question in plain language and I will answer from the ingested documents. \
                 You can also ask for the list of topics, the system status, or a refresh of the \
                 documents directory.",
            ),
            Intent::Refresh | Intent::ListTopics | Intent::Status | Intent::Question => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Keywords(Vec<String>),
    /// Any topic keyword known to the tagger
    Topics(TopicTagger),
}

/// Priority-ordered matcher table; the first intent with a match wins
#[derive(Debug, Clone)]
pub struct IntentRouter {
    table: Vec<(Intent, Matcher)>,
}

impl IntentRouter {
    /// Router over a custom keyword table, checked in the given order
    pub fn new(table: Vec<(Intent, Vec<String>)>) -> Self {
        let table = table
            .into_iter()
            .map(|(intent, keywords)| {
                let keywords = keywords.iter().map(|k| normalize(k)).collect();
                (intent, Matcher::Keywords(keywords))
            })
            .collect();
        Self { table }
    }

    /// Treat messages that mention a known topic as questions
    ///
    /// The topic row goes ahead of `Status` and `ListTopics`, whose keywords
    /// ("how many", "topics") also show up in ordinary content questions.
    pub fn with_topics(mut self, tagger: TopicTagger) -> Self {
        let at = self
            .table
            .iter()
            .position(|(intent, _)| matches!(intent, Intent::Status | Intent::ListTopics))
            .unwrap_or(self.table.len());
        self.table.insert(at, (Intent::Question, Matcher::Topics(tagger)));
        self
    }

    /// Classify a message
    ///
    /// Single-word keywords must match a whole word; multi-word keywords
    /// match anywhere in the normalized text. Empty input is a greeting.
    pub fn classify(&self, message: &str) -> Intent {
        let text = normalize(message);
        if text.is_empty() {
            return Intent::Greeting;
        }

        let padded = format!(" {} ", text);
        for (intent, matcher) in &self.table {
            let hit = match matcher {
                Matcher::Keywords(keywords) => keywords.iter().any(|k| {
                    if k.contains(' ') {
                        text.contains(k.as_str())
                    } else {
                        padded.contains(&format!(" {} ", k))
                    }
                }),
                Matcher::Topics(tagger) => !tagger.tags(message).is_empty(),
            };
            if hit {
                return *intent;
            }
        }

        Intent::Question
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        let row = |intent: Intent, keywords: &[&str]| {
            (intent, keywords.iter().map(|k| k.to_string()).collect::<Vec<_>>())
        };

        Self::new(vec![
            row(Intent::Farewell, &["bye", "goodbye", "see you", "exit", "quit"]),
            row(Intent::Thanks, &["thanks", "thank", "thank you", "thx"]),
            row(Intent::Help, &["help", "what can you do", "abilities"]),
            row(Intent::Refresh, &["refresh", "reload", "rescan"]),
            row(Intent::Status, &["status", "statistics", "stats", "how many"]),
            row(Intent::ListTopics, &["topics", "all concepts", "list concepts"]),
            row(Intent::Greeting, &["hello", "hi", "hey", "greetings"]),
        ])
    }
}

/// Lowercase, replace punctuation with spaces, collapse whitespace
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '+' || c == '#' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
