//! Word-window text chunking

use crate::config::ChunkingConfig;
use crate::types::Chunk;

/// Sliding-window chunker over whitespace-delimited words
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Words per window
    window_words: usize,
    /// Words shared between consecutive windows
    overlap_words: usize,
    /// Minimum chunk size in characters
    min_chars: usize,
}

impl TextChunker {
    /// Create a new chunker
    ///
    /// `overlap_words` is clamped below `window_words` so the window always
    /// advances.
    pub fn new(window_words: usize, overlap_words: usize, min_chars: usize) -> Self {
        let window_words = window_words.max(1);
        Self {
            window_words,
            overlap_words: overlap_words.min(window_words - 1),
            min_chars,
        }
    }

    /// Create from chunking config
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.window_words, config.overlap_words, config.min_chunk_chars)
    }

    /// Words the window advances by
    pub fn stride(&self) -> usize {
        self.window_words - self.overlap_words
    }

    /// Every window of `text`, joined with single spaces, in order
    ///
    /// The last window may be shorter than `window_words`; no window starts
    /// after one that already reached the end of the text.
    pub fn windows(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut windows = Vec::new();

        let mut start = 0;
        while start < words.len() {
            let end = (start + self.window_words).min(words.len());
            windows.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += self.stride();
        }

        windows
    }

    /// Chunk a source, dropping windows below the minimum length
    ///
    /// Ordinals are window indices, so a dropped window leaves a gap.
    pub fn chunk(&self, source_path: &str, text: &str) -> Vec<Chunk> {
        let doc_len = text.chars().count();

        self.windows(text)
            .into_iter()
            .enumerate()
            .filter(|(_, window)| window.trim().chars().count() >= self.min_chars)
            .map(|(ordinal, window)| Chunk::new(window, source_path, ordinal as u32, doc_len))
            .collect()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}
