//! Processed-source registry and corpus statistics

use std::collections::BTreeMap;

use crate::ingestion::TopicTagger;
use crate::types::{DocumentRecord, KnowledgeStats};

use super::index::VectorIndex;

/// Registry of processed sources, keyed by source path
///
/// A `BTreeMap` keeps serialization order stable so persisted files are
/// byte-identical across saves of the same state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    documents: BTreeMap<String, DocumentRecord>,
}

impl MetadataStore {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted documents
    pub fn from_documents(documents: BTreeMap<String, DocumentRecord>) -> Self {
        Self { documents }
    }

    /// Whether a source has already been ingested
    pub fn is_processed(&self, source_path: &str) -> bool {
        self.documents.contains_key(source_path)
    }

    /// Mark a source processed; returns false if it already was
    pub fn mark_processed(&mut self, source_path: &str, record: DocumentRecord) -> bool {
        if self.is_processed(source_path) {
            return false;
        }
        self.documents.insert(source_path.to_string(), record);
        true
    }

    /// Registry entry for a source
    pub fn get(&self, source_path: &str) -> Option<&DocumentRecord> {
        self.documents.get(source_path)
    }

    /// All processed sources
    pub fn documents(&self) -> &BTreeMap<String, DocumentRecord> {
        &self.documents
    }

    /// Number of processed sources
    pub fn unique_sources(&self) -> usize {
        self.documents.len()
    }

    /// Aggregate statistics; tag counts come from `tagger` over chunk text
    pub fn stats(&self, index: &VectorIndex, tagger: &TopicTagger) -> KnowledgeStats {
        let mut tag_counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in index.records() {
            for tag in tagger.tags(&record.chunk.text) {
                *tag_counts.entry(tag).or_default() += 1;
            }
        }

        KnowledgeStats {
            total_chunks: index.len(),
            unique_sources: self.unique_sources(),
            dimension: index.dimension(),
            tag_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaggingConfig;
    use crate::types::Chunk;

    #[test]
    fn test_mark_processed_is_idempotent() {
        let mut store = MetadataStore::new();
        assert!(store.mark_processed("a.pdf", DocumentRecord::new(vec![0, 1], 900)));
        assert!(!store.mark_processed("a.pdf", DocumentRecord::new(vec![7], 10)));

        assert!(store.is_processed("a.pdf"));
        assert_eq!(store.get("a.pdf").unwrap().chunk_ordinals, vec![0, 1]);
        assert_eq!(store.unique_sources(), 1);
    }

    #[test]
    fn test_stats_counts_tags_per_chunk() {
        let tagger = TopicTagger::from_config(&TaggingConfig::default()).unwrap();
        let mut index = VectorIndex::new(2).unwrap();
        index
            .add(vec![1.0, 0.0], Chunk::new("A class has a constructor".into(), "a.pdf", 0, 40))
            .unwrap();
        index
            .add(vec![0.0, 1.0], Chunk::new("Templates use typename".into(), "b.pdf", 0, 40))
            .unwrap();

        let mut store = MetadataStore::new();
        store.mark_processed("a.pdf", DocumentRecord::new(vec![0], 40));
        store.mark_processed("b.pdf", DocumentRecord::new(vec![0], 40));

        let stats = store.stats(&index, &tagger);
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.unique_sources, 2);
        assert_eq!(stats.tag_counts.get("classes"), Some(&1));
        assert_eq!(stats.tag_counts.get("templates"), Some(&1));
    }
}
