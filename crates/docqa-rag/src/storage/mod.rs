//! In-memory knowledge base and its on-disk persistence

pub mod index;
pub mod metadata;
pub mod persistence;

pub use index::{IndexRecord, VectorIndex};
pub use metadata::MetadataStore;
pub use persistence::{EncodedState, PersistenceManager};

use crate::error::Result;
use crate::ingestion::TopicTagger;
use crate::types::{Chunk, DocumentRecord, KnowledgeStats};

/// The vector index and source registry, mutated together under one lock
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    index: VectorIndex,
    metadata: MetadataStore,
}

impl KnowledgeBase {
    /// Create an empty knowledge base with a fixed dimension
    pub fn new(dimension: usize) -> Result<Self> {
        Ok(Self {
            index: VectorIndex::new(dimension)?,
            metadata: MetadataStore::new(),
        })
    }

    /// Assemble from already-validated parts
    pub fn from_parts(index: VectorIndex, metadata: MetadataStore) -> Self {
        Self { index, metadata }
    }

    /// The vector index
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// The source registry
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Index dimension
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether a source has already been ingested
    pub fn is_processed(&self, source_path: &str) -> bool {
        self.metadata.is_processed(source_path)
    }

    /// Append one vector/chunk record
    pub fn append(&mut self, vector: Vec<f32>, chunk: Chunk) -> Result<u64> {
        self.index.add(vector, chunk)
    }

    /// Register a fully ingested source
    pub fn mark_processed(&mut self, source_path: &str, record: DocumentRecord) -> bool {
        self.metadata.mark_processed(source_path, record)
    }

    /// Corpus statistics
    pub fn stats(&self, tagger: &TopicTagger) -> KnowledgeStats {
        self.metadata.stats(&self.index, tagger)
    }
}
