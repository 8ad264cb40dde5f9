//! Ingestion pipeline: chunk, embed, append, persist

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::storage::{KnowledgeBase, PersistenceManager};
use crate::types::{Chunk, DocumentRecord};

use super::chunker::TextChunker;

/// Result of one `ingest` call
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// The source was already processed; nothing changed
    AlreadyProcessed,
    /// Chunks stored for the source, possibly none
    Stored(Vec<Chunk>),
}

impl IngestOutcome {
    /// Number of chunks stored by this call
    pub fn chunks_added(&self) -> usize {
        match self {
            IngestOutcome::AlreadyProcessed => 0,
            IngestOutcome::Stored(chunks) => chunks.len(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, IngestOutcome::AlreadyProcessed)
    }
}

/// Turns raw source text into stored chunk/vector records
///
/// Calls are serialized by an internal gate so two ingests never interleave
/// their appends. The store lock is only taken for the append itself;
/// embedding happens with no lock held.
pub struct DocumentIngestor {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: TextChunker,
    store: Arc<RwLock<KnowledgeBase>>,
    persistence: PersistenceManager,
    embed_timeout: Duration,
    gate: Mutex<()>,
}

impl DocumentIngestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        chunker: TextChunker,
        store: Arc<RwLock<KnowledgeBase>>,
        persistence: PersistenceManager,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            chunker,
            store,
            persistence,
            embed_timeout,
            gate: Mutex::new(()),
        }
    }

    /// Ingest one source, reporting the chunks actually stored
    ///
    /// An already-processed path is a no-op, checked under the gate so
    /// concurrent calls for one path store a single batch. A chunk whose embedding fails,
    /// times out, or has the wrong dimension is skipped; the rest continue.
    /// State is saved once at the end when anything was stored.
    pub async fn ingest(&self, source_path: &str, raw_text: &str) -> Result<IngestOutcome> {
        let _guard = self.gate.lock().await;

        if self.store.read().is_processed(source_path) {
            tracing::debug!("Skipping already processed source: {}", source_path);
            return Ok(IngestOutcome::AlreadyProcessed);
        }

        let chunks = self.chunker.chunk(source_path, raw_text);
        if chunks.is_empty() {
            tracing::info!("No chunks long enough to index in {}", source_path);
            return Ok(IngestOutcome::Stored(Vec::new()));
        }

        tracing::info!("Ingesting {} ({} chunks)", source_path, chunks.len());

        let mut stored = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = match self.embed_chunk(&chunk).await {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::warn!(
                        "Skipping chunk {} of {}: {}",
                        chunk.ordinal,
                        source_path,
                        e
                    );
                    continue;
                }
            };

            let appended = self.store.write().append(vector, chunk.clone());
            match appended {
                Ok(id) => {
                    tracing::debug!("Stored chunk {} of {} as record {}", chunk.ordinal, source_path, id);
                    stored.push(chunk);
                }
                Err(e) => {
                    tracing::warn!(
                        "Rejected chunk {} of {}: {}",
                        chunk.ordinal,
                        source_path,
                        e
                    );
                }
            }
        }

        if stored.is_empty() {
            tracing::warn!(
                "No chunks of {} could be embedded; source left unprocessed",
                source_path
            );
            return Ok(IngestOutcome::Stored(stored));
        }

        let ordinals = stored.iter().map(|c| c.ordinal).collect();
        let doc_len = raw_text.chars().count();
        self.store
            .write()
            .mark_processed(source_path, DocumentRecord::new(ordinals, doc_len));

        if let Err(e) = self.save().await {
            tracing::error!("Failed to persist state after ingesting {}: {}", source_path, e);
            return Err(e);
        }

        tracing::info!("Stored {} chunks from {}", stored.len(), source_path);
        Ok(IngestOutcome::Stored(stored))
    }

    /// Persist the current state
    ///
    /// Encoding happens under the read lock; file IO runs on the blocking
    /// pool after the lock is released.
    pub async fn save(&self) -> Result<()> {
        let state = PersistenceManager::encode(&self.store.read())?;
        let persistence = self.persistence.clone();

        tokio::task::spawn_blocking(move || persistence.write(&state))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn embed_chunk(&self, chunk: &Chunk) -> Result<Vec<f32>> {
        match tokio::time::timeout(self.embed_timeout, self.embedder.embed(&chunk.text)).await {
            Ok(result) => result,
            Err(_) => Err(Error::embedding(format!(
                "embedding timed out after {:?}",
                self.embed_timeout
            ))),
        }
    }
}
