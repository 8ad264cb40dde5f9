//! The RAG service: one owner for providers, store, and pipelines

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::{Error, Result};
use crate::generation::AnswerSynthesizer;
use crate::ingestion::{
    DocumentIngestor, IngestOutcome, PlainTextExtractor, TextChunker, TextExtractor, TopicTagger,
};
use crate::intent::{Intent, IntentRouter};
use crate::providers::{
    EmbeddingProvider, GenerationParams, HashingEmbedder, OllamaGenerator, OllamaProvider,
    TextGenerator,
};
use crate::retrieval::RetrievalEngine;
use crate::storage::{KnowledgeBase, PersistenceManager};
use crate::types::{Answer, ChatResponse, KnowledgeStats, RetrievalResult};

/// Retrieval-augmented question answering over an append-only corpus
///
/// Constructed once and shared behind an `Arc`; every method takes `&self`.
pub struct RagService {
    config: RagConfig,
    store: Arc<RwLock<KnowledgeBase>>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TextGenerator>,
    extractor: Arc<dyn TextExtractor>,
    ingestor: DocumentIngestor,
    retrieval: RetrievalEngine,
    synthesizer: AnswerSynthesizer,
    tagger: TopicTagger,
    router: IntentRouter,
}

impl RagService {
    /// Build the configured providers and load persisted state
    pub fn new(config: RagConfig) -> Result<Self> {
        let (embedder, generator): (Arc<dyn EmbeddingProvider>, Arc<dyn TextGenerator>) =
            match config.embeddings.backend {
                EmbeddingBackend::Ollama => {
                    let (embedder, generator) =
                        OllamaProvider::new(&config.llm, config.embeddings.dimensions)?.split();
                    (Arc::new(embedder), Arc::new(generator))
                }
                EmbeddingBackend::Hashing => (
                    Arc::new(HashingEmbedder::new(config.embeddings.dimensions)),
                    Arc::new(OllamaGenerator::new(&config.llm)?),
                ),
            };

        Self::with_providers(config, embedder, generator)
    }

    /// Build with injected providers and load persisted state
    ///
    /// A corrupt persisted pair is logged and replaced by an empty store; a
    /// persisted dimension that differs from the configured one is an error.
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        config.validate()?;

        let dimension = config.embeddings.dimensions;
        if embedder.dimensions() != dimension {
            return Err(Error::Config(format!(
                "embedder '{}' produces {} dimensions but embeddings.dimensions is {}",
                embedder.name(),
                embedder.dimensions(),
                dimension
            )));
        }

        let persistence = PersistenceManager::new(&config.storage);
        let knowledge = match persistence.load() {
            Ok(Some(kb)) if kb.dimension() != dimension => {
                return Err(Error::dimension_mismatch(dimension, kb.dimension()));
            }
            Ok(Some(kb)) => {
                tracing::info!(
                    "Loaded {} chunks from {} sources",
                    kb.len(),
                    kb.metadata().unique_sources()
                );
                kb
            }
            Ok(None) => {
                tracing::info!("No persisted state in {}, starting empty", config.storage.data_dir.display());
                KnowledgeBase::new(dimension)?
            }
            Err(Error::CorruptState(msg)) => {
                tracing::warn!("Persisted state is corrupt ({}), starting empty", msg);
                KnowledgeBase::new(dimension)?
            }
            Err(e) => return Err(e),
        };

        let store = Arc::new(RwLock::new(knowledge));
        let embed_timeout = Duration::from_secs(config.embeddings.timeout_secs);

        let ingestor = DocumentIngestor::new(
            Arc::clone(&embedder),
            TextChunker::from_config(&config.chunking),
            Arc::clone(&store),
            persistence,
            embed_timeout,
        );
        let retrieval = RetrievalEngine::new(Arc::clone(&embedder), Arc::clone(&store), embed_timeout);
        let synthesizer = AnswerSynthesizer::new(
            Arc::clone(&generator),
            GenerationParams::from_config(&config.llm),
            config.answer.clone(),
            Duration::from_secs(config.llm.timeout_secs),
        );
        let tagger = TopicTagger::from_config(&config.tagging)?;

        tracing::info!(
            "RAG service ready (embedder: {}, generator: {} / {})",
            embedder.name(),
            generator.name(),
            generator.model()
        );

        Ok(Self {
            config,
            store,
            embedder,
            generator,
            extractor: Arc::new(PlainTextExtractor::new()),
            ingestor,
            retrieval,
            synthesizer,
            router: IntentRouter::default().with_topics(tagger.clone()),
            tagger,
        })
    }

    /// Replace the extractor used by `ingest_directory`
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    /// Ingest already-extracted text; returns the number of chunks stored
    pub async fn ingest(&self, source_path: &str, raw_text: &str) -> Result<usize> {
        Ok(self.ingest_outcome(source_path, raw_text).await?.chunks_added())
    }

    /// Ingest and report whether the source was skipped as already processed
    pub async fn ingest_outcome(&self, source_path: &str, raw_text: &str) -> Result<IngestOutcome> {
        self.ingestor.ingest(source_path, raw_text).await
    }

    /// Ingest every supported, not yet processed file under `dir`
    ///
    /// Files are visited in path order. A file that cannot be read is
    /// logged and skipped. Returns the total number of chunks stored.
    pub async fn ingest_directory(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(Error::Config(format!("{} is not a directory", dir.display())));
        }

        let extractor = Arc::clone(&self.extractor);
        let files = tokio::task::spawn_blocking(move || collect_files(&dir, extractor.as_ref()))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?;

        tracing::info!("Found {} candidate files", files.len());

        let mut total = 0;
        for path in files {
            let source_path = path.display().to_string();
            if self.is_processed(&source_path) {
                continue;
            }

            let text = match self.extractor.extract(&path).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", source_path, e);
                    continue;
                }
            };

            total += self.ingest(&source_path, &text).await?;
        }

        Ok(total)
    }

    /// Top-`k` chunks for a query
    pub async fn search(&self, query: &str, k: usize) -> Vec<RetrievalResult> {
        self.retrieval.search(query, k).await
    }

    /// Grounded answer for a question
    pub async fn answer(&self, query: &str) -> Answer {
        let results = self.search(query, self.config.retrieval.top_k).await;
        self.synthesizer.answer(query, &results).await
    }

    /// Classify a chat message and reply
    pub async fn chat(&self, message: &str) -> ChatResponse {
        let intent = self.router.classify(message);

        let reply = |text: String| ChatResponse {
            intent,
            reply: text,
            sources: Vec::new(),
            used_fallback: false,
        };

        if let Some(text) = intent.canned_reply() {
            return reply(text.to_string());
        }

        match intent {
            Intent::Status => reply(format_status(&self.stats())),
            Intent::ListTopics => reply(format_topics(&self.stats())),
            Intent::Refresh => reply(self.refresh().await),
            _ => {
                let answer = self.answer(message).await;
                ChatResponse {
                    intent,
                    reply: answer.text,
                    sources: answer.sources,
                    used_fallback: answer.used_fallback,
                }
            }
        }
    }

    /// Corpus statistics
    pub fn stats(&self) -> KnowledgeStats {
        self.store.read().stats(&self.tagger)
    }

    /// Whether a source path has been ingested
    pub fn is_processed(&self, source_path: &str) -> bool {
        self.store.read().is_processed(source_path)
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Check if no chunks are stored
    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    /// Ingest the configured documents directory, if any
    ///
    /// Returns the directory and the number of chunks stored.
    pub async fn ingest_documents(&self) -> Result<Option<(PathBuf, usize)>> {
        let Some(dir) = self.config.documents.dir.clone() else {
            return Ok(None);
        };
        let added = self.ingest_directory(&dir).await?;
        Ok(Some((dir, added)))
    }

    async fn refresh(&self) -> String {
        match self.ingest_documents().await {
            Ok(Some((dir, added))) => {
                tracing::info!("Refresh of {} stored {} chunks", dir.display(), added);
                format!(
                    "Rescanned the documents directory and stored {} new chunks. {}",
                    added,
                    format_status(&self.stats())
                )
            }
            Ok(None) => "No documents directory is configured, so there is nothing to rescan.".to_string(),
            Err(e) => {
                tracing::warn!("Refresh failed: {}", e);
                "The documents directory could not be rescanned. Check the server logs for details."
                    .to_string()
            }
        }
    }
}

fn collect_files(dir: &Path, extractor: &dyn TextExtractor) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Cannot read directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| extractor.supports(path))
        .collect()
}

fn format_status(stats: &KnowledgeStats) -> String {
    format!(
        "The knowledge base holds {} chunks from {} documents across {} topics.",
        stats.total_chunks,
        stats.unique_sources,
        stats.tag_counts.len()
    )
}

fn format_topics(stats: &KnowledgeStats) -> String {
    if stats.tag_counts.is_empty() {
        return "No topics have been detected in the knowledge base yet.".to_string();
    }

    let mut topics: Vec<(&String, &usize)> = stats.tag_counts.iter().collect();
    topics.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    let listed = topics
        .iter()
        .map(|(tag, count)| format!("{} ({})", tag, count))
        .collect::<Vec<_>>()
        .join(", ");

    format!("Topics in the knowledge base: {}", listed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_topics_sorted_by_count() {
        let stats = KnowledgeStats {
            total_chunks: 5,
            unique_sources: 2,
            dimension: 8,
            tag_counts: BTreeMap::from([
                ("classes".to_string(), 1),
                ("stl".to_string(), 3),
                ("memory".to_string(), 1),
            ]),
        };

        assert_eq!(
            format_topics(&stats),
            "Topics in the knowledge base: stl (3), classes (1), memory (1)"
        );
        assert!(format_status(&stats).contains("5 chunks from 2 documents"));
    }

    #[test]
    fn test_format_topics_empty() {
        assert!(format_topics(&KnowledgeStats::default()).contains("No topics"));
    }
}
