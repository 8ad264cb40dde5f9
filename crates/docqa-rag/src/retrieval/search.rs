//! Semantic search over the knowledge base

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::storage::{index::normalize, KnowledgeBase};
use crate::types::RetrievalResult;

/// Embeds queries and ranks stored chunks by cosine similarity
pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<RwLock<KnowledgeBase>>,
    embed_timeout: Duration,
}

impl RetrievalEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<RwLock<KnowledgeBase>>,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            store,
            embed_timeout,
        }
    }

    /// Top-`k` chunks for `query`, best first
    ///
    /// A blank query, an empty index, or a failed query embedding all yield
    /// an empty list; the failure is logged rather than returned.
    pub async fn search(&self, query: &str, k: usize) -> Vec<RetrievalResult> {
        if query.trim().is_empty() || k == 0 || self.store.read().is_empty() {
            return Vec::new();
        }

        match self.try_search(query, k).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Search failed for query '{}': {}", query, e);
                Vec::new()
            }
        }
    }

    async fn try_search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        let mut query_vector =
            match tokio::time::timeout(self.embed_timeout, self.embedder.embed(query)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(Error::embedding(format!(
                        "query embedding timed out after {:?}",
                        self.embed_timeout
                    )))
                }
            };
        normalize(&mut query_vector)?;

        let store = self.store.read();
        let hits = store.index().search(&query_vector, k)?;

        let results = hits
            .into_iter()
            .filter_map(|(position, score)| {
                store.index().get(position).map(|record| RetrievalResult {
                    chunk: record.chunk.clone(),
                    score,
                })
            })
            .collect();

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::types::Chunk;

    /// Maps "x" to [1, 0] and everything else to [0, 1]
    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text == "broken" {
                return Err(Error::embedding("boom"));
            }
            Ok(if text.contains('x') { vec![2.0, 0.0] } else { vec![0.0, 3.0] })
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "axis"
        }
    }

    fn engine(records: &[(&str, Vec<f32>)]) -> RetrievalEngine {
        let mut kb = KnowledgeBase::new(2).unwrap();
        for (i, (text, v)) in records.iter().enumerate() {
            kb.append(v.clone(), Chunk::new(text.to_string(), "s.txt", i as u32, 10))
                .unwrap();
        }
        RetrievalEngine::new(
            Arc::new(AxisEmbedder),
            Arc::new(RwLock::new(kb)),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_results_ranked_and_joined() {
        let engine = engine(&[("far", vec![0.0, 1.0]), ("near", vec![1.0, 0.1])]);
        let results = engine.search("x marks", 2).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "near");
        assert!(results[0].score > results[1].score);
        assert!(results[0].score <= 1.0 + 1e-6);
    }

    #[tokio::test]
    async fn test_empty_index_and_blank_query() {
        assert!(engine(&[]).search("anything", 3).await.is_empty());
        let engine = engine(&[("a", vec![1.0, 0.0])]);
        assert!(engine.search("   ", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_yields_empty() {
        let engine = engine(&[("a", vec![1.0, 0.0])]);
        assert!(engine.search("broken", 3).await.is_empty());
    }
}
