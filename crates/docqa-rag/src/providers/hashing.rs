//! Deterministic offline embedder based on feature hashing

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// Hashes lower-cased word tokens into a fixed number of buckets
///
/// Each token adds +1 or -1 to one bucket, both chosen from its SHA-256
/// digest, so texts sharing vocabulary end up with high cosine similarity.
/// Needs no model or network; quality is far below a learned embedding.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let tokens = text
            .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase());

        let mut any = false;
        for token in tokens {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
            any = true;
        }

        if !any {
            return Err(Error::embedding("text contains no tokens to embed"));
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Err(Error::embedding("token hashes cancelled out"));
        }
        for val in &mut embedding {
            *val /= norm;
        }

        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.hash_embedding(text)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::index::{dot, l2_norm};

    #[tokio::test]
    async fn test_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("Classes bundle data").await.unwrap();
        let b = embedder.embed("classes BUNDLE data").await.unwrap();

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert!((l2_norm(&a) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::new(256);
        let query = embedder.embed("what is a class").await.unwrap();
        let related = embedder.embed("a class is a user defined type").await.unwrap();
        let unrelated = embedder.embed("heap allocation with malloc").await.unwrap();

        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_an_error() {
        let embedder = HashingEmbedder::new(8);
        assert!(embedder.embed("  ... ").await.is_err());
    }
}
