//! Text-to-vector seam used by ingestion and retrieval

use async_trait::async_trait;
use crate::error::Result;

/// Maps chunk and query text into the index's vector space
///
/// Every vector an implementation returns must have `dimensions()` entries;
/// the service refuses to start when that differs from the configured
/// index dimension. Vectors need not be normalized.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every returned vector
    fn dimensions(&self) -> usize;

    async fn health_check(&self) -> Result<bool>;

    /// Short label for logs
    fn name(&self) -> &str;
}
