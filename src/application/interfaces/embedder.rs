use std::time::Duration;

use async_trait::async_trait;

use crate::domain::LienError;

/// Default per-call timeout for embedding inference.
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(120);

/// Generates fixed-dimension vectors from chunk text and queries.
///
/// Implementations are shared across tasks and must serialize inference
/// internally if the underlying model is not re-entrant. Callers wrap every
/// call in [`timeout`](Embedder::timeout); an exceeded timeout surfaces as a
/// retryable [`LienError::Embedding`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a batch of texts, one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LienError>;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, LienError>;

    /// The fixed dimensionality of every returned vector.
    fn dimensions(&self) -> usize;

    fn timeout(&self) -> Duration {
        DEFAULT_EMBED_TIMEOUT
    }
}
