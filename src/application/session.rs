use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::application::VectorStore;
use crate::domain::LienError;

/// A query-side view of the store pinned to the snapshot version it opened
/// against. When the stamp advances (a reindex landed), the session
/// transparently reopens before serving results.
pub struct QuerySession {
    store: Arc<dyn VectorStore>,
    opened_version: AtomicU64,
}

impl QuerySession {
    pub async fn open(store: Arc<dyn VectorStore>) -> Result<Self, LienError> {
        let version = store.current_version().await?;
        Ok(Self {
            store,
            opened_version: AtomicU64::new(version),
        })
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn opened_version(&self) -> u64 {
        self.opened_version.load(Ordering::SeqCst)
    }

    /// Reconnects when a newer snapshot exists. Returns whether a reconnect
    /// happened.
    pub async fn check_and_reconnect(&self) -> Result<bool, LienError> {
        let latest = self.store.current_version().await?;
        let opened = self.opened_version.load(Ordering::SeqCst);
        if latest <= opened {
            return Ok(false);
        }
        self.store.reconnect().await?;
        self.opened_version.store(latest, Ordering::SeqCst);
        debug!("Query session reopened at version {}", latest);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ChunkRecord;
    use crate::connector::storage::MemoryVectorStore;
    use crate::domain::{ChunkKind, ChunkMetadata, CodeChunk, Language};

    fn record(file: &str) -> ChunkRecord {
        let metadata = ChunkMetadata::new(file, 1, 2, ChunkKind::Block, Language::TypeScript);
        ChunkRecord::new(vec![1.0], CodeChunk::new("x", metadata))
    }

    #[tokio::test]
    async fn test_session_reconnects_on_new_version() {
        let store = Arc::new(MemoryVectorStore::new());
        let session = QuerySession::open(store.clone()).await.unwrap();
        assert!(!session.check_and_reconnect().await.unwrap());

        store.replace_file("a.ts", vec![record("a.ts")]).await.unwrap();

        assert!(session.check_and_reconnect().await.unwrap());
        assert_eq!(
            session.opened_version(),
            store.current_version().await.unwrap()
        );
        // A second check with no new writes is a no-op.
        assert!(!session.check_and_reconnect().await.unwrap());
    }
}
