use std::sync::Arc;

use tokio::time::timeout;

use crate::application::{Embedder, QuerySession, SearchHit};
use crate::domain::LienError;

/// Embeds a query and ranks chunks against it.
pub struct SearchCodeUseCase {
    embedder: Arc<dyn Embedder>,
    session: Arc<QuerySession>,
}

impl SearchCodeUseCase {
    pub fn new(embedder: Arc<dyn Embedder>, session: Arc<QuerySession>) -> Self {
        Self { embedder, session }
    }

    pub async fn execute(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, LienError> {
        if query.trim().is_empty() {
            return Err(LienError::invalid_input("query must not be empty"));
        }
        // Pick up any snapshot that landed since the session opened.
        self.session.check_and_reconnect().await?;

        let vector = timeout(self.embedder.timeout(), self.embedder.embed_query(query))
            .await
            .map_err(|_| LienError::embedding("query embedding timed out"))??;
        self.session.store().search(&vector, limit).await
    }
}
