//! Context retrieval from the vector index.

use crate::embeddings::{embed_checked, EmbeddingProvider};
use crate::index::{CollectionSpec, VectorIndex};
use crate::rag::types::RetrievalOutcome;
use crate::types::SearchHit;
use mathtutor_core::config::RetrievalSettings;
use mathtutor_core::{AppError, AppResult};
use std::sync::Arc;

/// Embeds a query, searches the index and assembles a context.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    collection: CollectionSpec,
    top_k: usize,
    relevance_threshold: f32,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        collection: CollectionSpec,
        settings: &RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            collection,
            top_k: settings.top_k,
            relevance_threshold: settings.relevance_threshold,
        }
    }

    pub fn collection(&self) -> &CollectionSpec {
        &self.collection
    }

    /// Check the live collection against configuration.
    ///
    /// A dimension or metric mismatch is a configuration error. An
    /// unreachable index or missing collection only warns: queries will
    /// fall back to web search until it is available.
    pub async fn verify(&self) -> AppResult<()> {
        if self.embedder.dimensions() != self.collection.dimensions {
            return Err(AppError::Config(format!(
                "Embedding provider '{}' produces {} dimensions but collection '{}' is configured for {}",
                self.embedder.provider_name(),
                self.embedder.dimensions(),
                self.collection.name,
                self.collection.dimensions
            )));
        }

        match self.index.collection_info(&self.collection.name).await {
            Ok(Some(info)) => {
                self.collection.check_matches(&info)?;
                tracing::debug!(
                    "Collection '{}' ready: {} points",
                    info.name,
                    info.points_count
                );
            }
            Ok(None) => tracing::warn!(
                "Collection '{}' does not exist yet; run ingestion first",
                self.collection.name
            ),
            Err(e) => tracing::warn!("Could not inspect collection '{}': {}", self.collection.name, e),
        }
        Ok(())
    }

    /// Unfiltered nearest neighbours for a query.
    pub async fn search(&self, query: &str) -> AppResult<Vec<SearchHit>> {
        let vectors = embed_checked(self.embedder.as_ref(), &[query.to_string()]).await?;
        let vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))?;

        self.index
            .search(&self.collection.name, &vector, self.top_k)
            .await
    }

    /// Retrieve context for a query. Never fails.
    pub async fn retrieve(&self, query: &str) -> RetrievalOutcome {
        match self.search(query).await {
            Ok(hits) => {
                tracing::debug!("Search returned {} hits", hits.len());
                self.assemble_context(&hits)
            }
            Err(e @ AppError::Config(_)) => {
                tracing::error!("Retrieval misconfigured, continuing without context: {}", e);
                RetrievalOutcome::ContextEmpty
            }
            Err(e) => {
                tracing::warn!("Index query failed, continuing without context: {}", e);
                RetrievalOutcome::ContextEmpty
            }
        }
    }

    /// Filter hits by relevance and join them in index order.
    ///
    /// A hit without a score always qualifies.
    pub fn assemble_context(&self, hits: &[SearchHit]) -> RetrievalOutcome {
        let distance = self.collection.distance;
        let parts: Vec<String> = hits
            .iter()
            .filter(|hit| match hit.score {
                Some(score) => distance.is_relevant(score, self.relevance_threshold),
                None => true,
            })
            .filter_map(|hit| hit.content().render())
            .collect();

        if parts.is_empty() {
            tracing::info!(
                "No hits met the relevance threshold ({} {})",
                if distance.higher_is_better() { ">=" } else { "<=" },
                self.relevance_threshold
            );
            RetrievalOutcome::ContextEmpty
        } else {
            RetrievalOutcome::ContextFound(parts.join("\n\n"))
        }
    }
}
