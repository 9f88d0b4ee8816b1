//! Embedding provider trait and factory.

use super::providers::{HashProvider, OllamaProvider};
use mathtutor_core::config::EmbeddingSettings;
use mathtutor_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "ollama", "hash")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Vector dimension D this provider is configured for
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Embed a batch and check every vector against the provider's dimension.
///
/// A wrong vector count is an embedding error. A wrong length is a
/// configuration error: the model and the configured D disagree.
pub async fn embed_checked(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> AppResult<Vec<Vec<f32>>> {
    let vectors = provider.embed_batch(texts).await?;

    if vectors.len() != texts.len() {
        return Err(AppError::Embedding(format!(
            "Provider '{}' returned {} vectors for {} texts",
            provider.provider_name(),
            vectors.len(),
            texts.len()
        )));
    }

    let expected = provider.dimensions();
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(AppError::Config(format!(
            "Embedding model '{}' produced {} dimensions, expected {}",
            provider.model_name(),
            bad.len(),
            expected
        )));
    }

    Ok(vectors)
}

/// Create an embedding provider based on settings.
///
/// Network-backed providers verify connectivity and dimension before
/// returning.
pub async fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.to_lowercase().as_str() {
        "ollama" => {
            let provider = OllamaProvider::new(settings)?;
            provider.verify_connection().await?;
            Ok(Arc::new(provider))
        }

        "hash" => Ok(Arc::new(HashProvider::new(settings.dimensions))),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, hash",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedProvider {
        dimensions: usize,
        vectors: Vec<Vec<f32>>,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "fixed-v1"
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(self.vectors.clone())
        }
    }

    #[tokio::test]
    async fn test_create_hash_provider() {
        let settings = EmbeddingSettings {
            provider: "hash".to_string(),
            dimensions: 64,
            ..EmbeddingSettings::default()
        };

        let provider = create_provider(&settings).await.unwrap();
        assert_eq!(provider.provider_name(), "hash");
        assert_eq!(provider.dimensions(), 64);

        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 64);
    }

    #[tokio::test]
    async fn test_create_unknown_provider() {
        let settings = EmbeddingSettings {
            provider: "unknown".to_string(),
            ..EmbeddingSettings::default()
        };

        let err = create_provider(&settings).await.unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_embed_checked_dimension_mismatch_is_config_error() {
        let provider = FixedProvider {
            dimensions: 3,
            vectors: vec![vec![0.0; 3], vec![0.0; 2]],
        };
        let texts = vec!["a".to_string(), "b".to_string()];

        let err = embed_checked(&provider, &texts).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_embed_checked_count_mismatch() {
        let provider = FixedProvider {
            dimensions: 3,
            vectors: vec![vec![0.0; 3]],
        };
        let texts = vec!["a".to_string(), "b".to_string()];

        let err = embed_checked(&provider, &texts).await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
    }
}
