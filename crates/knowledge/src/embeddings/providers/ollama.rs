//! Ollama Embedding Provider
//!
//! Semantic embeddings from a local Ollama runtime via the batch
//! `/api/embed` endpoint. The default model `all-minilm` yields 384
//! dimensions.
//!
//! # Example
//! ```no_run
//! use mathtutor_core::config::EmbeddingSettings;
//! use mathtutor_knowledge::embeddings::EmbeddingProvider;
//! use mathtutor_knowledge::embeddings::providers::OllamaProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OllamaProvider::new(&EmbeddingSettings::default())?;
//! provider.verify_connection().await?;
//! let embedding = provider.embed("What is 2+2?").await?;
//! assert_eq!(embedding.len(), 384);
//! # Ok(())
//! # }
//! ```

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use mathtutor_core::config::EmbeddingSettings;
use mathtutor_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Ollama API endpoint for embeddings
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBED_ENDPOINT: &str = "/api/embed";

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Upper bound on a single backoff sleep
const MAX_BACKOFF_MS: u64 = 10_000;

/// Exponential backoff before retry `attempt` (1-based), capped.
fn backoff_ms(attempt: u32) -> u64 {
    INITIAL_BACKOFF_MS
        .saturating_mul(2_u64.saturating_pow(attempt))
        .min(MAX_BACKOFF_MS)
}

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider from settings. Does not touch the network.
    pub fn new(settings: &EmbeddingSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        let base_url = settings
            .endpoint
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            max_retries: settings.max_retries.max(1),
        })
    }

    /// Verify Ollama is reachable and the model yields the configured dimension.
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn verify_connection(&self) -> AppResult<()> {
        debug!("Verifying Ollama connection at {}", self.base_url);

        let sample = vec!["test connection".to_string()];
        let embeddings = self.embed_with_retries(&sample).await.map_err(|e| {
            error!("Failed to connect to Ollama: {}", e);
            AppError::Embedding(format!(
                "Ollama not available at {}. Ensure Ollama is running and model '{}' is installed. Run: ollama pull {}",
                self.base_url, self.model, self.model
            ))
        })?;

        let got = embeddings.first().map(Vec::len).unwrap_or(0);
        if got != self.dimensions {
            return Err(AppError::Config(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model, got, self.dimensions
            )));
        }

        debug!("Ollama connection verified, model '{}' ready", self.model);
        Ok(())
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_with_retries(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;
        loop {
            match self.embed_once(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        return Err(e);
                    }
                    let delay_ms = backoff_ms(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, self.max_retries, delay_ms, e
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    async fn embed_once(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(body.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.embed_with_retries(texts).await
    }
}
