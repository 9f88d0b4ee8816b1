//! LLM provider factory.
//!
//! Builds the process-scoped generative model client from configuration.
//! The client is created once at startup and shared by every request.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::ProviderType;
use mathtutor_core::config::LlmSettings;
use mathtutor_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client from settings.
///
/// # Errors
/// Returns `AppError::Config` if:
/// - Provider is unknown
/// - The provider requires an API key and none was resolved
pub fn create_client(
    settings: &LlmSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", settings.provider)))?;
    let timeout = Duration::from_secs(settings.timeout_secs);

    match provider {
        ProviderType::Gemini => {
            let key = api_key.ok_or_else(|| {
                AppError::Config(format!(
                    "Gemini provider requires API key (set {})",
                    settings.api_key_env
                ))
            })?;
            let client = match settings.endpoint.as_deref() {
                Some(endpoint) => GeminiClient::with_base_url(endpoint, key, timeout)?,
                None => GeminiClient::new(key, timeout)?,
            };
            Ok(Arc::new(client))
        }
        ProviderType::Ollama => {
            let client = match settings.endpoint.as_deref() {
                Some(endpoint) => OllamaClient::with_base_url(endpoint, timeout)?,
                None => OllamaClient::new(timeout)?,
            };
            Ok(Arc::new(client))
        }
    }
}
