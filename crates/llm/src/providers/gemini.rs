//! Google Gemini provider implementation.
//!
//! Talks to the Generative Language REST API (`models/{model}:generateContent`).

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use mathtutor_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini API request format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Gemini API response format.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    status: String,
    message: String,
}

/// Gemini LLM client.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_GEMINI_URL, api_key, timeout)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client for Gemini: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn to_gemini_request(&self, request: &LlmRequest) -> GeminiRequest {
        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(request.prompt.clone()),
                }],
            }],
            generation_config,
        }
    }

    /// Convert a Gemini response, rejecting bodies that carry no text.
    fn convert_response(&self, model: &str, response: GeminiResponse) -> AppResult<LlmResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("Gemini returned no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::Llm(format!(
                "Gemini returned an empty response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let usage = response
            .usage_metadata
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(LlmResponse {
            content: text,
            model: response.model_version.unwrap_or_else(|| model.to_string()),
            usage,
            finish_reason: candidate.finish_reason,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Gemini");
        tracing::debug!(model = %request.model, prompt_len = request.prompt.len(), "Gemini request");

        let body = self.to_gemini_request(request);

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Gemini: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(envelope) = serde_json::from_str::<GeminiErrorEnvelope>(&error_text) {
                return Err(AppError::Llm(format!(
                    "Gemini API error ({} {}): {}",
                    status, envelope.error.status, envelope.error.message
                )));
            }

            return Err(AppError::Llm(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        let converted = self.convert_response(&request.model, gemini_response)?;

        tracing::info!(
            "Received completion from Gemini ({} tokens)",
            converted.usage.total_tokens
        );

        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        let client = GeminiClient::with_base_url(
            "http://localhost:9999/",
            "k",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.endpoint("gemini-2.0-flash"),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_request_conversion() {
        let request = LlmRequest::new("Solve x+1=2", "gemini-2.0-flash").with_temperature(0.1);
        let body = serde_json::to_value(client().to_gemini_request(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Solve x+1=2");
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_response_conversion_joins_parts() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "x = "}, {"text": "1"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3, "totalTokenCount": 15}
        });
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        let response = client().convert_response("gemini-2.0-flash", parsed).unwrap();

        assert_eq!(response.content, "x = 1");
        assert_eq!(response.usage.total_tokens, 15);
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_response_without_text_is_an_error() {
        let raw = serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        });
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        let err = client()
            .convert_response("gemini-2.0-flash", parsed)
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        let parsed: GeminiResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(client().convert_response("m", parsed).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_llm_error() {
        let client =
            GeminiClient::with_base_url("http://127.0.0.1:9", "k", Duration::from_secs(2)).unwrap();
        let result = client
            .complete(&LlmRequest::new("hello", "gemini-2.0-flash"))
            .await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }
}
