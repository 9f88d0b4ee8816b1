//! Fallback web search.
//!
//! Used only when the knowledge base yields no qualifying context.
//! [`FallbackSearch::search`] never fails: empty results and provider errors
//! become fixed strings that still read sensibly as prompt context.

use async_trait::async_trait;
use mathtutor_core::config::SearchSettings;
use mathtutor_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const NO_RESULTS_MESSAGE: &str = "No relevant web search results found.";
pub const SEARCH_FAILED_MESSAGE: &str = "Web search failed or no results found.";

const STATIC_RESULTS: &str = "Web search returned related math concepts:\n\
- Basic math principles.\n\
- Guide for problem solving steps.";

#[async_trait]
pub trait FallbackSearch: Send + Sync {
    fn provider_name(&self) -> &str;

    /// Raw snippets for a query.
    async fn fetch_snippets(&self, query: &str) -> AppResult<Vec<String>>;

    /// Snippets joined by blank lines, or a fixed message.
    async fn search(&self, query: &str) -> String {
        match self.fetch_snippets(query).await {
            Ok(snippets) if snippets.is_empty() => NO_RESULTS_MESSAGE.to_string(),
            Ok(snippets) => snippets.join("\n\n"),
            Err(e) => {
                tracing::warn!("Web search via {} failed: {}", self.provider_name(), e);
                SEARCH_FAILED_MESSAGE.to_string()
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    snippet: Option<String>,
}

/// Google search through the Serper API.
pub struct SerperSearch {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl SerperSearch {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Search(format!("Failed to create HTTP client for Serper: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

fn organic_snippets(response: SerperResponse) -> Vec<String> {
    response
        .organic
        .into_iter()
        .filter_map(|result| result.snippet)
        .map(|snippet| snippet.trim().to_string())
        .filter(|snippet| !snippet.is_empty())
        .collect()
}

#[async_trait]
impl FallbackSearch for SerperSearch {
    fn provider_name(&self) -> &str {
        "serper"
    }

    async fn fetch_snippets(&self, query: &str) -> AppResult<Vec<String>> {
        tracing::debug!("Serper search for {:?}", query);

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SerperRequest { q: query })
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Failed to send request to Serper: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "Serper API error ({}): {}",
                status, body
            )));
        }

        let body: SerperResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Failed to parse Serper response: {}", e)))?;

        Ok(organic_snippets(body))
    }
}

/// Canned results for deployments without web access.
#[derive(Debug, Clone)]
pub struct StaticSearch {
    text: String,
}

impl StaticSearch {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Default for StaticSearch {
    fn default() -> Self {
        Self::new(STATIC_RESULTS)
    }
}

#[async_trait]
impl FallbackSearch for StaticSearch {
    fn provider_name(&self) -> &str {
        "static"
    }

    async fn fetch_snippets(&self, query: &str) -> AppResult<Vec<String>> {
        tracing::info!("Static web search fallback for {:?}", query);
        Ok(vec![self.text.clone()])
    }
}

/// Create the configured fallback search provider.
pub fn create_fallback(
    settings: &SearchSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn FallbackSearch>> {
    match settings.provider.to_lowercase().as_str() {
        "serper" => {
            let key = api_key.ok_or_else(|| {
                AppError::Config(format!(
                    "Serper search requires API key (set {})",
                    settings.api_key_env
                ))
            })?;
            Ok(Arc::new(SerperSearch::new(
                settings.endpoint.clone(),
                key,
                Duration::from_secs(settings.timeout_secs),
            )?))
        }
        "static" => Ok(Arc::new(StaticSearch::default())),
        other => Err(AppError::Config(format!(
            "Unknown search provider: '{}'. Supported providers: serper, static",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedSearch(AppResult<Vec<String>>);

    #[async_trait]
    impl FallbackSearch for ScriptedSearch {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn fetch_snippets(&self, _query: &str) -> AppResult<Vec<String>> {
            match &self.0 {
                Ok(snippets) => Ok(snippets.clone()),
                Err(e) => Err(AppError::Search(e.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_search_joins_snippets() {
        let search = ScriptedSearch(Ok(vec!["first".to_string(), "second".to_string()]));
        assert_eq!(search.search("q").await, "first\n\nsecond");
    }

    #[tokio::test]
    async fn test_search_empty_and_failed_messages() {
        let empty = ScriptedSearch(Ok(vec![]));
        assert_eq!(empty.search("q").await, NO_RESULTS_MESSAGE);

        let failing = ScriptedSearch(Err(AppError::Search("quota".to_string())));
        assert_eq!(failing.search("q").await, SEARCH_FAILED_MESSAGE);
    }

    #[test]
    fn test_serper_request_and_snippets() {
        assert_eq!(
            serde_json::to_value(SerperRequest { q: "2+2" }).unwrap(),
            serde_json::json!({"q": "2+2"})
        );

        let response: SerperResponse = serde_json::from_str(
            r#"{"searchParameters":{"q":"2+2"},"organic":[
                {"title":"a","snippet":"2+2 equals 4."},
                {"title":"b"},
                {"title":"c","snippet":"  "},
                {"title":"d","snippet":"Addition basics."}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            organic_snippets(response),
            vec!["2+2 equals 4.", "Addition basics."]
        );

        let response: SerperResponse = serde_json::from_str(r#"{"answerBox":{}}"#).unwrap();
        assert!(organic_snippets(response).is_empty());
    }

    #[tokio::test]
    async fn test_serper_unreachable_degrades() {
        let search =
            SerperSearch::new("http://127.0.0.1:9/search", "key", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            search.fetch_snippets("q").await,
            Err(AppError::Search(_))
        ));
        assert_eq!(search.search("q").await, SEARCH_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_static_search() {
        let search = StaticSearch::default();
        assert!(search.search("anything").await.starts_with("Web search returned"));
    }

    #[test]
    fn test_create_fallback() {
        let settings = SearchSettings::default();
        assert!(matches!(
            create_fallback(&settings, None),
            Err(AppError::Config(_))
        ));
        match create_fallback(&settings, Some("key")) {
            Ok(search) => assert_eq!(search.provider_name(), "serper"),
            Err(e) => panic!("unexpected error: {}", e),
        }

        let settings = SearchSettings {
            provider: "static".to_string(),
            ..SearchSettings::default()
        };
        match create_fallback(&settings, None) {
            Ok(search) => assert_eq!(search.provider_name(), "static"),
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}
