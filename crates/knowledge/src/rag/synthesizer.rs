//! Answer synthesis with the guarded tutor prompt.

use crate::rag::types::Synthesis;
use mathtutor_core::config::LlmSettings;
use mathtutor_llm::{LlmClient, LlmRequest};
use mathtutor_prompt::{build_prompt, PromptDefinition};
use std::sync::Arc;

/// Builds the tutor prompt and asks the language model for an answer.
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompt: PromptDefinition, settings: &LlmSettings) -> Self {
        Self {
            llm,
            prompt,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    /// Answer `query` from `context`. Never fails; errors become
    /// [`Synthesis::Failed`].
    pub async fn synthesize(&self, query: &str, context: Option<&str>) -> Synthesis {
        let built = match build_prompt(&self.prompt, query, context) {
            Ok(built) => built,
            Err(e) => {
                tracing::error!("Failed to build prompt: {}", e);
                return Synthesis::Failed(e.to_string());
            }
        };

        let mut request = LlmRequest::new(built.text, self.model.clone());
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            provider = self.llm.provider_name(),
            context_supplied = built.metadata.context_supplied,
            "Requesting answer"
        );

        match self.llm.complete(&request).await {
            Ok(response) => {
                let answer = response.content.trim();
                if answer.is_empty() {
                    tracing::error!("Language model returned an empty answer");
                    Synthesis::Failed("empty response from language model".to_string())
                } else {
                    tracing::debug!(
                        prompt_tokens = response.usage.prompt_tokens,
                        completion_tokens = response.usage.completion_tokens,
                        "Answer received"
                    );
                    Synthesis::Ok(answer.to_string())
                }
            }
            Err(e) => {
                tracing::error!("Answer synthesis failed: {}", e);
                Synthesis::Failed(e.to_string())
            }
        }
    }
}
