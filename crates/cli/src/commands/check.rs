//! Check command handler.

use crate::services;
use clap::Args;
use mathtutor_core::{config::AppConfig, AppResult};
use mathtutor_llm::LlmRequest;

const CHECK_PROMPT: &str = "Say hello world!";

/// Verify the language model credential
#[derive(Args, Debug)]
pub struct CheckCommand {}

impl CheckCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing check command");

        let client = services::llm_client(config)?;
        let request = LlmRequest::new(CHECK_PROMPT, config.llm.model.clone());
        let response = client.complete(&request).await?;

        tracing::debug!(
            "Token usage - Prompt: {}, Completion: {}, Total: {}",
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            response.usage.total_tokens
        );
        println!("{} ({}): {}", client.provider_name(), response.model, response.content.trim());
        Ok(())
    }
}
