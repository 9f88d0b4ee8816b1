//! Generative model integration for the math tutor.
//!
//! A provider-agnostic `LlmClient` trait with two implementations:
//! - **Gemini**: hosted Google model (default, needs `GENAI_API_KEY`)
//! - **Ollama**: local runtime, no credential
//!
//! # Example
//! ```no_run
//! use mathtutor_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new(Duration::from_secs(30))?;
//! let request = LlmRequest::new("What is 7 * 6?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GeminiClient, OllamaClient};
pub use types::ProviderType;
