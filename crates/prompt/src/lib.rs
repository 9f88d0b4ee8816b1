//! Prompt system for the math tutor.
//!
//! The synthesis step renders one guarded prompt: a fixed guardrail
//! preamble, the retrieved or web context and the user question. The
//! template is Handlebars and may be overridden per workspace in
//! `.mathtutor/prompts/tutor.answer.yml`.

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{load_prompt, load_tutor_prompt};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptDefinition, FIRST_PRINCIPLES_DISCLAIMER,
    NO_CONTEXT_PLACEHOLDER, TUTOR_PROMPT_ID,
};
