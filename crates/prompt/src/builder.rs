//! Prompt builder for rendering the guarded tutor template.

use crate::types::{
    BuiltPrompt, BuiltPromptMetadata, PromptDefinition, FIRST_PRINCIPLES_DISCLAIMER,
    NO_CONTEXT_PLACEHOLDER,
};
use handlebars::Handlebars;
use mathtutor_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition, the user question and optional context.
///
/// Blank context is treated as absent and rendered as
/// [`NO_CONTEXT_PLACEHOLDER`], so the model sees an explicit marker rather
/// than an empty section.
///
/// # Example
/// ```
/// use mathtutor_prompt::{build_prompt, PromptDefinition};
///
/// let def = PromptDefinition::tutor_default();
/// let built = build_prompt(&def, "What is 2+2?", Some("Question: What is 2+2?\nAnswer: 4")).unwrap();
/// assert!(built.text.contains("Answer: 4"));
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    question: &str,
    context: Option<&str>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let supplied = context.map(str::trim).filter(|c| !c.is_empty());

    let mut variables = HashMap::new();
    variables.insert("question", question.trim());
    variables.insert("context", supplied.unwrap_or(NO_CONTEXT_PLACEHOLDER));
    variables.insert("disclaimer", FIRST_PRINCIPLES_DISCLAIMER);

    let text = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        text,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            context_supplied: supplied.is_some(),
        },
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<&str, &str>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
