//! Prompt types for the math tutor.

use serde::{Deserialize, Serialize};

/// Phrase the model must use when it answers without supplied context.
pub const FIRST_PRINCIPLES_DISCLAIMER: &str =
    "No relevant context — solving from first principles.";

/// Placeholder rendered in place of an absent context.
pub const NO_CONTEXT_PLACEHOLDER: &str = "(No relevant context)";

/// Identifier of the built-in tutor prompt.
pub const TUTOR_PROMPT_ID: &str = "tutor.answer";

const TUTOR_TEMPLATE: &str = "You are a math tutoring AI developed with strong guardrails:
- Use only math/educational content from the supplied context (trusted knowledge base or web search).
- Quote context exactly.
- If no context, say '{{disclaimer}}'
- Show step-by-step reasoning, then a succinct final answer.

Context:
{{context}}

Question:
{{question}}

Answer:
";

/// A prompt definition, built in or loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Handlebars template; receives `context`, `question` and `disclaimer`
    pub template: String,
}

impl PromptDefinition {
    /// The guarded tutor prompt used when no override exists.
    pub fn tutor_default() -> Self {
        Self {
            id: TUTOR_PROMPT_ID.to_string(),
            title: "Guarded math tutor".to_string(),
            api_version: "1.0".to_string(),
            template: TUTOR_TEMPLATE.to_string(),
        }
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered prompt text
    pub text: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Whether real context was rendered (false means the placeholder was used)
    #[serde(rename = "contextSupplied")]
    pub context_supplied: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: tutor.terse
title: Terse tutor
apiVersion: "1.0"
template: "{{context}} / {{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "tutor.terse");
        assert_eq!(def.api_version, "1.0");
        assert_eq!(def.template, "{{context}} / {{question}}");
    }

    #[test]
    fn test_default_template_carries_guardrails() {
        let def = PromptDefinition::tutor_default();
        assert_eq!(def.id, TUTOR_PROMPT_ID);
        assert!(def.template.contains("Quote context exactly"));
        assert!(def.template.contains("{{disclaimer}}"));
        assert!(def.template.contains("{{context}}"));
        assert!(def.template.contains("{{question}}"));
    }
}
