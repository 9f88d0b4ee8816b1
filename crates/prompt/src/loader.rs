//! Prompt loader for YAML prompt overrides.
//!
//! Overrides live in `.mathtutor/prompts/<id>.yml`. When no override exists
//! the built-in tutor prompt is used.

use crate::types::{PromptDefinition, TUTOR_PROMPT_ID};
use mathtutor_core::config::STATE_DIR;
use mathtutor_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// Load a prompt definition by ID from the workspace.
///
/// # Example
/// ```no_run
/// use mathtutor_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "tutor.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Load the tutor prompt, preferring a workspace override.
///
/// A missing override is normal. A present but invalid one is an error,
/// so a typo never silently drops the guardrails the operator wrote.
pub fn load_tutor_prompt(workspace_path: &Path) -> AppResult<PromptDefinition> {
    let override_file = prompts_dir(workspace_path).join(format!("{}.yml", TUTOR_PROMPT_ID));
    if override_file.exists() {
        load_prompt(workspace_path, TUTOR_PROMPT_ID)
    } else {
        Ok(PromptDefinition::tutor_default())
    }
}

/// Validate a prompt definition.
fn validate_prompt(definition: &PromptDefinition) -> AppResult<()> {
    if definition.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if definition.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if !definition.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid API version format: {}. Expected format: X.Y",
            definition.api_version
        )));
    }

    for variable in ["question", "context"] {
        if !definition.template.contains(&format!("{{{{{}}}}}", variable)) {
            return Err(AppError::Prompt(format!(
                "Prompt template must reference {{{{{}}}}}",
                variable
            )));
        }
    }

    Ok(())
}
