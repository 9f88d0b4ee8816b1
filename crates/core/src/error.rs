//! Error types for the math tutor.
//!
//! One enum covers every failure category in the workspace. Only
//! configuration errors are meant to stop the process; the query path turns
//! everything else into displayable text before it reaches the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the math tutor.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing credentials, invalid settings, dimension or metric mismatches
    #[error("Configuration error: {0}")]
    Config(String),

    /// The corpus location handed to ingestion does not exist
    #[error("Corpus not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    /// A single corpus file could not be parsed
    #[error("Failed to parse corpus file {}: {message}", path.display())]
    CorpusParse { path: PathBuf, message: String },

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index read/write errors
    #[error("Index error: {0}")]
    Index(String),

    /// Fallback web search errors
    #[error("Search error: {0}")]
    Search(String),

    /// Generative model errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Another ingestion run holds the collection
    #[error("Locked: {0}")]
    Locked(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
