//! Query path types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Answer returned for a blank question.
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a question.";

/// One user question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// The answer and the context it was built from.
///
/// `context` is `None` only when the question was rejected as blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub context: Option<String>,
}

/// What retrieval produced for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    ContextFound(String),
    /// No hit qualified, or the index could not be queried.
    ContextEmpty,
}

/// Result of asking the language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    Ok(String),
    Failed(String),
}

impl Synthesis {
    /// Displayable answer text. Failures are tagged `(Error: ...)`.
    pub fn into_answer(self) -> String {
        match self {
            Self::Ok(text) => text,
            Self::Failed(reason) => format!("(Error: {})", reason),
        }
    }
}

/// Per-request states, logged as the orchestrator moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Rejected,
    Retrieving,
    ContextFound,
    ContextEmpty,
    WebFallback,
    Synthesizing,
    Responded,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Rejected => "rejected",
            Self::Retrieving => "retrieving",
            Self::ContextFound => "context_found",
            Self::ContextEmpty => "context_empty",
            Self::WebFallback => "web_fallback",
            Self::Synthesizing => "synthesizing",
            Self::Responded => "responded",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_json_shape() {
        let response = QueryResponse {
            answer: EMPTY_QUERY_MESSAGE.to_string(),
            context: None,
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"answer":"Please enter a question.","context":null}"#
        );
    }

    #[test]
    fn test_request_from_json() {
        let request: QueryRequest = serde_json::from_str(r#"{"text":"2+2=?"}"#).unwrap();
        assert_eq!(request, QueryRequest::new("2+2=?"));
    }

    #[test]
    fn test_synthesis_failure_is_tagged() {
        assert_eq!(Synthesis::Ok("4".to_string()).into_answer(), "4");
        assert_eq!(
            Synthesis::Failed("quota exceeded".to_string()).into_answer(),
            "(Error: quota exceeded)"
        );
    }
}
