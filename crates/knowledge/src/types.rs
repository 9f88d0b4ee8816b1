//! Core knowledge base types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// One question/answer record from the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

impl KnowledgeItem {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into().trim().to_string(),
            answer: answer.into().trim().to_string(),
        }
    }

    /// The text that gets chunked and embedded.
    pub fn combined_text(&self) -> String {
        format!("Question: {}\nAnswer: {}", self.question, self.answer)
    }
}

/// A window of one item's combined text, ready to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Run-scoped id, unique only within one rebuild
    pub id: u64,
    pub text: String,
    pub source_question: String,
    pub source_answer: String,
}

/// Payload stored alongside every indexed vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub text: String,
    pub source_question: String,
    pub source_answer: String,
}

impl From<&Chunk> for PointPayload {
    fn from(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            source_question: chunk.source_question.clone(),
            source_answer: chunk.source_answer.clone(),
        }
    }
}

/// A vector plus payload, as written to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

impl IndexedPoint {
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id,
            vector,
            payload: PointPayload::from(chunk),
        }
    }
}

/// Point identifier as reported by an index.
///
/// Points written by ingestion are numeric; collections built by other
/// tools may use UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Uuid(s) => f.write_str(s),
        }
    }
}

/// A nearest-neighbour result.
///
/// `score` is whatever the index reports for its metric: a similarity for
/// cosine and dot, a distance for euclid and manhattan.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: PointId,
    pub score: Option<f32>,
    pub payload: Map<String, Value>,
}

impl SearchHit {
    pub fn content(&self) -> HitContent {
        HitContent::from_payload(&self.payload)
    }
}

const QUESTION_KEYS: [&str; 3] = ["source_question", "sourceQuestion", "Question"];
const ANSWER_KEYS: [&str; 3] = ["source_answer", "sourceAnswer", "Answer"];

/// Normalized view of a hit payload.
///
/// Empty strings and non-string values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitContent {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub text: Option<String>,
}

impl HitContent {
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            question: first_string(payload, &QUESTION_KEYS),
            answer: first_string(payload, &ANSWER_KEYS),
            text: first_string(payload, &["text"]),
        }
    }

    /// Render for inclusion in a context.
    ///
    /// The question/answer pair wins over raw text. `None` means the hit
    /// carries nothing usable.
    pub fn render(&self) -> Option<String> {
        match (&self.question, &self.answer, &self.text) {
            (Some(q), Some(a), _) => Some(format!("Question: {}\nAnswer: {}", q, a)),
            (_, _, Some(text)) => Some(format!("Text: {}", text)),
            _ => None,
        }
    }
}

fn first_string(payload: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub items: usize,
    pub chunks_created: usize,
    /// Chunks the index accepted
    pub chunks_written: usize,
    /// Chunks lost to failed batch writes
    pub chunks_discarded: usize,
    pub batches_failed: usize,
    /// Items skipped because embedding them failed
    pub items_failed: usize,
    pub duration: Duration,
}

impl IngestReport {
    pub fn is_complete(&self) -> bool {
        self.batches_failed == 0 && self.items_failed == 0
    }
}
