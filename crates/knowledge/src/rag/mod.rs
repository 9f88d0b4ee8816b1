//! Retrieval-augmented answering.
//!
//! A question flows through [`Retriever`] (vector search plus relevance
//! filter), falls back to web search when nothing qualifies, and ends in
//! [`Synthesizer`] with the guarded tutor prompt. [`Orchestrator`] sequences
//! the steps and turns every downstream failure into answer text.

pub mod orchestrator;
pub mod retriever;
pub mod synthesizer;
pub mod types;

pub use orchestrator::Orchestrator;
pub use retriever::Retriever;
pub use synthesizer::Synthesizer;
pub use types::{
    QueryRequest, QueryResponse, RequestState, RetrievalOutcome, Synthesis, EMPTY_QUERY_MESSAGE,
};
