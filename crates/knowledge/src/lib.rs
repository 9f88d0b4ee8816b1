//! Math question knowledge base and retrieval-augmented answering.
//!
//! Ingestion turns a corpus of question/answer JSON files into embedded,
//! overlapping chunks stored in a vector collection. Answering embeds a
//! question, keeps the hits that clear the relevance threshold, falls back
//! to web search when none do, and asks the language model for a guarded,
//! step-by-step answer.

pub mod chunker;
pub mod corpus;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod rag;
pub mod search;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::{chunk_text, Chunker};
pub use corpus::{load_corpus, Corpus};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::{create_index, CollectionInfo, CollectionSpec, Distance, VectorIndex};
pub use ingest::Ingestor;
pub use rag::{Orchestrator, QueryRequest, QueryResponse, Retriever, Synthesizer};
pub use search::{create_fallback, FallbackSearch};
pub use types::{IngestReport, KnowledgeItem, SearchHit};
