//! Embedding providers.
//!
//! One provider handle is built at startup and shared by ingestion and every
//! query. All vectors it returns must have the configured dimension D.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, embed_checked, EmbeddingProvider};
