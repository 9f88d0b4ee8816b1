//! Test doubles for the query and ingestion pipelines.

use crate::embeddings::EmbeddingProvider;
use crate::index::{CollectionInfo, CollectionSpec, Distance, SqliteIndex, VectorIndex};
use crate::rag::{Orchestrator, Retriever, Synthesizer};
use crate::search::FallbackSearch;
use crate::types::{IndexedPoint, SearchHit};
use async_trait::async_trait;
use mathtutor_core::config::{LlmSettings, RetrievalSettings};
use mathtutor_core::{AppError, AppResult};
use mathtutor_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use mathtutor_prompt::PromptDefinition;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DIMS: usize = 4;

pub fn collection() -> CollectionSpec {
    CollectionSpec {
        name: "math_qa".to_string(),
        dimensions: DIMS,
        distance: Distance::Cosine,
    }
}

/// Embedder driven by a closure, counting calls.
pub struct FnEmbedder {
    dimensions: usize,
    embed_fn: Box<dyn Fn(&str) -> Vec<f32> + Send + Sync>,
    calls: AtomicUsize,
    fail_on: HashSet<usize>,
}

impl FnEmbedder {
    pub fn new(embed_fn: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static) -> Self {
        Self {
            dimensions: DIMS,
            embed_fn: Box::new(embed_fn),
            calls: AtomicUsize::new(0),
            fail_on: HashSet::new(),
        }
    }

    /// Time out on the chosen calls (1-based).
    pub fn failing_on(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.fail_on = calls.into_iter().collect();
        self
    }

    /// Arithmetic questions land on one axis, everything else on another.
    pub fn arithmetic() -> Self {
        Self::new(|text| {
            if text.contains("2+2") {
                vec![1.0, 0.0, 0.0, 0.0]
            } else {
                vec![0.0, 1.0, 0.0, 0.0]
            }
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for FnEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnEmbedder")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[async_trait]
impl EmbeddingProvider for FnEmbedder {
    fn provider_name(&self) -> &str {
        "fn"
    }

    fn model_name(&self) -> &str {
        "fn-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(AppError::Embedding("ollama timed out".to_string()));
        }
        Ok(texts.iter().map(|t| (self.embed_fn)(t)).collect())
    }
}

/// Index whose every call fails, as if the server were down.
pub struct FailingIndex;

fn unreachable() -> AppError {
    AppError::Index("connection refused".to_string())
}

#[async_trait]
impl VectorIndex for FailingIndex {
    fn backend_name(&self) -> &str {
        "failing"
    }

    async fn collection_exists(&self, _name: &str) -> AppResult<bool> {
        Err(unreachable())
    }

    async fn delete_collection(&self, _name: &str) -> AppResult<()> {
        Err(unreachable())
    }

    async fn create_collection(&self, _spec: &CollectionSpec) -> AppResult<()> {
        Err(unreachable())
    }

    async fn upsert(&self, _collection: &str, _points: &[IndexedPoint]) -> AppResult<()> {
        Err(unreachable())
    }

    async fn search(
        &self,
        _collection: &str,
        _vector: &[f32],
        _limit: usize,
    ) -> AppResult<Vec<SearchHit>> {
        Err(unreachable())
    }

    async fn collection_info(&self, _name: &str) -> AppResult<Option<CollectionInfo>> {
        Err(unreachable())
    }
}

/// SQLite index that rejects chosen upsert calls (1-based).
pub struct FlakyIndex {
    inner: SqliteIndex,
    fail_on: HashSet<usize>,
    upserts: AtomicUsize,
}

impl FlakyIndex {
    pub fn new(fail_on: impl IntoIterator<Item = usize>) -> Self {
        Self {
            inner: SqliteIndex::open_in_memory().unwrap(),
            fail_on: fail_on.into_iter().collect(),
            upserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    fn backend_name(&self) -> &str {
        "flaky"
    }

    async fn collection_exists(&self, name: &str) -> AppResult<bool> {
        self.inner.collection_exists(name).await
    }

    async fn delete_collection(&self, name: &str) -> AppResult<()> {
        self.inner.delete_collection(name).await
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> AppResult<()> {
        self.inner.create_collection(spec).await
    }

    async fn upsert(&self, collection: &str, points: &[IndexedPoint]) -> AppResult<()> {
        let call = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(AppError::Index(format!("upsert {} timed out", call)));
        }
        self.inner.upsert(collection, points).await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> AppResult<Vec<SearchHit>> {
        self.inner.search(collection, vector, limit).await
    }

    async fn collection_info(&self, name: &str) -> AppResult<Option<CollectionInfo>> {
        self.inner.collection_info(name).await
    }
}

/// LLM that records prompts and answers through a closure.
pub struct RecordingLlm {
    reply: Box<dyn Fn(&str) -> String + Send + Sync>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    pub fn new(reply: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(LlmResponse {
            content: format!("  {}\n", (self.reply)(&request.prompt)),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
            finish_reason: Some("STOP".to_string()),
        })
    }
}

/// LLM that always fails.
pub struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Llm("429 quota exceeded".to_string()))
    }
}

/// Fallback search with fixed text, counting calls.
pub struct CountingFallback {
    text: String,
    calls: AtomicUsize,
}

impl CountingFallback {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackSearch for CountingFallback {
    fn provider_name(&self) -> &str {
        "counting"
    }

    async fn fetch_snippets(&self, _query: &str) -> AppResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.text.clone()])
    }
}

pub fn write_corpus(dir: &Path, name: &str, json: &str) {
    std::fs::write(dir.join(name), json).unwrap();
}

pub fn orchestrator(
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    fallback: Arc<dyn FallbackSearch>,
    llm: Arc<dyn LlmClient>,
) -> Orchestrator {
    let retriever = Retriever::new(embedder, index, collection(), &RetrievalSettings::default());
    let synthesizer = Synthesizer::new(
        llm,
        PromptDefinition::tutor_default(),
        &LlmSettings::default(),
    );
    Orchestrator::new(retriever, fallback, synthesizer)
}
