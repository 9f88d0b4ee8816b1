//! Offline knowledge base ingestion.
//!
//! One run loads the corpus, drops and recreates the collection, then
//! chunks, embeds and writes every item in fixed-size batches. An item the
//! embedder fails on and a batch the index rejects are both discarded and
//! counted; the run carries on.

pub mod batch;
pub mod lock;

pub use batch::{FlushOutcome, PointBuffer};
pub use lock::IngestLock;

use crate::chunker::Chunker;
use crate::corpus::load_corpus;
use crate::embeddings::{embed_checked, EmbeddingProvider};
use crate::index::{CollectionSpec, VectorIndex};
use crate::types::{Chunk, IndexedPoint, IngestReport, KnowledgeItem};
use mathtutor_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Items between progress log lines.
const PROGRESS_INTERVAL: usize = 50;

/// Rebuilds one collection from a corpus.
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    chunker: Chunker,
    collection: CollectionSpec,
    batch_size: usize,
    locks_dir: Option<PathBuf>,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        chunker: Chunker,
        collection: CollectionSpec,
        batch_size: usize,
    ) -> AppResult<Self> {
        if batch_size == 0 {
            return Err(AppError::Config(
                "Batch size must be greater than zero".to_string(),
            ));
        }
        if embedder.dimensions() != collection.dimensions {
            return Err(AppError::Config(format!(
                "Embedding provider '{}' produces {} dimensions but collection '{}' is configured for {}",
                embedder.provider_name(),
                embedder.dimensions(),
                collection.name,
                collection.dimensions
            )));
        }

        Ok(Self {
            embedder,
            index,
            chunker,
            collection,
            batch_size,
            locks_dir: None,
        })
    }

    /// Hold an exclusive lock file under `locks_dir` while ingesting.
    pub fn with_lock_dir(mut self, locks_dir: impl Into<PathBuf>) -> Self {
        self.locks_dir = Some(locks_dir.into());
        self
    }

    /// Ingest the corpus at `location`, replacing the collection's contents.
    ///
    /// Fails only when the corpus location is missing, the lock is held,
    /// the collection cannot be rebuilt, or the embedding model disagrees
    /// with the collection's dimension. Items that fail to embed and batches
    /// the index rejects are reported, not raised.
    pub async fn ingest(&self, location: &Path) -> AppResult<IngestReport> {
        let start = Instant::now();
        let _lock = match &self.locks_dir {
            Some(dir) => Some(IngestLock::acquire(dir, &self.collection.name)?),
            None => None,
        };

        tracing::info!(
            "Starting ingestion of {:?} into collection '{}' ({})",
            location,
            self.collection.name,
            self.index.backend_name()
        );

        let corpus = load_corpus(location)?;
        tracing::info!(
            "Loaded {} items from {} files ({} skipped)",
            corpus.items.len(),
            corpus.files_loaded,
            corpus.files_skipped
        );

        let mut report = self.ingest_items(&corpus.items).await?;
        report.files_loaded = corpus.files_loaded;
        report.files_skipped = corpus.files_skipped;
        report.duration = start.elapsed();

        if report.is_complete() {
            tracing::info!(
                "Ingestion complete: {} chunks written from {} items in {:.2?}",
                report.chunks_written,
                report.items,
                report.duration
            );
        } else {
            tracing::warn!(
                "Ingestion INCOMPLETE: {} chunks written, {} chunks lost ({} failed batches, {} items not embedded). \
                 The index is missing data; rerun ingestion once the services are healthy.",
                report.chunks_written,
                report.chunks_discarded,
                report.batches_failed,
                report.items_failed
            );
        }

        Ok(report)
    }

    /// Rebuild the collection from already-loaded items.
    pub async fn ingest_items(&self, items: &[KnowledgeItem]) -> AppResult<IngestReport> {
        let start = Instant::now();
        let mut report = IngestReport {
            items: items.len(),
            ..IngestReport::default()
        };

        self.index.recreate_collection(&self.collection).await?;

        let mut buffer = PointBuffer::new(self.batch_size);
        let mut next_id = 0u64;

        for (processed, item) in items.iter().enumerate() {
            let chunks = self.chunk_item(item, &mut next_id);
            report.chunks_created += chunks.len();

            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let vectors = match embed_checked(self.embedder.as_ref(), &texts).await {
                Ok(vectors) => vectors,
                Err(e @ AppError::Config(_)) => return Err(e),
                Err(e) => {
                    tracing::error!(
                        points_lost = chunks.len(),
                        "Embedding failed for item {}, skipping it: {}",
                        processed,
                        e
                    );
                    report.items_failed += 1;
                    report.chunks_discarded += chunks.len();
                    continue;
                }
            };

            for (chunk, vector) in chunks.iter().zip(vectors) {
                if buffer.push(IndexedPoint::from_chunk(chunk, vector)) {
                    self.flush(buffer.take_batch()).await.record(&mut report);
                }
            }

            if (processed + 1) % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Processed {}/{} items ({} chunks)",
                    processed + 1,
                    items.len(),
                    report.chunks_created
                );
            }
        }

        if !buffer.is_empty() {
            self.flush(buffer.take_batch()).await.record(&mut report);
        }

        report.duration = start.elapsed();
        Ok(report)
    }

    fn chunk_item(&self, item: &KnowledgeItem, next_id: &mut u64) -> Vec<Chunk> {
        self.chunker
            .chunk(&item.combined_text())
            .into_iter()
            .map(|text| {
                let id = *next_id;
                *next_id += 1;
                Chunk {
                    id,
                    text,
                    source_question: item.question.clone(),
                    source_answer: item.answer.clone(),
                }
            })
            .collect()
    }

    /// Write one batch. A failure discards the batch without retrying.
    async fn flush(&self, batch: Vec<IndexedPoint>) -> FlushOutcome {
        let count = batch.len();
        match self.index.upsert(&self.collection.name, &batch).await {
            Ok(()) => {
                tracing::debug!("Upserted batch of {} points", count);
                FlushOutcome::Written(count)
            }
            Err(e) => {
                tracing::error!(
                    points_lost = count,
                    "Batch upsert failed, discarding {} points: {}",
                    count,
                    e
                );
                FlushOutcome::Discarded {
                    count,
                    reason: e.to_string(),
                }
            }
        }
    }
}
