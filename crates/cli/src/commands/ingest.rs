//! Ingest command handler.
//!
//! Rebuilds the knowledge base collection from the corpus.

use crate::services::Store;
use clap::Args;
use mathtutor_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

/// Rebuild the knowledge base index from the corpus
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Corpus directory or JSON file (default: ingest.corpus from config)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let corpus = self.corpus.clone().unwrap_or_else(|| config.corpus_path());
        tracing::info!("Executing ingest command for corpus {:?}", corpus);

        let ingestor = Store::connect(config).await?.ingestor(config)?;
        let report = ingestor.ingest(&corpus).await?;

        if self.json {
            let output = serde_json::json!({
                "collection": config.index.collection,
                "filesLoaded": report.files_loaded,
                "filesSkipped": report.files_skipped,
                "items": report.items,
                "chunksCreated": report.chunks_created,
                "chunksWritten": report.chunks_written,
                "chunksDiscarded": report.chunks_discarded,
                "batchesFailed": report.batches_failed,
                "itemsFailed": report.items_failed,
                "complete": report.is_complete(),
                "durationSecs": report.duration.as_secs_f64(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Wrote {} chunks from {} items ({} files, {} skipped) in {:.2}s",
                report.chunks_written,
                report.items,
                report.files_loaded,
                report.files_skipped,
                report.duration.as_secs_f64()
            );
            if !report.is_complete() {
                println!(
                    "WARNING: {} chunks lost ({} failed batches, {} items not embedded); the index is incomplete",
                    report.chunks_discarded, report.batches_failed, report.items_failed
                );
            }
        }

        Ok(())
    }
}
