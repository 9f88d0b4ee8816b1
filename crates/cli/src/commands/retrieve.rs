//! Retrieve command handler.

use crate::services::Store;
use clap::Args;
use mathtutor_core::{config::AppConfig, AppResult};

/// Show raw index hits for a query, without the relevance filter
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// Query text
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RetrieveCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let query = self.query.join(" ");
        tracing::info!("Executing retrieve command");

        let retriever = Store::connect(config).await?.retriever(config);
        let hits = retriever.search(&query).await?;
        let distance = retriever.collection().distance;
        let threshold = config.retrieval.relevance_threshold;

        if self.json {
            let output: Vec<_> = hits
                .iter()
                .map(|hit| {
                    serde_json::json!({
                        "id": hit.id.to_string(),
                        "score": hit.score,
                        "relevant": hit.score.map_or(true, |s| distance.is_relevant(s, threshold)),
                        "content": hit.content().render(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        if hits.is_empty() {
            println!("No hits in collection '{}'", retriever.collection().name);
            return Ok(());
        }

        for (rank, hit) in hits.iter().enumerate() {
            let score = hit
                .score
                .map(|s| format!("{:.4}", s))
                .unwrap_or_else(|| "n/a".to_string());
            println!("#{} id={} {}={}", rank + 1, hit.id, distance, score);
            match hit.content().render() {
                Some(content) => println!("{}\n", content),
                None => println!("(empty payload)\n"),
            }
        }

        Ok(())
    }
}
