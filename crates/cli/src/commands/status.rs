//! Status command handler.

use crate::services::Store;
use clap::Args;
use mathtutor_core::{config::AppConfig, AppResult};

/// Show the knowledge base collection
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing status command");

        let store = Store::connect(config).await?;
        let info = store.index.collection_info(&store.collection.name).await?;

        if self.json {
            let output = serde_json::json!({
                "backend": store.index.backend_name(),
                "collection": store.collection.name,
                "exists": info.is_some(),
                "info": info,
                "embedding": {
                    "provider": store.embedder.provider_name(),
                    "model": store.embedder.model_name(),
                    "dimensions": store.embedder.dimensions(),
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Backend:    {}", store.index.backend_name());
        println!(
            "Embedding:  {} {} ({} dims)",
            store.embedder.provider_name(),
            store.embedder.model_name(),
            store.embedder.dimensions()
        );
        match info {
            Some(info) => {
                println!("Collection: {}", info.name);
                println!("Dimensions: {}", info.dimensions);
                println!("Distance:   {}", info.distance);
                println!("Points:     {}", info.points_count);
                if let Err(e) = store.collection.check_matches(&info) {
                    println!("MISMATCH:   {}", e);
                }
            }
            None => println!(
                "Collection '{}' does not exist; run 'mathtutor ingest'",
                store.collection.name
            ),
        }

        Ok(())
    }
}
