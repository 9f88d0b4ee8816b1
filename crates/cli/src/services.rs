//! Process-scoped handles shared by the commands.
//!
//! Every external client is built once here and passed down explicitly.

use mathtutor_core::{config::AppConfig, AppResult};
use mathtutor_knowledge::{
    create_fallback, create_index, create_provider, Chunker, CollectionSpec, EmbeddingProvider,
    Ingestor, Orchestrator, Retriever, Synthesizer, VectorIndex,
};
use mathtutor_llm::{create_client, LlmClient};
use mathtutor_prompt::load_tutor_prompt;
use std::sync::Arc;

/// Handles for reading from the knowledge base.
pub struct Store {
    pub collection: CollectionSpec,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
}

impl Store {
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let collection = CollectionSpec::from_config(config)?;
        let embedder = create_provider(&config.embedding).await?;
        let index = create_index(config)?;
        tracing::debug!(
            "Embedding with {} ({}), index backend {}",
            embedder.provider_name(),
            embedder.model_name(),
            index.backend_name()
        );
        Ok(Self {
            collection,
            embedder,
            index,
        })
    }

    pub fn retriever(&self, config: &AppConfig) -> Retriever {
        Retriever::new(
            self.embedder.clone(),
            self.index.clone(),
            self.collection.clone(),
            &config.retrieval,
        )
    }

    pub fn ingestor(self, config: &AppConfig) -> AppResult<Ingestor> {
        let ingestor = Ingestor::new(
            self.embedder,
            self.index,
            Chunker::from_settings(&config.ingest)?,
            self.collection,
            config.ingest.batch_size,
        )?;
        Ok(ingestor.with_lock_dir(config.locks_dir()))
    }
}

/// Generative model client, with the credential check done first.
pub fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let credentials = config.require_credentials()?;
    create_client(&config.llm, credentials.llm_api_key.as_deref())
}

/// Build the full query pipeline.
///
/// Missing credentials and a collection that disagrees with configuration
/// are fatal here, before any question is served.
pub async fn orchestrator(config: &AppConfig) -> AppResult<Orchestrator> {
    let credentials = config.require_credentials()?;
    let store = Store::connect(config).await?;

    let retriever = store.retriever(config);
    retriever.verify().await?;

    let llm = create_client(&config.llm, credentials.llm_api_key.as_deref())?;
    let fallback = create_fallback(&config.search, credentials.search_api_key.as_deref())?;
    let prompt = load_tutor_prompt(&config.workspace)?;
    tracing::debug!("Using prompt '{}'", prompt.id);

    let synthesizer = Synthesizer::new(llm, prompt, &config.llm);
    Ok(Orchestrator::new(retriever, fallback, synthesizer))
}
