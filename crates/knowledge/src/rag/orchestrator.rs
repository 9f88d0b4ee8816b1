//! Request orchestration: retrieval, web fallback, synthesis.

use crate::rag::retriever::Retriever;
use crate::rag::synthesizer::Synthesizer;
use crate::rag::types::{
    QueryRequest, QueryResponse, RequestState, RetrievalOutcome, EMPTY_QUERY_MESSAGE,
};
use crate::search::FallbackSearch;
use std::sync::Arc;
use tracing::instrument;

/// Answers questions.
///
/// Holds only shared, immutable handles, so one instance behind an `Arc`
/// serves any number of concurrent requests.
pub struct Orchestrator {
    retriever: Retriever,
    fallback: Arc<dyn FallbackSearch>,
    synthesizer: Synthesizer,
}

fn transition(state: RequestState) {
    tracing::debug!(%state, "Request state");
}

impl Orchestrator {
    pub fn new(
        retriever: Retriever,
        fallback: Arc<dyn FallbackSearch>,
        synthesizer: Synthesizer,
    ) -> Self {
        Self {
            retriever,
            fallback,
            synthesizer,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Handle one question. Always produces a response.
    #[instrument(name = "request", skip_all, fields(query_len = request.text.len()))]
    pub async fn handle(&self, request: QueryRequest) -> QueryResponse {
        transition(RequestState::Received);

        let query = request.text.trim();
        if query.is_empty() {
            transition(RequestState::Rejected);
            return QueryResponse {
                answer: EMPTY_QUERY_MESSAGE.to_string(),
                context: None,
            };
        }

        transition(RequestState::Retrieving);
        let context = match self.retriever.retrieve(query).await {
            RetrievalOutcome::ContextFound(context) => {
                transition(RequestState::ContextFound);
                context
            }
            RetrievalOutcome::ContextEmpty => {
                transition(RequestState::ContextEmpty);
                transition(RequestState::WebFallback);
                tracing::info!(
                    "No knowledge base context, falling back to {} search",
                    self.fallback.provider_name()
                );
                self.fallback.search(query).await
            }
        };

        transition(RequestState::Synthesizing);
        let answer = self
            .synthesizer
            .synthesize(query, Some(&context))
            .await
            .into_answer();

        transition(RequestState::Responded);
        QueryResponse {
            answer,
            context: Some(context),
        }
    }
}
