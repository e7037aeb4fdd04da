//! Recommendation orchestration: retrieval, context assembly, prompt
//! rendering and the generation call.

use std::sync::Arc;

use serde::Serialize;

use crate::config::Settings;
use crate::errors::ApiError;
use crate::llm::{ChatRequest, LlmProvider};
use crate::prompts;
use crate::rag::{ContextFormatter, Retriever, SearchResult};

/// "Nothing relevant" is a first-class outcome, distinct from any error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    NoMatch,
    Answer { answer: String },
}

pub struct RecommendationService {
    retriever: Retriever,
    formatter: ContextFormatter,
    provider: Arc<dyn LlmProvider>,
    llm_model: String,
    llm_temperature: f64,
}

impl RecommendationService {
    pub fn new(
        retriever: Retriever,
        formatter: ContextFormatter,
        provider: Arc<dyn LlmProvider>,
        settings: &Settings,
    ) -> Self {
        Self {
            retriever,
            formatter,
            provider,
            llm_model: settings.llm_model.clone(),
            llm_temperature: settings.llm_temperature,
        }
    }

    /// Retrieve, assemble context, and ask the generator for a short
    /// recommendation. When nothing clears the threshold the generator is
    /// not invoked at all.
    pub async fn recommend(
        &self,
        query: &str,
        k: Option<usize>,
    ) -> Result<RecommendationOutcome, ApiError> {
        let results = self.retriever.search(query, k, None).await?;

        if results.is_empty() {
            tracing::info!(query, "no products cleared the similarity threshold");
            return Ok(RecommendationOutcome::NoMatch);
        }

        let context = self.formatter.format(&results);
        let prompt = prompts::render_recommendation_prompt(query, &context);

        let request = ChatRequest::user(prompt).with_temperature(self.llm_temperature);
        let answer = self.provider.chat(request, &self.llm_model).await?;

        Ok(RecommendationOutcome::Answer { answer })
    }

    /// Retrieval without the generator, for debugging and display callers.
    pub async fn raw_search(
        &self,
        query: &str,
        k: Option<usize>,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>, ApiError> {
        self.retriever.search(query, k, min_score).await
    }

    pub fn formatter(&self) -> &ContextFormatter {
        &self.formatter
    }
}
