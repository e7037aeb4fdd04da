use async_trait::async_trait;

use super::types::ChatRequest;
use crate::errors::ApiError;

/// External text capabilities the pipeline depends on: embedding and
/// generation. Both must come from the same provider instance for a given
/// index so that build-time and query-time embeddings share one vector space.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// check if the provider is healthy/reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError>;

    /// generate embeddings, one vector per input
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
