use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::ApiError;

/// Black-box generation and embedding capability.
///
/// The answer pipeline only depends on this trait; the concrete backend
/// (an OpenAI-compatible server in production, scripted mocks in tests)
/// is decided at startup.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai-compat")
    fn name(&self) -> &str;

    /// check if the provider is healthy/reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ApiError>;

    /// generate embeddings
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
