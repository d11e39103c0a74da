use async_trait::async_trait;
use crate::errors::ScrapeError;
use super::types::{CompletionRequest, LLMResponse};

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// One chat completion. Invalid credentials surface as `ScrapeError::ModelAuth`,
    /// every other provider failure as `ScrapeError::Model`.
    async fn complete(&self, request: &CompletionRequest) -> Result<LLMResponse, ScrapeError>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model_name(&self) -> &str;
}
