use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ScrapeError;
use crate::llm::{ExtractionClient, ModelCredentials, PlannedAction};
use crate::models::AgentState;

/// Chooses the next browser action from the latest observation.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn next_action(&self, state: &AgentState, goal: &str) -> Result<PlannedAction, ScrapeError>;
}

/// Planner backed by the language model.
pub struct LlmPlanner {
    client: Arc<ExtractionClient>,
    credentials: ModelCredentials,
}

impl LlmPlanner {
    pub fn new(client: Arc<ExtractionClient>, credentials: ModelCredentials) -> Self {
        Self { client, credentials }
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn next_action(&self, state: &AgentState, goal: &str) -> Result<PlannedAction, ScrapeError> {
        self.client.plan_next_action(state, goal, &self.credentials).await
    }
}
