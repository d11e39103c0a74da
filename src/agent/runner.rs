use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::browser::{PageOptions, RenderEngine, RenderPage, WaitCondition};
use crate::db::agent::ExecutionRequest;
use crate::db::Database;
use crate::errors::{ErrorKind, ScrapeError};
use crate::llm::{ExtractionClient, ModelCredentials};
use crate::models::{
    ActionKind, AgentExecutionMetadata, AgentExecutionResponse, AgentStepResult, ExtractionUsage, StateSnapshot,
    StopReason,
};
use crate::schema::ExtractionSchema;
use crate::validator::validate;
use super::buffer::{dedup_records, ExtractionBuffer};
use super::executor::{execute_action, observe};
use super::guardrails::Guardrails;
use super::planner::{LlmPlanner, Planner};

pub const DEFAULT_MAX_STEPS: u32 = 8;

#[derive(Clone)]
pub struct AgentRequest {
    pub url: String,
    pub goal: String,
    pub schema: Arc<dyn ExtractionSchema>,
    pub max_steps: u32,
    pub credentials: ModelCredentials,
}

impl AgentRequest {
    pub fn new(url: &str, goal: &str, schema: Arc<dyn ExtractionSchema>) -> Self {
        Self {
            url: url.to_string(),
            goal: goal.to_string(),
            schema,
            max_steps: DEFAULT_MAX_STEPS,
            credentials: ModelCredentials::default(),
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_credentials(mut self, credentials: ModelCredentials) -> Self {
        self.credentials = credentials;
        self
    }
}

struct Exploration {
    buffer: ExtractionBuffer,
    steps: Vec<AgentStepResult>,
    stop: StopReason,
    usage: ExtractionUsage,
    cost_usd: f64,
}

/// plan -> act -> observe until the planner finishes, a guardrail trips or
/// the step budget runs out; then one extraction over everything observed.
pub struct AgentLoop {
    engine: Arc<dyn RenderEngine>,
    page_options: PageOptions,
    extractor: Arc<ExtractionClient>,
    storage: Option<Database>,
    timeout_ms: u64,
}

impl AgentLoop {
    pub fn new(engine: Arc<dyn RenderEngine>, page_options: PageOptions, extractor: Arc<ExtractionClient>) -> Self {
        Self { engine, page_options, extractor, storage: None, timeout_ms: 30_000 }
    }

    pub fn with_storage(mut self, db: Database) -> Self {
        self.storage = Some(db);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub async fn run(&self, request: &AgentRequest) -> Result<AgentExecutionResponse, ScrapeError> {
        let planner = LlmPlanner::new(self.extractor.clone(), request.credentials.clone());
        self.run_with_planner(request, &planner).await
    }

    pub async fn run_with_planner(
        &self,
        request: &AgentRequest,
        planner: &dyn Planner,
    ) -> Result<AgentExecutionResponse, ScrapeError> {
        let started = Instant::now();
        let execution_id = Uuid::new_v4().to_string();
        info!(execution_id = %execution_id, url = %request.url, max_steps = request.max_steps, "Starting agent run");

        let mut page = self.engine.new_page(&self.page_options).await?;
        let explored = self.explore(page.as_mut(), request, planner).await;
        if let Err(e) = page.close().await {
            warn!(execution_id = %execution_id, error = %e, "Failed to close agent page");
        }
        let Exploration { buffer, steps, stop, mut usage, mut cost_usd } = explored?;
        info!(execution_id = %execution_id, steps = steps.len(), stop = stop.reason(), "Agent exploration finished");

        let mut metadata = AgentExecutionMetadata { stop: stop.condition(), ..Default::default() };
        let mut data = None;
        let extraction = self.extractor
            .extract_from_evidence(buffer.states(), request.schema.as_ref(), &request.goal, &request.credentials)
            .await;
        match extraction {
            Ok(extraction) => {
                usage.add(&extraction.usage);
                cost_usd += extraction.cost_usd;
                let mut raw = extraction.raw_data;
                let dropped = dedup_records(&mut raw);
                if dropped > 0 {
                    info!(execution_id = %execution_id, dropped, "Dropped duplicate records");
                }

                let (typed_data, quality, errors) = validate(&raw, request.schema.as_ref()).into_parts();
                metadata.quality = quality;
                if typed_data.is_none() {
                    metadata.error_type = Some(ErrorKind::Validation);
                    metadata.error = Some("Validation failed".to_string());
                    metadata.validation_errors = errors;
                }
                data = typed_data;
            }
            Err(e) => {
                error!(execution_id = %execution_id, error = %e, "Evidence extraction failed");
                metadata.error_type = Some(e.classify().kind);
                metadata.error = Some(e.to_string());
            }
        }

        metadata.tokens_used = usage.total_tokens;
        metadata.cost_usd = cost_usd;
        metadata.duration_seconds = started.elapsed().as_secs_f64();

        let response = AgentExecutionResponse {
            execution_id,
            success: data.is_some(),
            data,
            metadata,
            steps,
        };
        self.persist(request, &response);
        Ok(response)
    }

    async fn explore(
        &self,
        page: &mut dyn RenderPage,
        request: &AgentRequest,
        planner: &dyn Planner,
    ) -> Result<Exploration, ScrapeError> {
        let mut buffer = ExtractionBuffer::new();
        let mut steps = Vec::new();
        let mut usage = ExtractionUsage::default();
        let mut cost_usd = 0.0;
        let mut guardrails = Guardrails::new();
        let mut stop = None;

        page.goto(&request.url, WaitCondition::DomContentLoaded, self.timeout_ms).await?;
        let mut state = observe(page, 0, None, None).await;
        buffer.add_state(state.clone());

        for step_index in 1..=request.max_steps {
            let planned = planner.next_action(&state, &request.goal).await?;
            usage.add(&planned.usage);
            cost_usd += planned.cost_usd;
            let action = planned.action;

            match action.action {
                ActionKind::Stop => {
                    let reason = action.reason.clone()
                        .filter(|r| !r.trim().is_empty())
                        .unwrap_or_else(|| "planner_stop".to_string());
                    stop = Some(StopReason::PlannerStop(reason));
                    break;
                }
                ActionKind::Extract => {
                    stop = Some(StopReason::PlannerExtract);
                    break;
                }
                _ => {}
            }

            let outcome = execute_action(page, &action, self.timeout_ms).await;
            state = observe(page, step_index, Some(action.clone()), outcome.error.clone()).await;
            buffer.add_state(state.clone());
            steps.push(AgentStepResult {
                step_index,
                action,
                success: outcome.success,
                current_url: state.current_url.clone(),
                title: state.title.clone(),
                error: outcome.error.clone(),
                elapsed_seconds: outcome.elapsed_seconds,
                state_snapshot: StateSnapshot {
                    url: state.current_url.clone(),
                    title: state.title.clone(),
                    last_error: state.last_error.clone(),
                },
            });

            if let Some(reason) = guardrails.check(&state.current_url, outcome.error.as_deref()) {
                warn!(step = step_index, reason = reason.reason(), "Guardrail stopped the agent");
                stop = Some(reason);
                break;
            }
        }

        Ok(Exploration {
            buffer,
            steps,
            stop: stop.unwrap_or(StopReason::MaxStepsReached),
            usage,
            cost_usd,
        })
    }

    fn persist(&self, request: &AgentRequest, response: &AgentExecutionResponse) {
        let Some(db) = &self.storage else {
            return;
        };
        let record = ExecutionRequest {
            url: &request.url,
            goal: &request.goal,
            schema_name: request.schema.name(),
        };
        let saved = db.save_agent_execution(record, response)
            .and_then(|_| db.save_agent_steps(&response.execution_id, &response.steps));
        if let Err(e) = saved {
            error!(execution_id = %response.execution_id, error = %e, "Failed to persist agent execution");
        }
    }
}
