use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::errors::ScrapeError;
use crate::models::{AgentAction, AgentState, ApiKeySource, CaptureResult, ExtractionResult, ExtractionUsage};
use crate::schema::ExtractionSchema;
use crate::utils::head_chars;
use super::json::extract_json;
use super::pricing::calculate_cost;
use super::prompts::{goal_directive, OutputStyle, PromptPreset, AGENT_EXTRACTOR_PROMPT, AGENT_PLANNER_PROMPT, REPAIR_INSTRUCTION};
use super::provider::LLMProvider;
use super::router::{key_optional, ProviderFactory};
use super::types::{ChatMessage, CompletionRequest, ContentPart, LLMResponse};

pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(75);

const MAX_HTML_CHARS: usize = 50_000;
const MAX_TEXT_CHARS: usize = 20_000;
const MAX_ACCESSIBILITY_CHARS: usize = 60_000;
const MAX_IMAGE_URLS: usize = 50;
const PLANNER_TEXT_CHARS: usize = 6_000;
const EVIDENCE_STATES: usize = 12;
const EVIDENCE_TEXT_CHARS: usize = 3_000;
const EVIDENCE_HTML_CHARS: usize = 2_000;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());
static HTML_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Per-call model overrides. Never written back to the client defaults.
#[derive(Debug, Clone, Default)]
pub struct ModelCredentials {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl ModelCredentials {
    pub fn new(api_key: Option<String>, model: Option<String>) -> Self {
        Self { api_key, model }
    }
}

/// Planner decision plus what it cost.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub action: AgentAction,
    pub usage: ExtractionUsage,
    pub cost_usd: f64,
}

struct ResolvedModel {
    provider: Arc<dyn LLMProvider>,
    model: String,
    source: ApiKeySource,
}

/// Turns captures and agent evidence into raw JSON through a language model.
pub struct ExtractionClient {
    factory: Arc<dyn ProviderFactory>,
    provider_name: String,
    default_api_key: String,
    default_model: String,
    timeout: Duration,
}

impl ExtractionClient {
    pub fn new(
        factory: Arc<dyn ProviderFactory>,
        provider_name: &str,
        default_api_key: Option<&str>,
        default_model: &str,
    ) -> Self {
        Self {
            factory,
            provider_name: provider_name.to_string(),
            default_api_key: default_api_key.unwrap_or_default().trim().to_string(),
            default_model: default_model.to_string(),
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub async fn extract(
        &self,
        capture: &CaptureResult,
        schema: &dyn ExtractionSchema,
        system_prompt: Option<&str>,
        goal: Option<&str>,
        style: OutputStyle,
        credentials: &ModelCredentials,
    ) -> Result<ExtractionResult, ScrapeError> {
        let resolved = self.resolve(credentials)?;
        let system = system_prompt
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| PromptPreset::Generic.system_prompt());

        let mut parts = Vec::with_capacity(2);
        if let Some(image) = capture.screenshot_base64() {
            parts.push(ContentPart::ImageJpeg(image));
        }
        parts.push(ContentPart::Text(build_page_prompt(capture, schema, goal, style)));

        info!(
            url = %capture.meta.final_url,
            model = %resolved.model,
            schema = schema.name(),
            with_image = capture.has_screenshot(),
            "Requesting structured extraction"
        );
        let messages = vec![ChatMessage::system(&system), ChatMessage::user_parts(parts)];
        self.complete_json(resolved, messages).await
    }

    /// Ask the model for the next browser action. No repair round: a malformed
    /// plan is a hard failure.
    pub async fn plan_next_action(
        &self,
        state: &AgentState,
        goal: &str,
        credentials: &ModelCredentials,
    ) -> Result<PlannedAction, ScrapeError> {
        let resolved = self.resolve(credentials)?;

        let mut parts = Vec::with_capacity(2);
        if let Some(image) = state.screenshot_base64.as_ref().filter(|s| !s.is_empty()) {
            parts.push(ContentPart::ImageJpeg(image.clone()));
        }
        parts.push(ContentPart::Text(build_planner_prompt(state, goal)));
        let messages = vec![ChatMessage::system(AGENT_PLANNER_PROMPT), ChatMessage::user_parts(parts)];

        let response = self.call(resolved.provider.as_ref(), messages).await?;
        let raw = extract_json(&response.content)
            .ok_or_else(|| ScrapeError::Model("Planner returned invalid JSON".into()))?;
        let action: AgentAction = serde_json::from_value(raw)
            .map_err(|e| ScrapeError::Model(format!("Planner returned an invalid action: {}", e)))?;

        debug!(step = state.step_index, action = ?action.action, target = ?action.target, "Planned next action");
        Ok(PlannedAction {
            action,
            cost_usd: calculate_cost(&response.usage),
            usage: response.usage,
        })
    }

    /// One schema-bound extraction over the most recent agent observations.
    pub async fn extract_from_evidence(
        &self,
        states: &[AgentState],
        schema: &dyn ExtractionSchema,
        goal: &str,
        credentials: &ModelCredentials,
    ) -> Result<ExtractionResult, ScrapeError> {
        let resolved = self.resolve(credentials)?;
        let prompt = build_evidence_prompt(states, schema, goal);
        info!(states = states.len().min(EVIDENCE_STATES), schema = schema.name(), "Extracting from agent evidence");
        let messages = vec![ChatMessage::system(AGENT_EXTRACTOR_PROMPT), ChatMessage::user(&prompt)];
        self.complete_json(resolved, messages).await
    }

    fn resolve(&self, credentials: &ModelCredentials) -> Result<ResolvedModel, ScrapeError> {
        let request_key = credentials.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
        let (api_key, source) = match request_key {
            Some(key) => (key, ApiKeySource::Request),
            None => (self.default_api_key.as_str(), ApiKeySource::Config),
        };
        if api_key.is_empty() && !key_optional(&self.provider_name) {
            return Err(ScrapeError::ModelAuth(
                "No model API key configured. Set OPENAI_API_KEY or pass a key with the request.".into(),
            ));
        }

        let model = credentials.model.as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string();
        let provider = self.factory.create(api_key, &model)?;
        Ok(ResolvedModel { provider, model, source })
    }

    async fn call(&self, provider: &dyn LLMProvider, messages: Vec<ChatMessage>) -> Result<LLMResponse, ScrapeError> {
        let request = CompletionRequest::json(messages);
        tokio::time::timeout(self.timeout, provider.complete(&request))
            .await
            .map_err(|_| ScrapeError::Model(format!(
                "Model call timed out after {}s", self.timeout.as_secs_f64()
            )))?
    }

    async fn complete_json(&self, resolved: ResolvedModel, mut messages: Vec<ChatMessage>) -> Result<ExtractionResult, ScrapeError> {
        let first = self.call(resolved.provider.as_ref(), messages.clone()).await?;
        let (raw_data, response) = match extract_json(&first.content) {
            Some(data) => (data, first),
            None => {
                warn!(model = %resolved.model, "Model reply was not valid JSON, requesting a repair");
                messages.push(ChatMessage::assistant(&first.content));
                messages.push(ChatMessage::user(REPAIR_INSTRUCTION));
                let repaired = self.call(resolved.provider.as_ref(), messages).await?;
                let data = extract_json(&repaired.content).ok_or_else(|| {
                    ScrapeError::Model("Model returned invalid JSON after the repair attempt".into())
                })?;
                (data, repaired)
            }
        };

        Ok(ExtractionResult {
            raw_data,
            cost_usd: calculate_cost(&response.usage),
            usage: response.usage,
            model: resolved.model,
            api_key_source: resolved.source,
        })
    }
}

/// Strip script, style and comment blocks, then cap the length.
pub fn clean_html(html: &str, max_chars: usize) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(html, "");
    let without_styles = STYLE_BLOCK.replace_all(&without_scripts, "");
    let cleaned = HTML_COMMENT.replace_all(&without_styles, "");
    head_chars(&cleaned, max_chars).to_string()
}

fn build_page_prompt(capture: &CaptureResult, schema: &dyn ExtractionSchema, goal: Option<&str>, style: OutputStyle) -> String {
    let structure = if capture.accessibility.is_empty() {
        format!("HTML:\n{}", clean_html(&capture.html, MAX_HTML_CHARS))
    } else {
        format!(
            "Accessibility tree (preferred):\n{}",
            head_chars(&capture.accessibility, MAX_ACCESSIBILITY_CHARS)
        )
    };

    let images = if capture.image_urls.is_empty() {
        String::new()
    } else {
        let listed = &capture.image_urls[..capture.image_urls.len().min(MAX_IMAGE_URLS)];
        format!(
            "Available images:\n{}",
            serde_json::to_string_pretty(listed).unwrap_or_default()
        )
    };

    format!(
        "Extract the data from this page and answer with valid JSON only.\n\n{}Expected schema:\n{}\n\n{}\n\n{}\n\nRendered text:\n{}",
        goal_directive(goal, style),
        schema.json_schema(),
        structure,
        images,
        head_chars(&capture.text, MAX_TEXT_CHARS),
    )
}

fn build_planner_prompt(state: &AgentState, goal: &str) -> String {
    let last_action = state.last_action.as_ref()
        .and_then(|a| serde_json::to_string(a).ok())
        .unwrap_or_else(|| "none".to_string());
    format!(
        "Goal: {}\nStep: {}\nCurrent URL: {}\nTitle: {}\nLast action: {}\nLast error: {}\n\nVisible text:\n{}",
        goal,
        state.step_index,
        state.current_url,
        state.title,
        last_action,
        state.last_error.as_deref().unwrap_or("none"),
        head_chars(&state.text_excerpt, PLANNER_TEXT_CHARS),
    )
}

fn build_evidence_prompt(states: &[AgentState], schema: &dyn ExtractionSchema, goal: &str) -> String {
    let recent = &states[states.len().saturating_sub(EVIDENCE_STATES)..];
    let evidence: Vec<Value> = recent.iter()
        .map(|s| json!({
            "step_index": s.step_index,
            "url": s.current_url,
            "title": s.title,
            "last_error": s.last_error,
            "text": head_chars(&s.text_excerpt, EVIDENCE_TEXT_CHARS),
            "html": head_chars(&s.html_excerpt, EVIDENCE_HTML_CHARS),
        }))
        .collect();

    format!(
        "Goal: {}\n\nExpected schema:\n{}\n\nEvidence:\n{}",
        goal,
        schema.json_schema(),
        serde_json::to_string_pretty(&evidence).unwrap_or_default(),
    )
}
