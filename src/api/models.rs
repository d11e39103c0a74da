use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::agent::{AgentRequest, DEFAULT_MAX_STEPS};
use crate::browser::{CaptureOptions, ScrollStrategy, WaitCondition};
use crate::browser::scroll::MAX_ENRICHED_ITEMS;
use crate::errors::ScrapeError;
use crate::llm::{ModelCredentials, OutputStyle, PromptPreset};
use crate::pipeline::ScrapeRequest;
use crate::schema::{self, catalog::DEFAULT_SCHEMA};

const MAX_GOAL_PROMPT_CHARS: usize = 4_000;
const MAX_API_KEY_CHARS: usize = 300;
const MAX_MODEL_CHARS: usize = 120;

fn default_schema() -> String { DEFAULT_SCHEMA.to_string() }
fn default_agent_schema() -> String { "guided_extract".to_string() }
fn default_wait() -> String { WaitCondition::NetworkIdle.as_str().to_string() }
fn default_timeout() -> u64 { 30_000 }
fn default_quality() -> u32 { 70 }
fn default_scroll_steps() -> u32 { 6 }
fn default_output() -> String { "list".to_string() }
fn default_max_steps() -> u32 { DEFAULT_MAX_STEPS }
fn default_true() -> bool { true }

/// Body of `POST /api/scrape`. The CLI builds the same shape from its flags.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeBody {
    pub url: String,
    #[serde(default = "default_schema", alias = "schema_name")]
    pub schema: String,
    /// Prompt preset: generic, ecommerce or news.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Free-text extraction goal.
    #[serde(default)]
    pub user_prompt: Option<String>,
    #[serde(default = "default_wait")]
    pub wait_until: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub full_page: bool,
    #[serde(default = "default_quality")]
    pub screenshot_quality: u32,
    #[serde(default = "default_true")]
    pub auto_scroll: bool,
    #[serde(default = "default_scroll_steps")]
    pub scroll_steps: u32,
    #[serde(default)]
    pub scroll_strategy: ScrollStrategy,
    #[serde(default)]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub block_resources: bool,
    #[serde(default)]
    pub execute_js: Option<String>,
    #[serde(default = "default_output")]
    pub output_format: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub openai_model: Option<String>,
    #[serde(default)]
    pub extra_metadata: Map<String, Value>,
}

impl ScrapeBody {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            schema: default_schema(),
            prompt: None,
            user_prompt: None,
            wait_until: default_wait(),
            timeout: default_timeout(),
            full_page: false,
            screenshot_quality: default_quality(),
            auto_scroll: true,
            scroll_steps: default_scroll_steps(),
            scroll_strategy: ScrollStrategy::default(),
            max_items: None,
            block_resources: false,
            execute_js: None,
            output_format: default_output(),
            openai_api_key: None,
            openai_model: None,
            extra_metadata: Map::new(),
        }
    }

    /// Bounds-checks the body. Unknown schemas are a configuration error,
    /// every other violation a validation error.
    pub fn into_request(self) -> Result<ScrapeRequest, ScrapeError> {
        check_url(&self.url)?;
        let schema = schema::lookup(&self.schema)
            .ok_or_else(|| ScrapeError::Config(format!("Unknown schema: {}", self.schema)))?;

        if !(5_000..=120_000).contains(&self.timeout) {
            return Err(invalid("timeout must be between 5000 and 120000 ms"));
        }
        if !(30..=100).contains(&self.screenshot_quality) {
            return Err(invalid("screenshot_quality must be between 30 and 100"));
        }
        if !(1..=20).contains(&self.scroll_steps) {
            return Err(invalid("scroll_steps must be between 1 and 20"));
        }
        let wait_until = WaitCondition::parse(&self.wait_until)
            .ok_or_else(|| invalid(&format!("unsupported wait_until: {}", self.wait_until)))?;
        let style = OutputStyle::parse(&self.output_format)
            .ok_or_else(|| invalid("output_format must be one of list, summary, report"))?;
        if self.user_prompt.as_ref().is_some_and(|p| p.chars().count() > MAX_GOAL_PROMPT_CHARS) {
            return Err(invalid("user_prompt is limited to 4000 characters"));
        }
        let credentials = credentials(self.openai_api_key, self.openai_model)?;

        let preset = match self.prompt.as_deref().map(|p| p.trim().to_lowercase()).as_deref() {
            Some("ecommerce") => PromptPreset::Ecommerce,
            Some("news") => PromptPreset::News,
            _ => PromptPreset::Generic,
        };

        let capture = CaptureOptions {
            wait_until,
            timeout_ms: self.timeout,
            full_page: self.full_page,
            screenshot_quality: self.screenshot_quality as u8,
            auto_scroll: self.auto_scroll,
            scroll_steps: self.scroll_steps,
            scroll_strategy: self.scroll_strategy,
            max_items: self.max_items.unwrap_or(MAX_ENRICHED_ITEMS).min(MAX_ENRICHED_ITEMS),
            block_resources: self.block_resources,
            execute_js: self.execute_js,
        };

        Ok(ScrapeRequest::new(&self.url, schema)
            .with_capture(capture)
            .with_system_prompt(Some(preset.system_prompt()))
            .with_goal(self.user_prompt)
            .with_output_style(style)
            .with_credentials(credentials)
            .with_extra_metadata(self.extra_metadata))
    }
}

/// Body of `POST /api/agent`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentBody {
    pub url: String,
    pub goal: String,
    #[serde(default = "default_agent_schema", alias = "schema_name")]
    pub schema: String,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub openai_model: Option<String>,
}

impl AgentBody {
    pub fn into_request(self) -> Result<AgentRequest, ScrapeError> {
        check_url(&self.url)?;
        let schema = schema::lookup(&self.schema)
            .ok_or_else(|| ScrapeError::Config(format!("Unknown schema: {}", self.schema)))?;
        let goal_len = self.goal.trim().chars().count();
        if !(5..=2_000).contains(&goal_len) {
            return Err(invalid("goal must be between 5 and 2000 characters"));
        }
        if !(1..=30).contains(&self.max_steps) {
            return Err(invalid("max_steps must be between 1 and 30"));
        }
        let credentials = credentials(self.openai_api_key, self.openai_model)?;

        Ok(AgentRequest::new(&self.url, self.goal.trim(), schema)
            .with_max_steps(self.max_steps)
            .with_credentials(credentials))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub success: Option<bool>,
    pub domain: Option<String>,
}

fn invalid(message: &str) -> ScrapeError {
    ScrapeError::Validation(message.to_string())
}

fn check_url(raw: &str) -> Result<(), ScrapeError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| invalid(&format!("invalid url '{}': {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid(&format!("url must be an absolute http(s) URL: {}", raw)));
    }
    Ok(())
}

fn credentials(api_key: Option<String>, model: Option<String>) -> Result<ModelCredentials, ScrapeError> {
    let api_key = api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
    let model = model.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
    if api_key.as_ref().is_some_and(|k| k.chars().count() > MAX_API_KEY_CHARS) {
        return Err(invalid("openai_api_key is limited to 300 characters"));
    }
    if model.as_ref().is_some_and(|m| m.chars().count() > MAX_MODEL_CHARS) {
        return Err(invalid("openai_model is limited to 120 characters"));
    }
    Ok(ModelCredentials::new(api_key, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(extra: Value) -> ScrapeBody {
        let mut base = json!({"url": "https://shop.example/list"});
        if let (Some(target), Some(fields)) = (base.as_object_mut(), extra.as_object()) {
            target.extend(fields.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn test_scrape_body_defaults() {
        let request = body(json!({})).into_request().unwrap();
        assert_eq!(request.schema.name(), "generic_list");
        assert_eq!(request.capture.wait_until, WaitCondition::NetworkIdle);
        assert_eq!(request.capture.timeout_ms, 30_000);
        assert_eq!(request.capture.screenshot_quality, 70);
        assert_eq!(request.output_style, OutputStyle::List);
        assert!(request.goal.is_none());
    }

    #[test]
    fn test_scrape_body_bounds() {
        for bad in [
            json!({"timeout": 1000}),
            json!({"screenshot_quality": 20}),
            json!({"scroll_steps": 0}),
            json!({"output_format": "poem"}),
            json!({"wait_until": "forever"}),
            json!({"url": "ftp://files.example/a"}),
        ] {
            let err = body(bad.clone()).into_request().unwrap_err();
            assert!(matches!(err, ScrapeError::Validation(_)), "{} gave {:?}", bad, err);
        }
    }

    #[test]
    fn test_unknown_schema_is_config_error() {
        let err = body(json!({"schema": "recipes"})).into_request().unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }

    #[test]
    fn test_scrape_body_carries_credentials_and_metadata() {
        let request = body(json!({
            "schema_name": "product_list",
            "prompt": "ecommerce",
            "user_prompt": "only lamps",
            "openai_api_key": "  sk-caller  ",
            "openai_model": "",
            "extra_metadata": {"batch": 7}
        })).into_request().unwrap();
        assert_eq!(request.schema.name(), "product_list");
        assert_eq!(request.credentials.api_key.as_deref(), Some("sk-caller"));
        assert!(request.credentials.model.is_none());
        assert_eq!(request.extra_metadata["batch"], 7);
        assert!(request.system_prompt.unwrap().contains("e-commerce"));
    }

    #[test]
    fn test_agent_body_bounds() {
        let ok: AgentBody = serde_json::from_value(json!({"url": "https://a.example", "goal": "list all cafes"})).unwrap();
        let request = ok.into_request().unwrap();
        assert_eq!(request.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(request.schema.name(), "guided_extract");

        let short: AgentBody = serde_json::from_value(json!({"url": "https://a.example", "goal": "go"})).unwrap();
        assert!(matches!(short.into_request(), Err(ScrapeError::Validation(_))));

        let many: AgentBody = serde_json::from_value(json!({"url": "https://a.example", "goal": "list cafes", "max_steps": 31})).unwrap();
        assert!(matches!(many.into_request(), Err(ScrapeError::Validation(_))));
    }
}
