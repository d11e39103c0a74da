use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::credentials::redact_credentials;
use crate::errors::ScrapeError;
use crate::models::ExtractionUsage;
use crate::utils::truncation::truncate_error;
use super::provider::LLMProvider;
use super::types::{ChatMessage, CompletionRequest, ContentPart, LLMResponse};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions client for OpenAI and wire-compatible endpoints.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    name: String,
}

impl OpenAIProvider {
    pub fn new(client: Client, api_key: &str, model: &str) -> Self {
        Self::with_base_url(client, api_key, model, OPENAI_BASE_URL, "openai")
    }

    pub fn with_base_url(client: Client, api_key: &str, model: &str, base_url: &str, name: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            name: name.to_string(),
        }
    }

    fn redact(&self, text: &str) -> String {
        truncate_error(&redact_credentials(text, &[self.api_key.as_str()]))
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<LLMResponse, ScrapeError> {
        let body = build_request_body(&self.model, request);
        debug!(provider = %self.name, model = %self.model, messages = request.messages.len(), "Sending completion");

        let mut builder = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ScrapeError::Model(self.redact(&format!("{} request failed: {}", self.name, e))))?;

        let status = resp.status();
        let text = resp.text().await
            .map_err(|e| ScrapeError::Model(format!("Failed to read {} response: {}", self.name, e)))?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ScrapeError::ModelAuth(self.redact(&format!(
                "{} rejected the credentials ({}): {}", self.name, status, error_message(&text)
            ))));
        }
        if !status.is_success() {
            return Err(ScrapeError::Model(self.redact(&format!(
                "{} returned {}: {}", self.name, status, error_message(&text)
            ))));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| ScrapeError::Model(format!("Failed to parse {} response: {}", self.name, e)))?;
        parse_response(&self.model, &data)
    }

    fn provider_name(&self) -> &str { &self.name }
    fn model_name(&self) -> &str { &self.model }
}

pub(crate) fn build_request_body(model: &str, request: &CompletionRequest) -> Value {
    let messages: Vec<Value> = request.messages.iter().map(message_to_json).collect();
    let mut body = json!({
        "model": model,
        "messages": messages,
    });
    if request.json_output {
        body["response_format"] = json!({ "type": "json_object" });
    }
    if let Some(max) = request.max_output_tokens {
        body["max_completion_tokens"] = json!(max);
    }
    body
}

fn message_to_json(message: &ChatMessage) -> Value {
    let content = match message.parts.as_slice() {
        [ContentPart::Text(text)] => json!(text),
        parts => Value::Array(parts.iter().map(|part| match part {
            ContentPart::Text(text) => json!({ "type": "text", "text": text }),
            ContentPart::ImageJpeg(b64) => json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:image/jpeg;base64,{}", b64),
                    "detail": "high",
                },
            }),
        }).collect()),
    };
    json!({ "role": message.role, "content": content })
}

pub(crate) fn parse_response(model: &str, data: &Value) -> Result<LLMResponse, ScrapeError> {
    if let Some(error) = data.get("error") {
        return Err(ScrapeError::Model(
            error["message"].as_str().unwrap_or("Unknown provider error").to_string(),
        ));
    }

    let content = data["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("{}")
        .to_string();

    let usage = &data["usage"];
    let input_tokens = usage["prompt_tokens"].as_u64().unwrap_or(0);
    let output_tokens = usage["completion_tokens"].as_u64().unwrap_or(0);
    let usage = ExtractionUsage {
        input_tokens,
        output_tokens,
        total_tokens: usage["total_tokens"].as_u64().unwrap_or(input_tokens + output_tokens),
        cached_input_tokens: usage["prompt_tokens_details"]["cached_tokens"].as_u64().unwrap_or(0),
    };

    Ok(LLMResponse {
        content,
        usage,
        model: data["model"].as_str().unwrap_or(model).to_string(),
    })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
