use serde::{Deserialize, Serialize};

use crate::models::ExtractionUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    /// Base64-encoded JPEG, sent at high detail.
    ImageJpeg(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self { role: Role::System, parts: vec![ContentPart::Text(content.to_string())] }
    }
    pub fn user(content: &str) -> Self {
        Self { role: Role::User, parts: vec![ContentPart::Text(content.to_string())] }
    }
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self { role: Role::User, parts }
    }
    pub fn assistant(content: &str) -> Self {
        Self { role: Role::Assistant, parts: vec![ContentPart::Text(content.to_string())] }
    }

    pub fn has_image(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, ContentPart::ImageJpeg(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Ask the provider for a JSON object response.
    pub json_output: bool,
    pub max_output_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn json(messages: Vec<ChatMessage>) -> Self {
        Self { messages, json_output: true, max_output_tokens: None }
    }
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: ExtractionUsage,
    pub model: String,
}
