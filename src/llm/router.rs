use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::errors::ScrapeError;
use super::openai::{OpenAIProvider, OPENAI_BASE_URL};
use super::provider::LLMProvider;

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

/// Builds providers for per-call credentials without touching shared defaults.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, api_key: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ScrapeError>;
}

/// Factory for the chat-completions family, sharing one connection pool.
pub struct HttpProviderFactory {
    client: Client,
    provider: String,
    base_url: Option<String>,
}

impl HttpProviderFactory {
    pub fn new(provider: &str, base_url: Option<&str>, timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            // Outer tokio timeout is authoritative; this only reaps stuck sockets.
            .timeout(timeout + Duration::from_secs(5))
            .build()
            .map_err(|e| ScrapeError::Config(format!("Failed to build HTTP client: {}", e)))?;
        // Reject unknown providers at startup rather than on first call.
        resolve_base_url(provider, base_url)?;
        Ok(Self {
            client,
            provider: provider.to_string(),
            base_url: base_url.map(str::to_string),
        })
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(&self, api_key: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ScrapeError> {
        Ok(Arc::from(create_provider(
            &self.provider,
            api_key,
            model,
            self.base_url.as_deref(),
            self.client.clone(),
        )?))
    }
}

pub fn create_provider(
    provider_name: &str,
    api_key: &str,
    model: &str,
    base_url: Option<&str>,
    client: Client,
) -> Result<Box<dyn LLMProvider>, ScrapeError> {
    let url = resolve_base_url(provider_name, base_url)?;
    Ok(Box::new(OpenAIProvider::with_base_url(client, api_key, model, &url, provider_name)))
}

fn resolve_base_url(provider_name: &str, base_url: Option<&str>) -> Result<String, ScrapeError> {
    let default = match provider_name {
        "openai" => OPENAI_BASE_URL,
        "openrouter" => OPENROUTER_BASE_URL,
        "local" => LOCAL_BASE_URL,
        "openai_compatible" => {
            return base_url.map(str::to_string).ok_or_else(|| {
                ScrapeError::Config("openai_compatible provider requires llm.base_url".into())
            });
        }
        other => return Err(ScrapeError::Config(format!("Unknown LLM provider: {}", other))),
    };
    Ok(base_url.unwrap_or(default).to_string())
}

/// Providers that can run without an API key.
pub fn key_optional(provider_name: &str) -> bool {
    provider_name == "local"
}
