use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::ScrapeError;
use super::credentials::resolve_credential;
use super::schema::CONFIG_SCHEMA;
use super::types::Settings;
use tracing::debug;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

/// Build settings from defaults, an optional YAML file and the process environment.
/// CLI flags are applied on top by the caller.
pub async fn load_settings(path: Option<&Path>) -> Result<Settings, ScrapeError> {
    let mut settings = match path {
        Some(path) => parse_config(path).await?,
        None => Settings::default(),
    };
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    resolve_secrets(&mut settings);
    Ok(settings)
}

pub async fn parse_config(path: &Path) -> Result<Settings, ScrapeError> {
    if !path.exists() {
        return Err(ScrapeError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(ScrapeError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<Settings, ScrapeError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(Settings::default());
    }

    validate_schema(&yaml)?;

    let settings: Settings = serde_yaml::from_value(yaml)?;
    Ok(settings)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), ScrapeError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| ScrapeError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| ScrapeError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        let messages: Vec<String> = errors
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() { e.to_string() } else { format!("{} at {}", e, path) }
            })
            .collect();
        if !messages.is_empty() {
            return Err(ScrapeError::Config(format!("Invalid configuration: {}", messages.join("; "))));
        }
    }

    Ok(())
}

/// Overlay environment variables. `lookup` is injected so tests do not touch
/// the process environment.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<(), ScrapeError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = get("OPENAI_API_KEY") {
        settings.llm.api_key = Some(key);
    }
    if let Some(model) = get("OPENAI_MODEL") {
        settings.llm.model = model;
    }
    if let Some(raw) = get("SCRAPER_HEADLESS") {
        settings.browser.headless = parse_bool("SCRAPER_HEADLESS", &raw)?;
    }
    if let Some(raw) = get("SCRAPER_BROWSER_TIMEOUT") {
        settings.browser.timeout_ms = parse_num("SCRAPER_BROWSER_TIMEOUT", &raw)?;
    }
    if let Some(raw) = get("SCRAPER_MAX_CONCURRENT_TASKS") {
        settings.scraping.max_concurrent_tasks = parse_num("SCRAPER_MAX_CONCURRENT_TASKS", &raw)?;
    }
    if let Some(raw) = get("SCRAPER_RETRY_ATTEMPTS") {
        settings.scraping.retry_attempts = parse_num("SCRAPER_RETRY_ATTEMPTS", &raw)?;
    }
    if let Some(raw) = get("SCRAPER_RETRY_DELAY") {
        let delay: f64 = parse_num("SCRAPER_RETRY_DELAY", &raw)?;
        if !delay.is_finite() || delay < 0.0 {
            return Err(ScrapeError::Config(format!(
                "SCRAPER_RETRY_DELAY must be a non-negative number of seconds, got '{}'",
                raw
            )));
        }
        settings.scraping.retry_delay = delay;
    }
    if let Some(path) = get("SCRAPER_DATABASE") {
        settings.storage.database = PathBuf::from(path);
    }
    if let Some(path) = get("SCRAPER_EXPORTS_DIR") {
        settings.storage.exports_dir = PathBuf::from(path);
    }
    if let Some(path) = get("SCRAPER_SESSIONS_DIR") {
        settings.storage.sessions_dir = PathBuf::from(path);
    }
    Ok(())
}

fn resolve_secrets(settings: &mut Settings) {
    settings.llm.api_key = settings.llm.api_key.as_deref().and_then(resolve_credential);
    settings.llm.base_url = settings.llm.base_url.as_deref().and_then(resolve_credential);
    debug!(has_api_key = settings.llm.api_key.is_some(), "Settings resolved");
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ScrapeError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ScrapeError::Config(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

fn parse_num<T: FromStr>(key: &str, raw: &str) -> Result<T, ScrapeError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ScrapeError::Config(format!("{} must be numeric, got '{}'", key, raw)))
}
