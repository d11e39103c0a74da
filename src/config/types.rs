use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::RetryConfig;

pub const DEFAULT_MODEL: &str = "gpt-5-mini-2025-08-07";

/// Fully resolved runtime settings. Every section tolerates partial YAML.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub browser: BrowserSettings,
    pub scraping: ScrapingSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    /// openai, openrouter, local or openai_compatible
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: None,
            timeout_secs: 75,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub timeout_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Node.js executable used to host the Playwright bridge.
    pub node_binary: String,
    pub stealth: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_ms: 30_000,
            viewport_width: 1920,
            viewport_height: 1080,
            node_binary: "node".to_string(),
            stealth: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScrapingSettings {
    pub max_concurrent_tasks: usize,
    pub retry_attempts: u32,
    /// Backoff multiplier in seconds.
    pub retry_delay: f64,
}

impl Default for ScrapingSettings {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 3,
            retry_attempts: 3,
            retry_delay: 2.0,
        }
    }
}

impl ScrapingSettings {
    /// Per-origin admission limit: the global task limit, capped at 3.
    pub fn origin_limit(&self) -> usize {
        self.max_concurrent_tasks.min(3).max(1)
    }

    pub fn retry_config(&self) -> RetryConfig {
        let defaults = RetryConfig::default();
        let base_delay = Some(self.retry_delay)
            .filter(|secs| secs.is_finite())
            .and_then(|secs| Duration::try_from_secs_f64(secs.max(0.0)).ok())
            .unwrap_or(defaults.base_delay);
        RetryConfig {
            max_attempts: self.retry_attempts.max(1),
            base_delay,
            ..defaults
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub database: PathBuf,
    pub exports_dir: PathBuf,
    pub sessions_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("./data/scraper_data.db"),
            exports_dir: PathBuf::from("./data/exports"),
            sessions_dir: PathBuf::from("./data/sessions"),
        }
    }
}
