use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ScrapeError;

/// Playwright load states accepted by `goto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitCondition {
    Load,
    DomContentLoaded,
    NetworkIdle,
    Commit,
}

impl WaitCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
            Self::NetworkIdle => "networkidle",
            Self::Commit => "commit",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "load" => Some(Self::Load),
            "domcontentloaded" => Some(Self::DomContentLoaded),
            "networkidle" => Some(Self::NetworkIdle),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }
}

impl Default for WaitCondition {
    fn default() -> Self {
        Self::NetworkIdle
    }
}

/// Context options for a fresh page.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: Option<String>,
    /// Previously saved storage state (cookies + local storage).
    pub storage_state: Option<Value>,
    pub stealth: bool,
    /// Abort image, media and font requests.
    pub block_resources: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            viewport_width: 1920,
            viewport_height: 1080,
            user_agent: None,
            storage_state: None,
            stealth: true,
            block_resources: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavResponse {
    pub status: Option<u16>,
    pub url: String,
    /// Lower-cased header names.
    pub headers: HashMap<String, String>,
}

impl NavResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedResource {
    pub status: u16,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchedResource {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A CSS selector, optionally narrowed to its n-th match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub selector: String,
    pub nth: Option<usize>,
}

impl Locator {
    pub fn css(selector: &str) -> Self {
        Self { selector: selector.to_string(), nth: None }
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }
}

#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn new_page(&self, options: &PageOptions) -> Result<Box<dyn RenderPage>, ScrapeError>;
}

/// One browser page with its own context. Timeouts surface as
/// `ScrapeError::Timeout`, other engine failures as `ScrapeError::Browser`.
#[async_trait]
pub trait RenderPage: Send {
    async fn goto(&mut self, url: &str, wait_until: WaitCondition, timeout_ms: u64)
        -> Result<Option<NavResponse>, ScrapeError>;

    /// Raw HTTP GET sharing the page's cookies, without rendering.
    async fn fetch(&mut self, url: &str, timeout_ms: u64) -> Result<FetchedResource, ScrapeError>;

    /// JPEG screenshot.
    async fn screenshot(&mut self, full_page: bool, quality: u8) -> Result<Vec<u8>, ScrapeError>;

    /// Run a function body in the page; `arg` is bound to the name `arg`.
    async fn evaluate(&mut self, script: &str, arg: Value) -> Result<Value, ScrapeError>;

    async fn content(&mut self) -> Result<String, ScrapeError>;
    async fn title(&mut self) -> Result<String, ScrapeError>;
    async fn url(&mut self) -> Result<String, ScrapeError>;
    async fn accessibility_snapshot(&mut self) -> Result<Value, ScrapeError>;
    async fn storage_state(&mut self) -> Result<Value, ScrapeError>;

    async fn wait_for_load_state(&mut self, state: WaitCondition, timeout_ms: u64) -> Result<(), ScrapeError>;
    async fn wait_for_selector(&mut self, selector: &str, timeout_ms: u64) -> Result<(), ScrapeError>;

    async fn count(&mut self, selector: &str) -> Result<usize, ScrapeError>;
    async fn click(&mut self, target: &Locator, timeout_ms: u64) -> Result<(), ScrapeError>;
    async fn fill(&mut self, target: &Locator, text: &str, timeout_ms: u64) -> Result<(), ScrapeError>;
    async fn press(&mut self, target: &Locator, key: &str, timeout_ms: u64) -> Result<(), ScrapeError>;
    async fn is_visible(&mut self, target: &Locator) -> Result<bool, ScrapeError>;
    async fn attribute(&mut self, target: &Locator, name: &str) -> Result<Option<String>, ScrapeError>;
    async fn inner_text(&mut self, target: &Locator) -> Result<String, ScrapeError>;

    async fn go_back(&mut self, timeout_ms: u64) -> Result<(), ScrapeError>;

    /// Open `url` in a new tab of the same context and make it current.
    async fn open_new_tab(&mut self, url: &str, timeout_ms: u64) -> Result<(), ScrapeError>;

    /// Release the page and its context.
    async fn close(&mut self) -> Result<(), ScrapeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_condition_parse() {
        assert_eq!(WaitCondition::parse("NetworkIdle"), Some(WaitCondition::NetworkIdle));
        assert_eq!(WaitCondition::parse("domcontentloaded"), Some(WaitCondition::DomContentLoaded));
        assert_eq!(WaitCondition::parse("forever"), None);
        assert_eq!(WaitCondition::default().as_str(), "networkidle");
    }

    #[test]
    fn test_locator_nth() {
        let loc = Locator::css("div[role='article']").nth(3);
        assert_eq!(loc.nth, Some(3));
        assert_eq!(Locator::css("a").nth, None);
    }
}
