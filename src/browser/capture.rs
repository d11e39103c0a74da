use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::ScrapeError;
use crate::models::{CaptureResult, NavigationMeta, ScreenshotMode};
use crate::utils::head_chars;
use super::block::detect_block_reason;
use super::document::{document_title, extract_pdf_text, is_pdf, synthetic_html};
use super::engine::{FetchedResource, NavResponse, PageOptions, RenderEngine, RenderPage, WaitCondition};
use super::scripts;
use super::scroll::{enrich_list, smart_scroll, ListSelectors, MAX_ENRICHED_ITEMS};
use super::session::SessionStore;

pub const FETCH_FALLBACK: &str = "fetch_fallback";
const MAX_IMAGE_URLS: usize = 50;
const RAW_TEXT_CHARS: usize = 5_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollStrategy {
    #[default]
    Smart,
    /// Open feed entries one by one and inline their details.
    ListEnrichment,
}

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub wait_until: WaitCondition,
    pub timeout_ms: u64,
    pub full_page: bool,
    pub screenshot_quality: u8,
    pub auto_scroll: bool,
    pub scroll_steps: u32,
    pub scroll_strategy: ScrollStrategy,
    pub max_items: usize,
    pub block_resources: bool,
    pub execute_js: Option<String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            wait_until: WaitCondition::NetworkIdle,
            timeout_ms: 30_000,
            full_page: false,
            screenshot_quality: 70,
            auto_scroll: true,
            scroll_steps: 6,
            scroll_strategy: ScrollStrategy::Smart,
            max_items: MAX_ENRICHED_ITEMS,
            block_resources: false,
            execute_js: None,
        }
    }
}

/// Wait conditions to try, in order, without repeats.
pub fn navigation_plan(requested: WaitCondition) -> Vec<WaitCondition> {
    let mut plan = Vec::with_capacity(4);
    for mode in [requested, WaitCondition::Load, WaitCondition::DomContentLoaded, WaitCondition::NetworkIdle] {
        if !plan.contains(&mode) {
            plan.push(mode);
        }
    }
    plan
}

/// `(mode, full_page, quality)` for each screenshot strategy, in order.
pub fn screenshot_plan(full_page: bool, quality: u8) -> [(ScreenshotMode, bool, u8); 4] {
    let normalized = quality.clamp(35, 100);
    [
        (ScreenshotMode::Requested, full_page, normalized),
        (ScreenshotMode::ViewportHigh, false, normalized.max(60)),
        (ScreenshotMode::ViewportLow, false, 45),
        (ScreenshotMode::FullLow, true, 45),
    ]
}

/// Navigation failures that mean the browser handed the response to a download.
pub fn is_aborted_transfer(err: &ScrapeError) -> bool {
    let message = err.to_string();
    message.contains("ERR_ABORTED") || message.contains("download")
}

/// Produces one [`CaptureResult`] per call, falling back through navigation,
/// download and screenshot strategies before giving up.
pub struct CaptureEngine {
    engine: Arc<dyn RenderEngine>,
    sessions: SessionStore,
    page_defaults: PageOptions,
    list_selectors: ListSelectors,
}

impl CaptureEngine {
    pub fn new(engine: Arc<dyn RenderEngine>, sessions: SessionStore, page_defaults: PageOptions) -> Self {
        Self {
            engine,
            sessions,
            page_defaults,
            list_selectors: ListSelectors::default(),
        }
    }

    pub async fn capture(&self, url: &str, options: &CaptureOptions) -> Result<CaptureResult, ScrapeError> {
        let page_options = PageOptions {
            storage_state: self.sessions.load(url).await,
            block_resources: options.block_resources,
            ..self.page_defaults.clone()
        };

        let mut page = self.engine.new_page(&page_options).await?;
        let result = self.capture_on(page.as_mut(), url, options).await;
        if let Err(e) = page.close().await {
            warn!(url, error = %e, "Failed to close page");
        }
        result
    }

    async fn capture_on(
        &self,
        page: &mut dyn RenderPage,
        url: &str,
        options: &CaptureOptions,
    ) -> Result<CaptureResult, ScrapeError> {
        let (response, wait_used) = match goto_with_fallback(page, url, options).await {
            Ok(nav) => nav,
            Err(e) if is_aborted_transfer(&e) => {
                info!(url, error = %e, "Navigation aborted, fetching raw resource");
                let fetched = page.fetch(url, options.timeout_ms).await?;
                return capture_from_fetch(url, fetched).await;
            }
            Err(e) => return Err(e),
        };

        let status = response.as_ref().and_then(|r| r.status);
        let content_type = response.as_ref().and_then(NavResponse::content_type).map(str::to_string);

        if is_pdf(content_type.as_deref(), url) {
            let target = response.as_ref().map(|r| r.url.clone()).unwrap_or_else(|| url.to_string());
            match self.read_document(page, &target, options.timeout_ms).await {
                Ok(text) => {
                    return Ok(document_capture(url, &target, status, text, wait_used.as_str().to_string()));
                }
                Err(e) => warn!(url, error = %e, "PDF extraction failed, treating as a normal page"),
            }
        }

        if options.auto_scroll {
            match options.scroll_strategy {
                ScrollStrategy::Smart => {
                    smart_scroll(page, options.scroll_steps).await?;
                }
                ScrollStrategy::ListEnrichment => {
                    enrich_list(page, &self.list_selectors, options.max_items).await?;
                }
            }
        }

        if let Some(script) = options.execute_js.as_deref().filter(|s| !s.trim().is_empty()) {
            if let Err(e) = page.evaluate(script, Value::Null).await {
                warn!(url, error = %e, "Caller script failed");
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        match page.storage_state().await {
            Ok(state) => self.sessions.save(url, &state).await,
            Err(e) => warn!(url, error = %e, "Could not read storage state"),
        }

        let (screenshot, mode) = screenshot_with_fallback(page, options.full_page, options.screenshot_quality).await?;

        let html = page.content().await?;
        let accessibility = match page.accessibility_snapshot().await {
            Ok(Value::Null) => String::new(),
            Ok(Value::String(s)) => s,
            Ok(tree) => serde_json::to_string(&tree).unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "Accessibility snapshot unavailable");
                String::new()
            }
        };
        let image_urls = collect_image_urls(page.evaluate(scripts::IMAGE_URLS, Value::Null).await.unwrap_or(Value::Null));
        let text = match page.evaluate(scripts::VISIBLE_TEXT, Value::Null).await? {
            Value::String(s) => s,
            _ => String::new(),
        };
        let title = page.title().await?;
        let final_url = page.url().await?;

        if let Some(reason) = detect_block_reason(&html, &text, &title, &final_url, status) {
            return Err(ScrapeError::Blocked(reason));
        }

        Ok(CaptureResult {
            screenshot,
            html,
            text,
            accessibility,
            image_urls,
            meta: NavigationMeta {
                requested_url: url.to_string(),
                final_url,
                status_code: status,
                title,
                wait_condition_used: wait_used.as_str().to_string(),
                screenshot_mode: mode,
                auto_scroll: options.auto_scroll,
                scroll_steps: options.scroll_steps,
                content_type,
            },
        })
    }

    async fn read_document(&self, page: &mut dyn RenderPage, url: &str, timeout_ms: u64) -> Result<String, ScrapeError> {
        let fetched = page.fetch(url, timeout_ms).await?;
        extract_pdf_text(fetched.body).await
    }
}

async fn goto_with_fallback(
    page: &mut dyn RenderPage,
    url: &str,
    options: &CaptureOptions,
) -> Result<(Option<NavResponse>, WaitCondition), ScrapeError> {
    let mut last_timeout = None;
    for mode in navigation_plan(options.wait_until) {
        debug!(url, wait_until = mode.as_str(), "Navigating");
        match page.goto(url, mode, options.timeout_ms).await {
            Ok(response) => return Ok((response, mode)),
            Err(e) if e.is_timeout() => {
                warn!(url, wait_until = mode.as_str(), "Navigation timed out, trying next wait condition");
                last_timeout = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_timeout.unwrap_or_else(|| ScrapeError::Network(format!("Navigation to {} failed", url))))
}

async fn screenshot_with_fallback(
    page: &mut dyn RenderPage,
    full_page: bool,
    quality: u8,
) -> Result<(Vec<u8>, ScreenshotMode), ScrapeError> {
    let mut last_error = None;
    for (mode, full, q) in screenshot_plan(full_page, quality) {
        match page.screenshot(full, q).await {
            Ok(bytes) => return Ok((bytes, mode)),
            Err(e) => {
                warn!(mode = mode.as_str(), error = %e, "Screenshot failed");
                last_error = Some(e);
            }
        }
    }
    Err(ScrapeError::Network(format!(
        "Could not capture screenshot: {}",
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

async fn capture_from_fetch(url: &str, fetched: FetchedResource) -> Result<CaptureResult, ScrapeError> {
    let status = Some(fetched.status);
    if is_pdf(fetched.content_type(), url) {
        let final_url = fetched.url.clone();
        let text = extract_pdf_text(fetched.body)
            .await
            .map_err(|e| ScrapeError::Network(format!("Downloaded PDF could not be read: {}", e)))?;
        return Ok(document_capture(url, &final_url, status, text, FETCH_FALLBACK.to_string()));
    }

    let html = fetched.text();
    let text = head_chars(&html, RAW_TEXT_CHARS).to_string();
    Ok(CaptureResult {
        screenshot: Vec::new(),
        text,
        accessibility: String::new(),
        image_urls: Vec::new(),
        meta: NavigationMeta {
            requested_url: url.to_string(),
            final_url: fetched.url.clone(),
            status_code: status,
            title: "Fallback Fetch".to_string(),
            wait_condition_used: FETCH_FALLBACK.to_string(),
            screenshot_mode: ScreenshotMode::None,
            auto_scroll: false,
            scroll_steps: 0,
            content_type: fetched.content_type().map(str::to_string),
        },
        html,
    })
}

fn document_capture(url: &str, final_url: &str, status: Option<u16>, text: String, wait_used: String) -> CaptureResult {
    CaptureResult {
        screenshot: Vec::new(),
        html: synthetic_html(url, &text),
        text,
        accessibility: String::new(),
        image_urls: Vec::new(),
        meta: NavigationMeta {
            requested_url: url.to_string(),
            final_url: final_url.to_string(),
            status_code: status,
            title: document_title(url),
            wait_condition_used: wait_used,
            screenshot_mode: ScreenshotMode::Pdf,
            auto_scroll: false,
            scroll_steps: 0,
            content_type: Some("application/pdf".to_string()),
        },
    }
}

fn collect_image_urls(value: Value) -> Vec<String> {
    value.as_array()
        .map(|items| items.iter()
            .filter_map(Value::as_str)
            .filter(|src| src.starts_with("http") && !src.contains("base64"))
            .take(MAX_IMAGE_URLS)
            .map(str::to_string)
            .collect())
        .unwrap_or_default()
}
