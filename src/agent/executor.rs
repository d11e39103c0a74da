use std::time::{Duration, Instant};

use base64::Engine;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::browser::scripts;
use crate::browser::{Locator, RenderPage, WaitCondition};
use crate::errors::ScrapeError;
use crate::models::{ActionKind, AgentAction, AgentState};
use crate::utils::head_chars;

pub const SCROLL_DELTA_PX: i64 = 900;
pub const MAX_WAIT_SECS: f64 = 10.0;
const HTML_EXCERPT_CHARS: usize = 10_000;
const TEXT_EXCERPT_CHARS: usize = 6_000;
const OBSERVE_SCREENSHOT_QUALITY: u8 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub elapsed_seconds: f64,
}

/// Runs one planner action. Failures are reported in the outcome, never raised.
pub async fn execute_action(page: &mut dyn RenderPage, action: &AgentAction, timeout_ms: u64) -> ExecutionOutcome {
    let started = Instant::now();
    let result = dispatch(page, action, timeout_ms).await;
    let elapsed_seconds = started.elapsed().as_secs_f64();
    match result {
        Ok(()) => ExecutionOutcome { success: true, error: None, elapsed_seconds },
        Err(e) => {
            warn!(action = ?action.action, target = ?action.target, error = %e, "Agent action failed");
            ExecutionOutcome { success: false, error: Some(e.to_string()), elapsed_seconds }
        }
    }
}

async fn dispatch(page: &mut dyn RenderPage, action: &AgentAction, timeout_ms: u64) -> Result<(), ScrapeError> {
    debug!(action = ?action.action, target = ?action.target, value = ?action.value, "Executing agent action");
    match action.action {
        ActionKind::Goto => {
            let url = destination(action)?;
            page.goto(url, WaitCondition::DomContentLoaded, timeout_ms).await?;
        }
        ActionKind::OpenNewTab => {
            let url = destination(action)?;
            page.open_new_tab(url, timeout_ms).await?;
        }
        ActionKind::Click => {
            page.click(&Locator::css(selector(action)?), timeout_ms).await?;
        }
        ActionKind::Type => {
            let locator = Locator::css(selector(action)?);
            page.fill(&locator, action.value.as_deref().unwrap_or_default(), timeout_ms).await?;
            page.press(&locator, "Enter", timeout_ms).await?;
        }
        ActionKind::Scroll => {
            let delta = if action.value.as_deref() == Some("up") { -SCROLL_DELTA_PX } else { SCROLL_DELTA_PX };
            page.evaluate(scripts::SCROLL_BY, json!(delta)).await?;
        }
        ActionKind::Wait => {
            tokio::time::sleep(wait_duration(action.value.as_deref())?).await;
        }
        ActionKind::Back => {
            page.go_back(timeout_ms).await?;
        }
        ActionKind::Extract | ActionKind::Stop => {}
    }
    Ok(())
}

fn destination(action: &AgentAction) -> Result<&str, ScrapeError> {
    action.value.as_deref()
        .or(action.target.as_deref())
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ScrapeError::Validation(format!("{:?} needs a URL in value or target", action.action)))
}

fn selector(action: &AgentAction) -> Result<&str, ScrapeError> {
    action.target.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ScrapeError::Validation(format!("{:?} needs a target selector", action.action)))
}

/// Seconds from the action value, default 1, clamped to `[0, 10]`.
pub fn wait_duration(value: Option<&str>) -> Result<Duration, ScrapeError> {
    let secs = match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => 1.0,
        Some(raw) => raw.parse::<f64>()
            .map_err(|_| ScrapeError::Validation(format!("wait value is not a number: {}", raw)))?,
    };
    let secs = if secs.is_finite() { secs.clamp(0.0, MAX_WAIT_SECS) } else { MAX_WAIT_SECS };
    Ok(Duration::from_secs_f64(secs))
}

/// Snapshot of the page for the planner. Capture failures degrade the state
/// instead of aborting the run.
pub async fn observe(page: &mut dyn RenderPage, step_index: u32, last_action: Option<AgentAction>, last_error: Option<String>) -> AgentState {
    let current_url = page.url().await.unwrap_or_default();
    let title = page.title().await.unwrap_or_default();

    let captured = capture_excerpts(page).await;
    match captured {
        Ok((html, text, screenshot)) => AgentState {
            step_index,
            current_url,
            title,
            text_excerpt: text,
            html_excerpt: html,
            screenshot_base64: screenshot,
            last_action,
            last_error,
        },
        Err(e) => {
            warn!(step = step_index, error = %e, "Could not capture agent state");
            let marker = if e.is_timeout() { "timeout_capturing_state".to_string() } else { format!("state_capture_failed: {}", e) };
            AgentState {
                step_index,
                current_url,
                title,
                last_action,
                last_error: Some(marker),
                ..Default::default()
            }
        }
    }
}

async fn capture_excerpts(page: &mut dyn RenderPage) -> Result<(String, String, Option<String>), ScrapeError> {
    let html = page.content().await?;
    let text = match page.evaluate(scripts::VISIBLE_TEXT, Value::Null).await? {
        Value::String(s) => s,
        _ => String::new(),
    };
    let screenshot = match page.screenshot(false, OBSERVE_SCREENSHOT_QUALITY).await {
        Ok(bytes) if !bytes.is_empty() => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Agent screenshot unavailable");
            None
        }
    };
    Ok((
        head_chars(&html, HTML_EXCERPT_CHARS).to_string(),
        head_chars(&text, TEXT_EXCERPT_CHARS).to_string(),
        screenshot,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_duration() {
        assert_eq!(wait_duration(None).unwrap(), Duration::from_secs(1));
        assert_eq!(wait_duration(Some("2.5")).unwrap(), Duration::from_millis(2500));
        assert_eq!(wait_duration(Some("600")).unwrap(), Duration::from_secs(10));
        assert_eq!(wait_duration(Some("-3")).unwrap(), Duration::ZERO);
        assert!(wait_duration(Some("soon")).is_err());
    }

    #[test]
    fn test_destination_prefers_value() {
        let action = AgentAction::new(ActionKind::Goto)
            .with_target("https://target.example")
            .with_value("https://value.example");
        assert_eq!(destination(&action).unwrap(), "https://value.example");

        let action = AgentAction::new(ActionKind::OpenNewTab).with_target("https://target.example");
        assert_eq!(destination(&action).unwrap(), "https://target.example");

        assert!(destination(&AgentAction::new(ActionKind::Goto)).is_err());
    }

    #[test]
    fn test_selector_required() {
        assert!(selector(&AgentAction::new(ActionKind::Click).with_target("  ")).is_err());
        assert_eq!(selector(&AgentAction::new(ActionKind::Click).with_target("#go")).unwrap(), "#go");
    }
}
