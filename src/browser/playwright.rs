use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::config::BrowserSettings;
use crate::errors::ScrapeError;
use super::engine::{FetchedResource, Locator, NavResponse, PageOptions, RenderEngine, RenderPage, WaitCondition};
use super::scripts;

/// Launches one Node.js Playwright bridge per page.
///
/// Each page owns a private Chromium process, so pages never share cookies
/// unless a saved storage state is passed in. The child is killed when the
/// page is dropped, even if `close` was never awaited.
pub struct PlaywrightEngine {
    node_binary: String,
    headless: bool,
    /// Upper bound for a single bridge command on top of its own timeout.
    command_grace: Duration,
    default_timeout_ms: u64,
}

impl PlaywrightEngine {
    pub fn new(settings: &BrowserSettings) -> Self {
        Self {
            node_binary: settings.node_binary.clone(),
            headless: settings.headless,
            command_grace: Duration::from_secs(15),
            default_timeout_ms: settings.timeout_ms,
        }
    }
}

#[async_trait]
impl RenderEngine for PlaywrightEngine {
    async fn new_page(&self, options: &PageOptions) -> Result<Box<dyn RenderPage>, ScrapeError> {
        let mut child = Command::new(&self.node_binary)
            .arg("-e")
            .arg(scripts::BRIDGE)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScrapeError::Browser(format!("Failed to start Playwright bridge ({}): {}", self.node_binary, e)))?;

        let stdin = child.stdin.take()
            .ok_or_else(|| ScrapeError::Browser("Playwright bridge has no stdin".into()))?;
        let stdout = child.stdout.take()
            .ok_or_else(|| ScrapeError::Browser("Playwright bridge has no stdout".into()))?;

        let mut page = PlaywrightPage {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            command_grace: self.command_grace,
            default_timeout_ms: self.default_timeout_ms,
            closed: false,
        };

        let init_script = options.stealth.then_some(scripts::STEALTH_INIT);
        page.call("launch", json!({
            "headless": self.headless,
            "viewport_width": options.viewport_width,
            "viewport_height": options.viewport_height,
            "user_agent": options.user_agent,
            "storage_state": options.storage_state,
            "init_script": init_script,
            "block_resources": options.block_resources,
        }), self.default_timeout_ms).await?;

        debug!(headless = self.headless, block_resources = options.block_resources, "Playwright page ready");
        Ok(Box::new(page))
    }
}

pub struct PlaywrightPage {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    command_grace: Duration,
    default_timeout_ms: u64,
    closed: bool,
}

impl PlaywrightPage {
    /// Send one command and wait for the reply carrying the same id.
    async fn call(&mut self, cmd: &str, mut args: Value, timeout_ms: u64) -> Result<Value, ScrapeError> {
        if self.closed {
            return Err(ScrapeError::Browser("Page already closed".into()));
        }
        self.next_id += 1;
        let id = self.next_id;
        args["id"] = json!(id);
        args["cmd"] = json!(cmd);

        let mut line = serde_json::to_string(&args)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await
            .map_err(|e| ScrapeError::Browser(format!("Bridge write failed: {}", e)))?;
        self.stdin.flush().await
            .map_err(|e| ScrapeError::Browser(format!("Bridge flush failed: {}", e)))?;

        let deadline = Duration::from_millis(timeout_ms) + self.command_grace;
        let reply = tokio::time::timeout(deadline, self.read_reply(id))
            .await
            .map_err(|_| ScrapeError::Timeout(format!("Browser command '{}' exceeded {:?}", cmd, deadline)))??;

        if reply["ok"].as_bool().unwrap_or(false) {
            Ok(reply["result"].clone())
        } else {
            let message = reply["error"].as_str().unwrap_or("unknown bridge error").to_string();
            if reply["timeout"].as_bool().unwrap_or(false) {
                Err(ScrapeError::Timeout(message))
            } else {
                Err(ScrapeError::Browser(message))
            }
        }
    }

    async fn read_reply(&mut self, id: u64) -> Result<Value, ScrapeError> {
        loop {
            let line = self.stdout.next_line().await
                .map_err(|e| ScrapeError::Browser(format!("Bridge read failed: {}", e)))?
                .ok_or_else(|| ScrapeError::Browser("Playwright bridge exited".into()))?;
            let Ok(reply) = serde_json::from_str::<Value>(&line) else {
                debug!(line = %line, "Ignoring bridge output");
                continue;
            };
            if reply["id"].as_u64() == Some(id) {
                return Ok(reply);
            }
        }
    }

    fn locator_args(target: &Locator) -> Value {
        json!({ "selector": target.selector, "nth": target.nth })
    }
}

fn headers_from(value: &Value) -> HashMap<String, String> {
    value.as_object()
        .map(|map| map.iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.to_lowercase(), s.to_string())))
            .collect())
        .unwrap_or_default()
}

fn decode_base64(value: &Value, what: &str) -> Result<Vec<u8>, ScrapeError> {
    let encoded = value.as_str()
        .ok_or_else(|| ScrapeError::Browser(format!("Bridge returned no {}", what)))?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| ScrapeError::Browser(format!("Invalid {} encoding: {}", what, e)))
}

fn as_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RenderPage for PlaywrightPage {
    async fn goto(&mut self, url: &str, wait_until: WaitCondition, timeout_ms: u64)
        -> Result<Option<NavResponse>, ScrapeError>
    {
        let result = self.call("goto", json!({
            "url": url,
            "wait_until": wait_until.as_str(),
            "timeout": timeout_ms,
        }), timeout_ms).await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(NavResponse {
            status: result["status"].as_u64().map(|s| s as u16),
            url: result["url"].as_str().unwrap_or(url).to_string(),
            headers: headers_from(&result["headers"]),
        }))
    }

    async fn fetch(&mut self, url: &str, timeout_ms: u64) -> Result<FetchedResource, ScrapeError> {
        let result = self.call("fetch", json!({ "url": url, "timeout": timeout_ms }), timeout_ms).await?;
        Ok(FetchedResource {
            status: result["status"].as_u64().unwrap_or(0) as u16,
            url: result["url"].as_str().unwrap_or(url).to_string(),
            headers: headers_from(&result["headers"]),
            body: decode_base64(&result["body"], "body")?,
        })
    }

    async fn screenshot(&mut self, full_page: bool, quality: u8) -> Result<Vec<u8>, ScrapeError> {
        let timeout = self.default_timeout_ms;
        let result = self.call("screenshot", json!({ "full_page": full_page, "quality": quality }), timeout).await?;
        decode_base64(&result, "screenshot")
    }

    async fn evaluate(&mut self, script: &str, arg: Value) -> Result<Value, ScrapeError> {
        let timeout = self.default_timeout_ms;
        self.call("evaluate", json!({ "script": script, "arg": arg }), timeout).await
    }

    async fn content(&mut self) -> Result<String, ScrapeError> {
        let timeout = self.default_timeout_ms;
        self.call("content", json!({}), timeout).await.map(as_string)
    }

    async fn title(&mut self) -> Result<String, ScrapeError> {
        let timeout = self.default_timeout_ms;
        self.call("title", json!({}), timeout).await.map(as_string)
    }

    async fn url(&mut self) -> Result<String, ScrapeError> {
        let timeout = self.default_timeout_ms;
        self.call("url", json!({}), timeout).await.map(as_string)
    }

    async fn accessibility_snapshot(&mut self) -> Result<Value, ScrapeError> {
        let timeout = self.default_timeout_ms;
        self.call("accessibility", json!({}), timeout).await
    }

    async fn storage_state(&mut self) -> Result<Value, ScrapeError> {
        let timeout = self.default_timeout_ms;
        self.call("storage_state", json!({}), timeout).await
    }

    async fn wait_for_load_state(&mut self, state: WaitCondition, timeout_ms: u64) -> Result<(), ScrapeError> {
        self.call("wait_for_load_state", json!({ "state": state.as_str(), "timeout": timeout_ms }), timeout_ms).await?;
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout_ms: u64) -> Result<(), ScrapeError> {
        self.call("wait_for_selector", json!({ "selector": selector, "timeout": timeout_ms }), timeout_ms).await?;
        Ok(())
    }

    async fn count(&mut self, selector: &str) -> Result<usize, ScrapeError> {
        let timeout = self.default_timeout_ms;
        let result = self.call("count", json!({ "selector": selector }), timeout).await?;
        Ok(result.as_u64().unwrap_or(0) as usize)
    }

    async fn click(&mut self, target: &Locator, timeout_ms: u64) -> Result<(), ScrapeError> {
        let mut args = Self::locator_args(target);
        args["timeout"] = json!(timeout_ms);
        self.call("click", args, timeout_ms).await?;
        Ok(())
    }

    async fn fill(&mut self, target: &Locator, text: &str, timeout_ms: u64) -> Result<(), ScrapeError> {
        let mut args = Self::locator_args(target);
        args["text"] = json!(text);
        args["timeout"] = json!(timeout_ms);
        self.call("fill", args, timeout_ms).await?;
        Ok(())
    }

    async fn press(&mut self, target: &Locator, key: &str, timeout_ms: u64) -> Result<(), ScrapeError> {
        let mut args = Self::locator_args(target);
        args["key"] = json!(key);
        args["timeout"] = json!(timeout_ms);
        self.call("press", args, timeout_ms).await?;
        Ok(())
    }

    async fn is_visible(&mut self, target: &Locator) -> Result<bool, ScrapeError> {
        let timeout = self.default_timeout_ms;
        let result = self.call("is_visible", Self::locator_args(target), timeout).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn attribute(&mut self, target: &Locator, name: &str) -> Result<Option<String>, ScrapeError> {
        let mut args = Self::locator_args(target);
        args["name"] = json!(name);
        let result = self.call("attribute", args, 2_000).await?;
        Ok(result.as_str().map(str::to_string))
    }

    async fn inner_text(&mut self, target: &Locator) -> Result<String, ScrapeError> {
        self.call("inner_text", Self::locator_args(target), 2_000).await.map(as_string)
    }

    async fn go_back(&mut self, timeout_ms: u64) -> Result<(), ScrapeError> {
        self.call("go_back", json!({ "timeout": timeout_ms }), timeout_ms).await?;
        Ok(())
    }

    async fn open_new_tab(&mut self, url: &str, timeout_ms: u64) -> Result<(), ScrapeError> {
        self.call("open_new_tab", json!({ "url": url, "timeout": timeout_ms }), timeout_ms).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        if self.closed {
            return Ok(());
        }
        let result = self.call("close", json!({}), 5_000).await;
        self.closed = true;
        if let Err(e) = &result {
            warn!(error = %e, "Bridge did not close cleanly, killing it");
            let _ = self.child.start_kill();
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await;
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_lowercased() {
        let headers = headers_from(&json!({"Content-Type": "application/pdf", "x-n": 1}));
        assert_eq!(headers.get("content-type").map(String::as_str), Some("application/pdf"));
        assert!(!headers.contains_key("x-n"));
    }

    #[test]
    fn test_decode_base64() {
        assert_eq!(decode_base64(&json!("QUJD"), "body").unwrap(), b"ABC".to_vec());
        assert!(decode_base64(&json!(null), "body").is_err());
        assert!(decode_base64(&json!("!!"), "body").is_err());
    }

    #[test]
    fn test_as_string() {
        assert_eq!(as_string(json!("t")), "t");
        assert_eq!(as_string(json!(null)), "");
        assert_eq!(as_string(json!(3)), "3");
    }

    #[tokio::test]
    async fn test_missing_node_binary_is_browser_error() {
        let settings = BrowserSettings { node_binary: "/nonexistent/node-binary".into(), ..BrowserSettings::default() };
        let engine = PlaywrightEngine::new(&settings);
        let err = engine.new_page(&PageOptions::default()).await.err().unwrap();
        assert!(matches!(err, ScrapeError::Browser(_)));
    }
}
