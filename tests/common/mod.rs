#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use pagelens::browser::scripts;
use pagelens::browser::{
    CaptureEngine, CaptureOptions, FetchedResource, Locator, NavResponse, PageOptions, RenderEngine,
    RenderPage, SessionStore, WaitCondition,
};
use pagelens::config::Settings;
use pagelens::db::Database;
use pagelens::errors::{RetryConfig, ScrapeError};
use pagelens::llm::types::{CompletionRequest, LLMResponse};
use pagelens::llm::{ExtractionClient, LLMProvider, ProviderFactory};
use pagelens::models::ExtractionUsage;
use pagelens::pipeline::ScrapeOrchestrator;
use pagelens::runtime::Runtime;

/// A page the fake site serves.
#[derive(Debug, Clone)]
pub struct FakeDoc {
    pub title: String,
    pub html: String,
    pub text: String,
    pub status: u16,
    pub content_type: String,
}

impl FakeDoc {
    pub fn html(title: &str, text: &str) -> Self {
        Self {
            title: title.to_string(),
            html: format!("<html><head><title>{}</title></head><body>{}</body></html>", title, text),
            text: text.to_string(),
            status: 200,
            content_type: "text/html; charset=utf-8".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GotoFault {
    Timeout,
    Aborted,
    Network,
}

impl GotoFault {
    fn error(&self, url: &str) -> ScrapeError {
        match self {
            Self::Timeout => ScrapeError::Timeout(format!("goto {} exceeded timeout", url)),
            Self::Aborted => ScrapeError::Browser(format!("net::ERR_ABORTED at {}", url)),
            Self::Network => ScrapeError::Network(format!("net::ERR_CONNECTION_RESET at {}", url)),
        }
    }
}

/// Shared, scriptable state behind every page the fake engine opens.
#[derive(Default)]
pub struct FakeSite {
    pub docs: Mutex<HashMap<String, FakeDoc>>,
    /// Selector -> URL reached by clicking it.
    pub links: Mutex<HashMap<String, String>>,
    /// Faults consumed by successive `goto` calls.
    pub goto_faults: Mutex<VecDeque<GotoFault>>,
    /// Fault returned by every `goto`, after the scripted queue is empty.
    pub persistent_fault: Mutex<Option<GotoFault>>,
    pub fetch_response: Mutex<Option<FetchedResource>>,
    pub screenshot_failures: AtomicUsize,
    pub goto_modes: Mutex<Vec<WaitCondition>>,
    pub screenshot_calls: Mutex<Vec<(bool, u8)>>,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub opened_with: Mutex<Vec<PageOptions>>,
    /// Selector -> number of matching elements.
    pub counts: Mutex<HashMap<String, usize>>,
    pub visible: Mutex<HashSet<String>>,
    pub clicks: Mutex<Vec<Locator>>,
    /// Simulated latency of every successful `goto`.
    pub goto_delay: Mutex<Option<Duration>>,
    pub open_pages: AtomicUsize,
    pub peak_open_pages: AtomicUsize,
}

impl FakeSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, doc: FakeDoc) {
        self.docs.lock().unwrap().insert(url.to_string(), doc);
    }

    pub fn link(&self, selector: &str, url: &str) {
        self.links.lock().unwrap().insert(selector.to_string(), url.to_string());
    }

    pub fn fail_goto(&self, faults: &[GotoFault]) {
        self.goto_faults.lock().unwrap().extend(faults.iter().copied());
    }

    pub fn fail_every_goto(&self, fault: GotoFault) {
        *self.persistent_fault.lock().unwrap() = Some(fault);
    }

    pub fn heal(&self) {
        *self.persistent_fault.lock().unwrap() = None;
    }

    pub fn opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    pub fn peak_open(&self) -> usize {
        self.peak_open_pages.load(Ordering::SeqCst)
    }

    pub fn set_count(&self, selector: &str, count: usize) {
        self.counts.lock().unwrap().insert(selector.to_string(), count);
    }

    pub fn show(&self, selector: &str) {
        self.visible.lock().unwrap().insert(selector.to_string());
    }

    pub fn clicked(&self, selector: &str) -> usize {
        self.clicks.lock().unwrap().iter().filter(|l| l.selector == selector).count()
    }
}

pub struct FakeEngine {
    pub site: Arc<FakeSite>,
}

#[async_trait]
impl RenderEngine for FakeEngine {
    async fn new_page(&self, options: &PageOptions) -> Result<Box<dyn RenderPage>, ScrapeError> {
        self.site.pages_opened.fetch_add(1, Ordering::SeqCst);
        self.site.opened_with.lock().unwrap().push(options.clone());
        let open = self.site.open_pages.fetch_add(1, Ordering::SeqCst) + 1;
        self.site.peak_open_pages.fetch_max(open, Ordering::SeqCst);
        Ok(Box::new(FakePage { site: self.site.clone(), history: Vec::new() }))
    }
}

pub struct FakePage {
    site: Arc<FakeSite>,
    history: Vec<String>,
}

impl FakePage {
    fn current(&self) -> String {
        self.history.last().cloned().unwrap_or_else(|| "about:blank".to_string())
    }

    fn doc(&self) -> FakeDoc {
        self.site.docs.lock().unwrap()
            .get(&self.current())
            .cloned()
            .unwrap_or_else(|| FakeDoc::html("Untitled", ""))
    }

    fn navigate(&mut self, url: &str) -> Result<Option<NavResponse>, ScrapeError> {
        let scripted = self.site.goto_faults.lock().unwrap().pop_front();
        let fault = scripted.or(*self.site.persistent_fault.lock().unwrap());
        if let Some(fault) = fault {
            return Err(fault.error(url));
        }
        self.history.push(url.to_string());
        let doc = self.doc();
        Ok(Some(NavResponse {
            status: Some(doc.status),
            url: url.to_string(),
            headers: HashMap::from([("content-type".to_string(), doc.content_type)]),
        }))
    }
}

#[async_trait]
impl RenderPage for FakePage {
    async fn goto(&mut self, url: &str, wait_until: WaitCondition, _timeout_ms: u64)
        -> Result<Option<NavResponse>, ScrapeError> {
        self.site.goto_modes.lock().unwrap().push(wait_until);
        let delay = *self.site.goto_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.navigate(url)
    }

    async fn fetch(&mut self, url: &str, _timeout_ms: u64) -> Result<FetchedResource, ScrapeError> {
        self.site.fetch_response.lock().unwrap()
            .clone()
            .ok_or_else(|| ScrapeError::Network(format!("nothing to fetch at {}", url)))
    }

    async fn screenshot(&mut self, full_page: bool, quality: u8) -> Result<Vec<u8>, ScrapeError> {
        self.site.screenshot_calls.lock().unwrap().push((full_page, quality));
        let remaining = self.site.screenshot_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.site.screenshot_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ScrapeError::Browser("screenshot crashed".into()));
        }
        Ok(vec![0xff, 0xd8, 0xff, 0xe0])
    }

    async fn evaluate(&mut self, script: &str, _arg: Value) -> Result<Value, ScrapeError> {
        if script == scripts::VISIBLE_TEXT {
            return Ok(Value::String(self.doc().text));
        }
        if script == scripts::IMAGE_URLS {
            return Ok(json!(["https://cdn.example/a.jpg", "data:image/png;base64,AAAA"]));
        }
        if script == scripts::SCROLL_HEIGHT {
            return Ok(json!(1200));
        }
        Ok(Value::Null)
    }

    async fn content(&mut self) -> Result<String, ScrapeError> {
        Ok(self.doc().html)
    }

    async fn title(&mut self) -> Result<String, ScrapeError> {
        Ok(self.doc().title)
    }

    async fn url(&mut self) -> Result<String, ScrapeError> {
        Ok(self.current())
    }

    async fn accessibility_snapshot(&mut self) -> Result<Value, ScrapeError> {
        Ok(Value::Null)
    }

    async fn storage_state(&mut self) -> Result<Value, ScrapeError> {
        Ok(json!({"cookies": [{"name": "sid", "value": "abc"}], "origins": []}))
    }

    async fn wait_for_load_state(&mut self, _state: WaitCondition, _timeout_ms: u64) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn wait_for_selector(&mut self, _selector: &str, _timeout_ms: u64) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn count(&mut self, selector: &str) -> Result<usize, ScrapeError> {
        Ok(self.site.counts.lock().unwrap().get(selector).copied().unwrap_or(0))
    }

    async fn click(&mut self, target: &Locator, _timeout_ms: u64) -> Result<(), ScrapeError> {
        self.site.clicks.lock().unwrap().push(target.clone());
        let next = self.site.links.lock().unwrap().get(&target.selector).cloned();
        match next {
            Some(url) => self.navigate(&url).map(|_| ()),
            None => Err(ScrapeError::Timeout(format!("selector {} not found", target.selector))),
        }
    }

    async fn fill(&mut self, _target: &Locator, _text: &str, _timeout_ms: u64) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn press(&mut self, _target: &Locator, _key: &str, _timeout_ms: u64) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn is_visible(&mut self, target: &Locator) -> Result<bool, ScrapeError> {
        Ok(self.site.visible.lock().unwrap().contains(&target.selector))
    }

    async fn attribute(&mut self, _target: &Locator, _name: &str) -> Result<Option<String>, ScrapeError> {
        Ok(None)
    }

    async fn inner_text(&mut self, _target: &Locator) -> Result<String, ScrapeError> {
        Ok(String::new())
    }

    async fn go_back(&mut self, _timeout_ms: u64) -> Result<(), ScrapeError> {
        if self.history.len() > 1 {
            self.history.pop();
        }
        Ok(())
    }

    async fn open_new_tab(&mut self, url: &str, _timeout_ms: u64) -> Result<(), ScrapeError> {
        self.navigate(url).map(|_| ())
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        self.site.pages_closed.fetch_add(1, Ordering::SeqCst);
        self.site.open_pages.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Model stand-in answering from a queue of canned replies.
#[derive(Default)]
pub struct ScriptedModel {
    pub replies: Mutex<VecDeque<String>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    pub keys: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        let model = Self::default();
        model.push(replies);
        Arc::new(model)
    }

    pub fn push(&self, replies: &[&str]) {
        self.replies.lock().unwrap().extend(replies.iter().map(|r| r.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

struct ScriptedProvider {
    model: Arc<ScriptedModel>,
    name: String,
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<LLMResponse, ScrapeError> {
        self.model.requests.lock().unwrap().push(request.clone());
        let content = self.model.replies.lock().unwrap()
            .pop_front()
            .ok_or_else(|| ScrapeError::Model("no scripted reply left".into()))?;
        Ok(LLMResponse {
            content,
            usage: ExtractionUsage { input_tokens: 1_000, output_tokens: 200, total_tokens: 1_200, cached_input_tokens: 0 },
            model: self.name.clone(),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

pub struct ScriptedFactory {
    pub model: Arc<ScriptedModel>,
}

impl ProviderFactory for ScriptedFactory {
    fn create(&self, api_key: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ScrapeError> {
        self.model.keys.lock().unwrap().push((api_key.to_string(), model.to_string()));
        Ok(Arc::new(ScriptedProvider { model: self.model.clone(), name: model.to_string() }))
    }
}

pub fn extractor(model: &Arc<ScriptedModel>) -> Arc<ExtractionClient> {
    Arc::new(
        ExtractionClient::new(
            Arc::new(ScriptedFactory { model: model.clone() }),
            "openai",
            Some("sk-config"),
            "gpt-5-mini-2025-08-07",
        )
        .with_timeout(Duration::from_secs(5)),
    )
}

pub fn capture_engine(site: &Arc<FakeSite>) -> Arc<CaptureEngine> {
    Arc::new(CaptureEngine::new(
        Arc::new(FakeEngine { site: site.clone() }),
        SessionStore::disabled(),
        PageOptions::default(),
    ))
}

pub fn orchestrator(site: &Arc<FakeSite>, model: &Arc<ScriptedModel>, attempts: u32) -> ScrapeOrchestrator {
    ScrapeOrchestrator::new(capture_engine(site), extractor(model), RetryConfig::immediate(attempts), 3)
}

/// Capture options that skip scrolling so tests never sleep.
pub fn quick_capture() -> CaptureOptions {
    CaptureOptions { auto_scroll: false, ..CaptureOptions::default() }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.llm.api_key = Some("sk-config".into());
    settings.scraping.retry_attempts = 1;
    settings
}

pub fn runtime(site: &Arc<FakeSite>, model: &Arc<ScriptedModel>) -> Runtime {
    Runtime::with_components(
        test_settings(),
        Arc::new(FakeEngine { site: site.clone() }),
        Arc::new(ScriptedFactory { model: model.clone() }),
        Database::in_memory().unwrap(),
        SessionStore::disabled(),
    )
    .unwrap()
}

pub fn list_reply(titles: &[&str]) -> String {
    let items: Vec<Value> = titles.iter().map(|t| json!({"title": t, "description": null})).collect();
    json!({"items": items, "total_count": titles.len()}).to_string()
}
