use std::sync::Arc;

use serde_json::{Map, Value};

use crate::browser::CaptureOptions;
use crate::llm::{ModelCredentials, OutputStyle};
use crate::schema::ExtractionSchema;

/// Everything one `scrape` call needs. Cheap to clone.
#[derive(Clone)]
pub struct ScrapeRequest {
    pub url: String,
    pub schema: Arc<dyn ExtractionSchema>,
    pub capture: CaptureOptions,
    pub system_prompt: Option<String>,
    pub goal: Option<String>,
    pub output_style: OutputStyle,
    pub credentials: ModelCredentials,
    /// Merged into the attempt metadata, success or failure.
    pub extra_metadata: Map<String, Value>,
}

impl ScrapeRequest {
    pub fn new(url: &str, schema: Arc<dyn ExtractionSchema>) -> Self {
        Self {
            url: url.to_string(),
            schema,
            capture: CaptureOptions::default(),
            system_prompt: None,
            goal: None,
            output_style: OutputStyle::default(),
            credentials: ModelCredentials::default(),
            extra_metadata: Map::new(),
        }
    }

    pub fn with_capture(mut self, capture: CaptureOptions) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_goal(mut self, goal: Option<String>) -> Self {
        self.goal = goal.filter(|g| !g.trim().is_empty());
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_output_style(mut self, style: OutputStyle) -> Self {
        self.output_style = style;
        self
    }

    pub fn with_credentials(mut self, credentials: ModelCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_extra_metadata(mut self, extra: Map<String, Value>) -> Self {
        self.extra_metadata = extra;
        self
    }
}

impl std::fmt::Debug for ScrapeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeRequest")
            .field("url", &self.url)
            .field("schema", &self.schema.name())
            .field("goal", &self.goal)
            .field("output_style", &self.output_style)
            .finish_non_exhaustive()
    }
}
