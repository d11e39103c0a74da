use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::capture::NavigationMeta;
use super::extraction::QualityReport;
use crate::errors::ErrorKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptMetadata {
    pub url: String,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost_usd: f64,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub page: Option<NavigationMeta>,
    #[serde(default)]
    pub extraction_goal: Option<String>,
    #[serde(default)]
    pub error_type: Option<ErrorKind>,
    #[serde(default)]
    pub retryable: Option<bool>,
    #[serde(default)]
    pub quality: Option<QualityReport>,
    #[serde(default)]
    pub api_key_source: Option<String>,
    /// Caller-supplied metadata merged into the result.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Uniform outcome of one scrape request, success or failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
    #[serde(default)]
    pub record_id: Option<i64>,
    pub metadata: AttemptMetadata,
}

impl AttemptResult {
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.metadata.error_type
    }
}
