use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cached_input_tokens: u64,
}

impl ExtractionUsage {
    pub fn add(&mut self, other: &ExtractionUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
        self.cached_input_tokens += other.cached_input_tokens;
    }
}

/// Whether the model key came with the request or from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeySource {
    Request,
    Config,
}

impl ApiKeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Config => "config",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub raw_data: Value,
    pub usage: ExtractionUsage,
    pub model: String,
    pub cost_usd: f64,
    pub api_key_source: ApiKeySource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: f64,
    pub flags: Vec<String>,
    pub required_total: usize,
    pub required_present: usize,
}

impl QualityReport {
    /// Report attached to records that failed validation outright.
    pub fn rejected() -> Self {
        Self {
            score: 0.0,
            flags: vec!["schema_validation_error".to_string()],
            required_total: 0,
            required_present: 0,
        }
    }
}

/// Outcome of validating model output against a schema.
///
/// Either carries typed data and no errors, or no data and at least one error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    typed_data: Option<Value>,
    quality: QualityReport,
    errors: Vec<String>,
}

impl ValidatedRecord {
    pub fn valid(data: Value, quality: QualityReport) -> Self {
        Self { typed_data: Some(data), quality, errors: Vec::new() }
    }

    pub fn invalid(mut errors: Vec<String>) -> Self {
        if errors.is_empty() {
            errors.push("validation failed".to_string());
        }
        Self { typed_data: None, quality: QualityReport::rejected(), errors }
    }

    pub fn is_valid(&self) -> bool {
        self.typed_data.is_some()
    }

    pub fn typed_data(&self) -> Option<&Value> {
        self.typed_data.as_ref()
    }

    pub fn quality(&self) -> &QualityReport {
        &self.quality
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_parts(self) -> (Option<Value>, QualityReport, Vec<String>) {
        (self.typed_data, self.quality, self.errors)
    }
}
