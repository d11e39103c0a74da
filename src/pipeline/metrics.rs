use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

use crate::errors::{ErrorKind, ScrapeError};
use crate::models::AttemptResult;

/// Prometheus text exposition content type.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Scrape outcome counters, one registry per runtime.
#[derive(Clone)]
pub struct ScrapeMetrics {
    registry: Registry,
    requests: CounterVec,
    duration: Histogram,
    cost_usd: Counter,
    validation_failures: Counter,
}

impl ScrapeMetrics {
    pub fn new() -> Result<Self, ScrapeError> {
        let registry = Registry::new();
        let requests = CounterVec::new(
            Opts::new("scrape_requests_total", "Scrape requests by outcome"),
            &["status", "error_type"],
        )?;
        let duration = Histogram::with_opts(HistogramOpts::new(
            "scrape_duration_seconds",
            "Wall time of a scrape call, retries included",
        ))?;
        let cost_usd = Counter::with_opts(Opts::new("scrape_cost_usd_total", "Model spend in USD"))?;
        let validation_failures = Counter::with_opts(Opts::new(
            "scrape_validation_failures_total",
            "Scrapes rejected by schema validation",
        ))?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(cost_usd.clone()))?;
        registry.register(Box::new(validation_failures.clone()))?;

        Ok(Self { registry, requests, duration, cost_usd, validation_failures })
    }

    /// Account for one finished scrape call.
    pub fn observe(&self, result: &AttemptResult, elapsed_seconds: f64) {
        self.duration.observe(elapsed_seconds);
        let cost = result.metadata.cost_usd;
        if cost.is_finite() && cost > 0.0 {
            self.cost_usd.inc_by(cost);
        }
        if result.success {
            self.requests.with_label_values(&["success", "none"]).inc();
            return;
        }
        let kind = result.error_kind().unwrap_or(ErrorKind::Unknown);
        self.requests.with_label_values(&["error", kind.as_str()]).inc();
        if kind == ErrorKind::Validation {
            self.validation_failures.inc();
        }
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, ScrapeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ScrapeError::Internal(format!("metrics are not UTF-8: {}", e)))
    }

    pub fn requests(&self, status: &str, error_type: &str) -> f64 {
        self.requests.with_label_values(&[status, error_type]).get()
    }

    pub fn validation_failures(&self) -> f64 {
        self.validation_failures.get()
    }

    pub fn cost_usd(&self) -> f64 {
        self.cost_usd.get()
    }
}
