use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::browser::CaptureEngine;
use crate::db::Database;
use crate::errors::{with_retry, ErrorKind, RetryConfig, ScrapeError};
use crate::llm::ExtractionClient;
use crate::models::{AttemptMetadata, AttemptResult};
use crate::validator::validate;
use super::metrics::ScrapeMetrics;
use super::origin::{origin_of, OriginRegistry, OriginState};
use super::state::ScrapeRequest;

/// render -> extract -> validate, under per-origin limits, a circuit breaker
/// and classified retries. Every call yields exactly one stored attempt.
pub struct ScrapeOrchestrator {
    capture: Arc<CaptureEngine>,
    extractor: Arc<ExtractionClient>,
    storage: Option<Database>,
    metrics: Option<Arc<ScrapeMetrics>>,
    origins: OriginRegistry,
    retry: RetryConfig,
}

impl ScrapeOrchestrator {
    pub fn new(
        capture: Arc<CaptureEngine>,
        extractor: Arc<ExtractionClient>,
        retry: RetryConfig,
        origin_limit: usize,
    ) -> Self {
        Self {
            capture,
            extractor,
            storage: None,
            metrics: None,
            origins: OriginRegistry::new(origin_limit),
            retry,
        }
    }

    pub fn with_storage(mut self, db: Database) -> Self {
        self.storage = Some(db);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ScrapeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn origins(&self) -> &OriginRegistry {
        &self.origins
    }

    pub async fn scrape(&self, request: &ScrapeRequest) -> AttemptResult {
        let started = Instant::now();
        let origin = origin_of(&request.url);
        info!(url = %request.url, origin = %origin, schema = request.schema.name(), "Starting scrape");

        let rejected: Mutex<Option<AttemptResult>> = Mutex::new(None);
        let outcome = {
            let origin = origin.as_str();
            let rejected = &rejected;
            with_retry("scrape", &self.retry, move |_| self.run_attempt(request, origin, rejected)).await
        };

        let mut result = match outcome {
            Ok(result) => result,
            Err(e) => {
                let stashed = match &e {
                    ScrapeError::Validation(_) => rejected.lock().ok().and_then(|mut slot| slot.take()),
                    _ => None,
                };
                stashed.unwrap_or_else(|| failure_result(request, &e, started.elapsed().as_secs_f64()))
            }
        };
        result.metadata.extra.extend(request.extra_metadata.clone());

        if let Some(db) = &self.storage {
            match db.save_attempt(&result) {
                Ok(id) => result.record_id = Some(id),
                Err(e) => error!(url = %request.url, error = %e, "Failed to persist attempt"),
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.observe(&result, started.elapsed().as_secs_f64());
        }

        if result.success {
            info!(url = %request.url, record_id = ?result.record_id, cost_usd = result.metadata.cost_usd, "Scrape succeeded");
        } else {
            warn!(
                url = %request.url,
                error_type = ?result.metadata.error_type,
                error = result.error.as_deref().unwrap_or_default(),
                "Scrape failed"
            );
        }
        result
    }

    /// Scrape several requests concurrently, at most `concurrency` in flight.
    /// Results keep the order of `requests`; per-origin limits still apply.
    pub async fn scrape_many(&self, requests: &[ScrapeRequest], concurrency: usize) -> Vec<AttemptResult> {
        info!(count = requests.len(), concurrency, "Starting batch scrape");
        stream::iter(requests)
            .map(|request| self.scrape(request))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    async fn run_attempt(
        &self,
        request: &ScrapeRequest,
        origin: &str,
        rejected: &Mutex<Option<AttemptResult>>,
    ) -> Result<AttemptResult, ScrapeError> {
        let state = self.origins.check(origin)?;
        let outcome = self.attempt_once(request, origin, &state, rejected).await;
        match &outcome {
            Ok(_) => state.record_success(),
            Err(ScrapeError::CircuitOpen(_)) => {}
            Err(e) => {
                let failures = state.record_failure();
                warn!(origin, failures, error_type = %e.classify().kind, "Attempt failed");
            }
        }
        outcome
    }

    async fn attempt_once(
        &self,
        request: &ScrapeRequest,
        origin: &str,
        state: &OriginState,
        rejected: &Mutex<Option<AttemptResult>>,
    ) -> Result<AttemptResult, ScrapeError> {
        let started = Instant::now();
        let (capture, extraction) = {
            let _permit = state.acquire().await?;
            // The breaker may have opened while this attempt was queued.
            state.ensure_closed(origin)?;
            let capture = self.capture.capture(&request.url, &request.capture).await?;
            let extraction = self.extractor
                .extract(
                    &capture,
                    request.schema.as_ref(),
                    request.system_prompt.as_deref(),
                    request.goal.as_deref(),
                    request.output_style,
                    &request.credentials,
                )
                .await?;
            (capture, extraction)
        };

        let (typed_data, quality, errors) = validate(&extraction.raw_data, request.schema.as_ref()).into_parts();
        let mut metadata = AttemptMetadata {
            url: request.url.clone(),
            model_used: Some(extraction.model.clone()),
            tokens_used: extraction.usage.total_tokens,
            cost_usd: extraction.cost_usd,
            duration_seconds: started.elapsed().as_secs_f64(),
            page: Some(capture.meta),
            extraction_goal: request.goal.clone(),
            error_type: None,
            retryable: Some(false),
            quality: Some(quality),
            api_key_source: Some(extraction.api_key_source.as_str().to_string()),
            ..Default::default()
        };

        match typed_data {
            Some(data) => Ok(AttemptResult {
                success: true,
                data: Some(data),
                metadata,
                ..Default::default()
            }),
            None => {
                metadata.error_type = Some(ErrorKind::Validation);
                let message = errors.join("; ");
                if let Ok(mut slot) = rejected.lock() {
                    *slot = Some(AttemptResult {
                        success: false,
                        error: Some("Validation failed".to_string()),
                        validation_errors: errors,
                        metadata,
                        ..Default::default()
                    });
                }
                Err(ScrapeError::Validation(message))
            }
        }
    }
}

fn failure_result(request: &ScrapeRequest, error: &ScrapeError, duration_seconds: f64) -> AttemptResult {
    let classification = error.classify();
    AttemptResult {
        success: false,
        error: Some(error.to_string()),
        metadata: AttemptMetadata {
            url: request.url.clone(),
            duration_seconds,
            extraction_goal: request.goal.clone(),
            error_type: Some(classification.kind),
            retryable: Some(classification.retryable),
            ..Default::default()
        },
        ..Default::default()
    }
}
