use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;
use url::Url;

use crate::errors::ScrapeError;

/// Consecutive failures after which an origin is short-circuited.
pub const BREAKER_THRESHOLD: u32 = 4;

/// Lower-cased `host[:port]` of a URL, or `unknown`.
pub fn origin_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            let host = u.host_str()?.to_lowercase();
            Some(match u.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host,
            })
        })
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug)]
pub struct OriginState {
    failures: AtomicU32,
    limiter: Arc<Semaphore>,
}

impl OriginState {
    fn new(permits: usize) -> Self {
        Self { failures: AtomicU32::new(0), limiter: Arc::new(Semaphore::new(permits)) }
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.failures() >= BREAKER_THRESHOLD
    }

    /// Fails fast when this origin's breaker is open.
    pub fn ensure_closed(&self, origin: &str) -> Result<(), ScrapeError> {
        if !self.is_open() {
            return Ok(());
        }
        warn!(origin, failures = self.failures(), "Circuit open, skipping attempt");
        Err(ScrapeError::CircuitOpen(format!(
            "Circuit breaker open for {} after {} consecutive failures",
            origin,
            self.failures()
        )))
    }

    pub fn record_failure(&self) -> u32 {
        self.failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_success(&self) {
        self.failures.store(0, Ordering::SeqCst);
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, ScrapeError> {
        self.limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScrapeError::Internal("origin limiter closed".into()))
    }

    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }
}

/// Per-origin breaker and concurrency limit, for the lifetime of one orchestrator.
#[derive(Debug)]
pub struct OriginRegistry {
    origins: DashMap<String, Arc<OriginState>>,
    permits: usize,
}

impl OriginRegistry {
    pub fn new(permits: usize) -> Self {
        Self { origins: DashMap::new(), permits: permits.max(1) }
    }

    pub fn state(&self, origin: &str) -> Arc<OriginState> {
        self.origins
            .entry(origin.to_string())
            .or_insert_with(|| Arc::new(OriginState::new(self.permits)))
            .clone()
    }

    /// Fails fast when the breaker for `origin` is open.
    pub fn check(&self, origin: &str) -> Result<Arc<OriginState>, ScrapeError> {
        let state = self.state(origin);
        state.ensure_closed(origin)?;
        Ok(state)
    }

    pub fn failures(&self, origin: &str) -> u32 {
        self.origins.get(origin).map(|s| s.failures()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_of() {
        assert_eq!(origin_of("https://Shop.Example.com/a?b=1"), "shop.example.com");
        assert_eq!(origin_of("http://localhost:8080/x"), "localhost:8080");
        assert_eq!(origin_of("https://a.example:443/"), "a.example");
        assert_eq!(origin_of("not a url"), "unknown");
        assert_eq!(origin_of("mailto:someone@example.com"), "unknown");
    }

    #[test]
    fn test_breaker_opens_at_threshold_and_resets() {
        let registry = OriginRegistry::new(3);
        let state = registry.state("a.example");
        for _ in 0..BREAKER_THRESHOLD - 1 {
            state.record_failure();
        }
        assert!(registry.check("a.example").is_ok());
        state.record_failure();

        let err = registry.check("a.example").unwrap_err();
        assert!(matches!(err, ScrapeError::CircuitOpen(_)));
        assert!(registry.check("b.example").is_ok());

        state.record_success();
        assert_eq!(registry.failures("a.example"), 0);
        assert!(registry.check("a.example").is_ok());
    }

    #[tokio::test]
    async fn test_limiter_is_shared_per_origin() {
        let registry = OriginRegistry::new(2);
        let first = registry.state("a.example");
        let again = registry.state("a.example");
        let _p1 = first.acquire().await.unwrap();
        let _p2 = again.acquire().await.unwrap();
        assert_eq!(first.available_permits(), 0);
        assert_eq!(registry.state("b.example").available_permits(), 2);
    }
}
