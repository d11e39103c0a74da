use serde::{Deserialize, Serialize};
use super::types::ScrapeError;

/// Failure kinds reported on every attempt. Retry and circuit-breaker
/// decisions are taken from these alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Blocked,
    Model,
    Network,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Blocked => "blocked",
            Self::Model => "model",
            Self::Network => "network",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClassification {
    pub kind: ErrorKind,
    pub retryable: bool,
}

impl ScrapeError {
    /// Classify this error to determine its kind and whether it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        let (kind, retryable) = match self {
            ScrapeError::Validation(_) => (ErrorKind::Validation, false),
            ScrapeError::Blocked(_) => (ErrorKind::Blocked, true),
            // An open breaker cannot close without a success on the same origin,
            // so another attempt inside this call would short-circuit again.
            ScrapeError::CircuitOpen(_) => (ErrorKind::Blocked, false),
            ScrapeError::Model(_) => (ErrorKind::Model, true),
            ScrapeError::ModelAuth(_) => (ErrorKind::Model, false),
            ScrapeError::Network(_) => (ErrorKind::Network, true),
            ScrapeError::Timeout(_) => (ErrorKind::Network, true),
            ScrapeError::Browser(_) => (ErrorKind::Network, true),
            ScrapeError::Config(_)
            | ScrapeError::Database(_)
            | ScrapeError::Io(_)
            | ScrapeError::Json(_)
            | ScrapeError::Yaml(_)
            | ScrapeError::Metrics(_)
            | ScrapeError::Internal(_) => (ErrorKind::Unknown, false),
        };
        ErrorClassification { kind, retryable }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_never_retried() {
        let class = ScrapeError::Validation("missing field".into()).classify();
        assert_eq!(class.kind, ErrorKind::Validation);
        assert!(!class.retryable);
    }

    #[test]
    fn test_blocked_is_retryable() {
        let class = ScrapeError::Blocked("captcha".into()).classify();
        assert_eq!(class.kind, ErrorKind::Blocked);
        assert!(class.retryable);
    }

    #[test]
    fn test_circuit_open_reports_blocked() {
        let class = ScrapeError::CircuitOpen("example.com".into()).classify();
        assert_eq!(class.kind, ErrorKind::Blocked);
        assert!(!class.retryable);
    }

    #[test]
    fn test_model_retryable_but_auth_is_not() {
        assert!(ScrapeError::Model("timeout".into()).classify().retryable);
        let auth = ScrapeError::ModelAuth("bad key".into()).classify();
        assert_eq!(auth.kind, ErrorKind::Model);
        assert!(!auth.retryable);
    }

    #[test]
    fn test_engine_failures_are_network() {
        for err in [
            ScrapeError::Network("reset".into()),
            ScrapeError::Timeout("goto".into()),
            ScrapeError::Browser("crashed".into()),
        ] {
            let class = err.classify();
            assert_eq!(class.kind, ErrorKind::Network);
            assert!(class.retryable);
        }
    }

    #[test]
    fn test_unknown_is_conservative() {
        let class = ScrapeError::Internal("boom".into()).classify();
        assert_eq!(class.kind, ErrorKind::Unknown);
        assert!(!class.retryable);
        assert!(!ScrapeError::Database("locked".into()).classify().retryable);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ErrorKind::Blocked).unwrap(), "\"blocked\"");
        assert_eq!(ErrorKind::Network.to_string(), "network");
    }
}
