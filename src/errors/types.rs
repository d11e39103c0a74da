use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Blocked: {0}")]
    Blocked(String),

    #[error("Circuit open: {0}")]
    CircuitOpen(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Model authentication error: {0}")]
    ModelAuth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScrapeError {
    /// True for engine-level timeouts (navigation, selector waits).
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScrapeError::Timeout(_))
    }
}
