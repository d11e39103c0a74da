pub mod metrics;
pub mod orchestrator;
pub mod origin;
pub mod state;

pub use metrics::ScrapeMetrics;
pub use orchestrator::ScrapeOrchestrator;
pub use origin::{origin_of, OriginRegistry, BREAKER_THRESHOLD};
pub use state::ScrapeRequest;
