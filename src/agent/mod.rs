//! Autonomous browsing: a planner picks actions, the executor runs them and
//! guardrails decide when to stop.

pub mod buffer;
pub mod executor;
pub mod guardrails;
pub mod planner;
pub mod runner;

pub use buffer::ExtractionBuffer;
pub use planner::{LlmPlanner, Planner};
pub use runner::{AgentLoop, AgentRequest, DEFAULT_MAX_STEPS};
