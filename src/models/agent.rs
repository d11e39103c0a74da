use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::extraction::QualityReport;
use crate::errors::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Goto,
    Click,
    Type,
    Scroll,
    Wait,
    Back,
    OpenNewTab,
    Extract,
    Stop,
}

/// One planner decision. Produced by the planner, consumed by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    pub action: ActionKind,
    #[serde(default, deserialize_with = "loose_string")]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub reason: Option<String>,
}

impl AgentAction {
    pub fn new(action: ActionKind) -> Self {
        Self { action, target: None, value: None, reason: None }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Models sometimes answer `"value": 2` for a wait; accept scalars as strings.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// What the observer saw after a step. Rebuilt every step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    pub step_index: u32,
    pub current_url: String,
    pub title: String,
    pub text_excerpt: String,
    pub html_excerpt: String,
    pub screenshot_base64: Option<String>,
    pub last_action: Option<AgentAction>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub url: String,
    pub title: String,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStepResult {
    pub step_index: u32,
    pub action: AgentAction,
    pub success: bool,
    pub current_url: String,
    pub title: String,
    pub error: Option<String>,
    pub elapsed_seconds: f64,
    pub state_snapshot: StateSnapshot,
}

/// Why the agent loop ended. Exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    PlannerStop(String),
    PlannerExtract,
    SameUrlLoop,
    CaptchaOrBlocked,
    MaxStepsReached,
}

impl StopReason {
    pub fn reason(&self) -> &str {
        match self {
            Self::PlannerStop(reason) => reason,
            Self::PlannerExtract => "planner_extract",
            Self::SameUrlLoop => "same_url_loop",
            Self::CaptchaOrBlocked => "captcha_or_blocked",
            Self::MaxStepsReached => "max_steps_reached",
        }
    }

    pub fn condition(&self) -> StopCondition {
        let mut condition = StopCondition {
            reason: Some(self.reason().to_string()),
            ..StopCondition::default()
        };
        match self {
            Self::PlannerStop(_) | Self::PlannerExtract => condition.reached_goal = true,
            Self::SameUrlLoop => condition.no_progress = true,
            Self::CaptchaOrBlocked => condition.captcha_or_blocked = true,
            Self::MaxStepsReached => condition.max_steps_reached = true,
        }
        condition
    }
}

/// Flag-style view of a [`StopReason`], as reported to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCondition {
    pub reached_goal: bool,
    pub max_steps_reached: bool,
    pub captcha_or_blocked: bool,
    pub no_progress: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentExecutionMetadata {
    pub duration_seconds: f64,
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub quality: QualityReport,
    pub stop: StopCondition,
    pub error_type: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExecutionResponse {
    pub execution_id: String,
    pub success: bool,
    pub data: Option<Value>,
    pub metadata: AgentExecutionMetadata,
    pub steps: Vec<AgentStepResult>,
}
