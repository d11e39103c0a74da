use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::api::models::AgentBody;
use crate::api::AppState;
use crate::errors::ScrapeError;

pub async fn run_agent(
    State(state): State<AppState>,
    Json(body): Json<AgentBody>,
) -> Result<Json<Value>, ScrapeError> {
    let request = body.into_request()?;
    let response = state.runtime.agent.run(&request).await?;
    Ok(Json(serde_json::to_value(response)?))
}

pub async fn execution_steps(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let steps = state.runtime.db.get_execution_steps(&id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"success": false, "error": e.to_string()}))))?;
    if steps.is_empty() && matches!(state.runtime.db.get_agent_execution(&id), Ok(None)) {
        return Err((StatusCode::NOT_FOUND, Json(json!({"success": false, "error": "Execution not found"}))));
    }
    Ok(Json(json!({ "success": true, "execution_id": id, "count": steps.len(), "steps": steps })))
}
