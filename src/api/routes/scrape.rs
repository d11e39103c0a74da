use axum::{extract::State, Json};
use serde_json::Value;
use tracing::info;

use crate::api::models::ScrapeBody;
use crate::api::AppState;
use crate::errors::ScrapeError;

/// Always answers with the attempt record, including failed attempts.
pub async fn scrape(
    State(state): State<AppState>,
    Json(body): Json<ScrapeBody>,
) -> Result<Json<Value>, ScrapeError> {
    let request = body.into_request()?;
    info!(url = %request.url, schema = request.schema.name(), "Scrape requested");
    let result = state.runtime.orchestrator.scrape(&request).await;
    Ok(Json(serde_json::to_value(result)?))
}
