use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::models::HistoryQuery;
use crate::api::AppState;
use crate::db::attempts::DEFAULT_HISTORY_LIMIT;
use crate::db::HistoryFilter;
use crate::errors::ScrapeError;

pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ScrapeError> {
    let filter = HistoryFilter {
        limit: query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        success: query.success,
        domain: query.domain,
    };
    let items = state.runtime.db.list_recent(&filter)?;
    Ok(Json(json!({ "success": true, "count": items.len(), "items": items })))
}
