use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::api::AppState;
use crate::errors::ScrapeError;
use crate::pipeline::metrics::METRICS_CONTENT_TYPE;

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ScrapeError> {
    let body = state.runtime.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body))
}
