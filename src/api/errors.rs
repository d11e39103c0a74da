use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use crate::errors::ScrapeError;

pub fn status_for(error: &ScrapeError) -> StatusCode {
    match error {
        ScrapeError::Config(_) => StatusCode::BAD_REQUEST,
        ScrapeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScrapeError::ModelAuth(_) => StatusCode::UNAUTHORIZED,
        ScrapeError::Blocked(_) | ScrapeError::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
        ScrapeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ScrapeError::Model(_) | ScrapeError::Network(_) | ScrapeError::Browser(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> axum::response::Response {
        let status = status_for(&self);
        let body = json!({
            "success": false,
            "error": self.to_string(),
            "error_type": self.classify().kind,
        });
        (status, Json(body)).into_response()
    }
}
