use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed circuit key: {0:?}")]
    MalformedCircuit(String),

    #[error("Track geometry not found for: {0}")]
    TrackNotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedCircuit { .. } => StatusCode::BAD_REQUEST,
            AppError::TrackNotFound { .. } => StatusCode::NOT_FOUND,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
