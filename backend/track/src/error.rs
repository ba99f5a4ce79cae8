use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {0}")]
    Status(StatusCode),

    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}
