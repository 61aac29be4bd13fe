//! API error handling for consistent JSON error responses.

use crate::playback::PlaybackError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error type that converts to JSON responses.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: Option<&'static str>,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            kind: None,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": true,
            "kind": self.kind,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<PlaybackError> for ApiError {
    fn from(err: PlaybackError) -> Self {
        let status = match err {
            PlaybackError::InvalidUserInput(_) => StatusCode::BAD_REQUEST,
            PlaybackError::InvalidStreamFormat(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PlaybackError::TransientIoFailure(_) => StatusCode::BAD_GATEWAY,
            PlaybackError::ResourceReleaseFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: Some(err.kind()),
            message: err.to_string(),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
