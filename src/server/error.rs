//! Error types for the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::DistillError;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed request: missing file, bad query value, unreadable form.
    #[error("{0}")]
    BadRequest(String),

    /// Upload exceeded the configured body limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Pipeline error.
    #[error(transparent)]
    Distill(#[from] DistillError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Distill(e) if e.is_input_error() => StatusCode::BAD_REQUEST,
            ServerError::Distill(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, error = %message, "Client error");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
