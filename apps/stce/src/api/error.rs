//! HTTP error handling and response formatting.
//!
//! Every failing handler answers with `{"code": "...", "error": "..."}`.
//! Internal failures are logged and reported with a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use stce_core::StceError;
use thiserror::Error;

/// JSON error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: error.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] StceError),

    /// Body, query or path could not be parsed.
    #[error("{0}")]
    BadRequest(String),

    #[error("too many requests")]
    RateLimited,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Core(StceError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Core(StceError::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Core(StceError::BadRequest(_)) | Self::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            Self::Core(StceError::Forbidden(_)) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Core(StceError::Unauthorized(_)) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::Core(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
