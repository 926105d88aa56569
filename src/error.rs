//! Error types for fridge-ri
//!
//! One `ApiError` covers the HTTP surface; the extraction and record-store
//! clients keep their own error enums and are converted here at the
//! handler boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::extraction_client::ExtractionError;
use crate::services::session_controller::SessionError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., session already parsing or submitting
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream extraction service failure (502)
    #[error("Receipt extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Extraction(ref err) => (
                StatusCode::BAD_GATEWAY,
                "EXTRACTION_FAILED",
                err.to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => {
                ApiError::NotFound(format!("Review session not found: {}", id))
            }
            SessionError::ItemNotFound(index) => {
                ApiError::NotFound(format!("No draft item at index {}", index))
            }
            SessionError::InvalidInput(msg) => ApiError::BadRequest(msg),
            SessionError::Busy { operation, phase } => ApiError::Conflict(format!(
                "Cannot {} while session is {}",
                operation, phase
            )),
            SessionError::Extraction(err) => ApiError::Extraction(err),
            SessionError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
