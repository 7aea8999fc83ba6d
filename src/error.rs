//! Error types for metadata extraction and API responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single gguf-parser invocation
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The remote file does not exist; retrying cannot help
    #[error("file not found: {message}")]
    NotFound { message: String },

    #[error("gguf-parser not found at {path:?}")]
    ToolUnavailable { path: PathBuf },

    #[error("gguf-parser timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("gguf-parser exited with {code:?}: {stderr}")]
    ToolFailed { code: Option<i32>, stderr: String },

    #[error("malformed gguf-parser output: {reason}")]
    MalformedOutput { reason: String },

    #[error("failed to run gguf-parser: {reason}")]
    Spawn { reason: String },
}

impl ExtractError {
    /// Whether another attempt at the same locator may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound { .. } | Self::ToolUnavailable { .. })
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ToolUnavailable { .. } => "tool_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::ToolFailed { .. } => "tool_failed",
            Self::MalformedOutput { .. } => "malformed_output",
            Self::Spawn { .. } => "spawn",
        }
    }
}

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            timestamp: chrono::Utc::now(),
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}
