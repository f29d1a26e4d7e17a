/// Unified error types for Clipstream
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced entity is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor lacks ownership or role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness violation that is not absorbed as idempotent success
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Acknowledge called before every asset part was uploaded
    #[error("Asset missing: {0}")]
    AssetMissing(String),

    /// Malformed payload
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// External dependency (object store, search index) did not respond
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Counter cache has never been reconciled
    #[error("Counters not initialized")]
    NotInitialized,

    /// Caller-supplied deadline elapsed; in-flight work was rolled back
    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// Missing or invalid credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Storage transaction failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden", self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            AppError::AssetMissing(_) => {
                (StatusCode::PRECONDITION_FAILED, "AssetMissing", self.to_string())
            }
            AppError::InvalidArgument(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            AppError::Unavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Unavailable", self.to_string())
            }
            AppError::NotInitialized => {
                (StatusCode::NOT_FOUND, "CountersNotInitialized", self.to_string())
            }
            AppError::DeadlineExceeded(_) => {
                (StatusCode::GATEWAY_TIMEOUT, "DeadlineExceeded", self.to_string())
            }
            AppError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            AppError::Database(_) | AppError::Internal(_) | AppError::Io(_) => {
                tracing::error!(error = %self, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl AppError {
    /// True for failures of the transactional storage layer
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Internal(_) | AppError::Io(_)
        )
    }
}

/// Result type alias for service operations
pub type AppResult<T> = Result<T, AppError>;
