//! Error type system for the feedback backend
//!
//! This module provides:
//! - The error taxonomy shared by the auth and feedback layers
//! - HTTP status code mapping
//! - Client-safe error bodies carrying a trace ID

use crate::api::middleware::current_trace_id;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Message returned for every failed login, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email/password pair";

/// Message returned to clients for server-side failures.
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Main error type for the backend
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client input errors
    #[error("{0}")]
    ValidationError(String),

    #[error("An account already exists for this email")]
    DuplicateEmail,

    // Authentication errors
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    InvalidOrExpiredToken(String),

    #[error("{0}")]
    NotFound(String),

    // Collaborator failures
    #[error("Failed to send email: {0}")]
    EmailDeliveryError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    // System-level errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task error: {0}")]
    TaskError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::DuplicateEmail
            | AppError::InvalidOrExpiredToken(_) => StatusCode::BAD_REQUEST,

            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            AppError::EmailDeliveryError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_)
            | AppError::TaskError(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type name for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "ValidationError",
            AppError::DuplicateEmail => "DuplicateEmail",
            AppError::InvalidCredentials => "InvalidCredentials",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::InvalidOrExpiredToken(_) => "InvalidOrExpiredToken",
            AppError::NotFound(_) => "NotFound",
            AppError::EmailDeliveryError(_) => "EmailDeliveryError",
            AppError::DatabaseError(_)
            | AppError::ConfigError(_)
            | AppError::TaskError(_)
            | AppError::InternalError(_) => "InternalError",
        }
    }

    /// Message that is safe to show to a client.
    ///
    /// Server-side failures never leak their cause; it only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            AppError::EmailDeliveryError(_) => {
                "An error occurred while sending the email".to_string()
            }
            AppError::DatabaseError(_)
            | AppError::ConfigError(_)
            | AppError::TaskError(_)
            | AppError::InternalError(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique trace ID for this error
    pub trace_id: String,
}

impl ErrorResponse {
    /// Create a new error response tagged with the current request's trace ID,
    /// or a fresh one outside of a request
    pub fn new(error: String, message: String) -> Self {
        Self {
            error,
            message,
            trace_id: current_trace_id().unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }

    /// Create an error response from an AppError
    pub fn from_error(error: &AppError) -> Self {
        Self::new(error.error_type().to_string(), error.public_message())
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (trace_id: {})", self.error, self.message, self.trace_id)
    }
}

/// Implement IntoResponse for AppError to enable automatic error handling in Axum
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = ErrorResponse::from_error(&self);

        if status_code.is_server_error() {
            tracing::error!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request failed: {}",
                self
            );
        } else {
            tracing::warn!(
                error_type = self.error_type(),
                trace_id = %error_response.trace_id,
                status_code = %status_code,
                "Request rejected: {}",
                self
            );
        }

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can fail with AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::ValidationError("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::DuplicateEmail.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Unauthorized("test".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::InvalidOrExpiredToken("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("test".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::EmailDeliveryError("smtp down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::DatabaseError(rusqlite::Error::InvalidQuery).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_types() {
        assert_eq!(AppError::DuplicateEmail.error_type(), "DuplicateEmail");
        assert_eq!(
            AppError::TaskError("join".into()).error_type(),
            "InternalError"
        );
    }

    #[test]
    fn test_internal_details_are_not_public() {
        let error = AppError::InternalError("pool exhausted at db.rs:42".into());
        let response = ErrorResponse::from_error(&error);

        assert_eq!(response.error, "InternalError");
        assert_eq!(response.message, INTERNAL_ERROR_MESSAGE);
        assert!(!response.message.contains("db.rs"));

        let error = AppError::EmailDeliveryError("535 auth failed".into());
        assert!(!error.public_message().contains("535"));
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let error = AppError::ValidationError("Invalid email address".into());
        let response = ErrorResponse::from_error(&error);

        assert_eq!(response.message, "Invalid email address");
        assert!(!response.trace_id.is_empty());
        assert_eq!(
            AppError::InvalidCredentials.public_message(),
            INVALID_CREDENTIALS_MESSAGE
        );
    }
}
