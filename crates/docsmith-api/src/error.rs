//! Error types for the Docsmith API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docsmith_auth::AuthError;
use docsmith_common::DocsmithError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Main error type for the Docsmith API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] docsmith_common::ConfigurationError),

    /// Authorization flow error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Bad request with message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Internal server error
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

/// Alias kept for call sites that read better as `Error`
pub type Error = ApiError;

impl DocsmithError for ApiError {}

impl ApiError {
    /// Get error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Config(_) => "DOCSMITH_API_CONFIG_ERROR",
            ApiError::Auth(e) => match e {
                AuthError::NetworkError(_) => "DOCSMITH_API_PROVIDER_UNREACHABLE",
                AuthError::InvalidResponse(_) => "DOCSMITH_API_PROVIDER_ERROR",
                AuthError::RefreshRevoked(_) => "DOCSMITH_API_REFRESH_REVOKED",
                AuthError::MissingRefreshToken => "DOCSMITH_API_MISSING_REFRESH_TOKEN",
                AuthError::StateMismatch => "DOCSMITH_API_STATE_MISMATCH",
                AuthError::AuthorizationDenied(_) => "DOCSMITH_API_AUTHORIZATION_DENIED",
                AuthError::Persistence(_) => "DOCSMITH_API_STORAGE_ERROR",
                AuthError::ConfigError(_) => "DOCSMITH_API_CONFIG_ERROR",
            },
            ApiError::BadRequest { .. } => "DOCSMITH_API_BAD_REQUEST",
            ApiError::Internal { .. } => "DOCSMITH_API_INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(AuthError::StateMismatch) | ApiError::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Auth(AuthError::AuthorizationDenied(_) | AuthError::RefreshRevoked(_)) => {
                StatusCode::FORBIDDEN
            }
            ApiError::Auth(AuthError::InvalidResponse(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Auth(AuthError::NetworkError(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Auth(_) | ApiError::Config(_) | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Auth(AuthError::NetworkError(_)))
    }

    /// Check if error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), "Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now(),
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetails,
}

/// Error details structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// ISO 8601 timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Whether the error is retryable
    pub retryable: bool,
}
