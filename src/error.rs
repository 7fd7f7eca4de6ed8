//! Error types for the job notification service.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application-level errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Backend jobs API call failed
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_code, response_message) = match self {
            AppError::InvalidInput(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                self.to_string(),
            ),
            AppError::Unauthorized(_) => (
                actix_web::http::StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                self.to_string(),
            ),
            AppError::Upstream(err_str) => {
                tracing::error!("Upstream error: {}", err_str);
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "The jobs service could not be reached".to_string(),
                )
            }
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code.to_string(),
            message: response_message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

/// A raw job record could not be turned into job details.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    #[error("job record has no job id")]
    MissingJobId,
}

/// Failure in one of the channels that deliver job records (push or poll).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("jobs API request failed: {0}")]
    Request(String),

    #[error("jobs API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("jobs API response could not be decoded: {0}")]
    Decode(String),

    #[error("push channel disconnected")]
    Disconnected,

    #[error("missed {0} pushed job records")]
    Missed(u64),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Error surfaced to a subscription through its `on_error` callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),
}
