//! HTTP error type for the `vaultkeep` server.
//!
//! Maps domain errors from `vaultkeep-core` into HTTP responses. Every error
//! variant produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`. Internal failures are logged here and reach the
//! client only as a generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use vaultkeep_core::error::{AccountError, GeneratorError, VaultError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Client sent invalid input.
    BadRequest(String),
    /// Missing or invalid credentials.
    Unauthorized(String),
    /// Requested resource not found (or not the caller's).
    NotFound(String),
    /// Internal server error. The detail is logged, never returned.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Validation(msg) => Self::BadRequest(msg),
            VaultError::NotFound => Self::NotFound(err.to_string()),
            VaultError::Crypto(_) | VaultError::Repository(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(msg) => Self::BadRequest(msg),
            AccountError::AlreadyExists => Self::BadRequest(err.to_string()),
            AccountError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AccountError::NotFound => Self::NotFound(err.to_string()),
            AccountError::Credential(_) | AccountError::Repository(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

/// Request bodies that fail to parse as the expected JSON. The parser's
/// detail is logged at debug and not echoed back.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "rejected request body");
        Self::BadRequest("Invalid request body".to_owned())
    }
}

impl From<GeneratorError> for AppError {
    fn from(err: GeneratorError) -> Self {
        Self::BadRequest(err.to_string())
    }
}
