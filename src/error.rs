//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

/// Application-wide error type.
///
/// Every feature operation returns `Result<T, AppError>`. A failure never
/// leaves a partial balance change behind: errors raised inside a database
/// transaction drop it, which rolls it back.
///
/// # Error Categories
///
/// - **Validation**: malformed input, amount below minimum, bad phone number
/// - **Precondition**: insufficient funds, locked account, inactive product, self-transfer
/// - **Not found**: missing account, recipient, provider or location
/// - **System**: database connectivity or transaction failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Session token is missing, malformed, expired, or the credentials are wrong.
    #[error("Unauthorized")]
    Unauthorized,

    /// The named resource does not exist or is not visible to the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A debit would take a balance below zero.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// A touched account has its lock flag set.
    #[error("Account is locked")]
    AccountLocked,

    /// Request body or parameters are invalid.
    ///
    /// The String contains details about what was invalid.
    #[error("{0}")]
    Validation(String),

    /// The request is well formed but the current state does not allow it.
    #[error("{0}")]
    Precondition(String),

    /// A unique resource already exists.
    #[error("{0}")]
    Conflict(String),
}

/// Closed classification of [`AppError`] for callers that need to branch on the error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    InsufficientFunds,
    AccountLocked,
    NotFound,
    PreconditionFailed,
    Unauthorized,
    Conflict,
    SystemError,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        AppError::Precondition(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Database(_) => ErrorKind::SystemError,
            AppError::Unauthorized => ErrorKind::Unauthorized,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::InsufficientBalance => ErrorKind::InsufficientFunds,
            AppError::AccountLocked => ErrorKind::AccountLocked,
            AppError::Validation(_) => ErrorKind::ValidationError,
            AppError::Precondition(_) => ErrorKind::PreconditionFailed,
            AppError::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl ErrorKind {
    fn status(self) -> StatusCode {
        match self {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InsufficientFunds | ErrorKind::PreconditionFailed => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorKind::AccountLocked => StatusCode::LOCKED,
            ErrorKind::SystemError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::InsufficientFunds => "insufficient_balance",
            ErrorKind::AccountLocked => "account_locked",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Conflict => "conflict",
            ErrorKind::SystemError => "internal_error",
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "success": false,
///   "error": {
///     "code": "insufficient_balance",
///     "message": "Insufficient balance"
///   }
/// }
/// ```
///
/// Database errors are logged and reported as a generic internal error so
/// no SQL detail reaches the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = ?e, "database error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": kind.code(),
                "message": message
            }
        }));

        (kind.status(), body).into_response()
    }
}
