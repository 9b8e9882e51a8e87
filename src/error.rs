//! Secure Error Handling
//!
//! Every failure a handler can produce is an [`AppError`]: a kind that maps
//! to an HTTP status, a message safe to show callers, and optional internal
//! detail that is logged but never serialized into a response. Store
//! failures are mapped uniformly to 500 with a route-appropriate public
//! message so persistence internals never leak.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Application error type with secure response handling
#[derive(Debug)]
pub struct AppError {
    /// Error kind for categorization
    pub kind: ErrorKind,
    /// Message safe to show to callers
    pub message: String,
    /// Internal details (logged but not exposed)
    internal: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input (400)
    Validation,
    /// Bad credentials, missing or invalid token (401)
    Authentication,
    /// Valid token, wrong role (403)
    Authorization,
    /// Missing resource (404)
    NotFound,
    /// Unexpected or store failure (500)
    Internal,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
            internal: None,
        }
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Authentication,
            message: message.into(),
            internal: None,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Authorization,
            message: message.into(),
            internal: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: message.into(),
            internal: None,
        }
    }

    /// Internal error with a generic public message. Details go to the log.
    pub fn internal(internal_details: impl Into<String>) -> Self {
        let details = internal_details.into();
        error!(error = %details, "Internal error occurred");
        Self {
            kind: ErrorKind::Internal,
            message: "An internal error occurred".into(),
            internal: Some(details),
        }
    }

    /// Store failure with a route-specific public message.
    ///
    /// The caller picks what the API says ("Failed to fetch users", ...);
    /// the underlying database error is logged and discarded.
    pub fn store(message: impl Into<String>, err: sqlx::Error) -> Self {
        let message = message.into();
        error!(error = %err, context = %message, "Store operation failed");
        Self {
            kind: ErrorKind::Internal,
            message,
            internal: Some(err.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.internal {
            Some(internal) => write!(f, "{} ({})", self.message, internal),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AppError {}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.message,
        };
        (status, Json(body)).into_response()
    }
}
