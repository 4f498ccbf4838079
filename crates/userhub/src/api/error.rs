//! Error type for the CRUD surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;

/// Request-scoped failure, rendered as a structured JSON response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    fn response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Sort an `anyhow` error from the service layer into a response
    /// category.
    ///
    /// A wrapped [`AuthError`] keeps its own status mapping, so gate
    /// failures raised deep inside a service stay 401/403. Everything
    /// else falls back to matching the message text: "not found" means
    /// NotFound, "already registered"/"already exists" means Conflict,
    /// "invalid"/"must be" means BadRequest, and anything unrecognized
    /// is an internal error.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        let err = match err.downcast::<AuthError>() {
            Ok(auth_err) => return auth_err.into(),
            Err(err) => err,
        };

        let msg = err.to_string();
        let lower = msg.to_lowercase();

        if lower.contains("not found") {
            Self::NotFound(msg)
        } else if lower.contains("already registered") || lower.contains("already exists") {
            Self::Conflict(msg)
        } else if lower.contains("invalid") || lower.contains("must be") {
            Self::BadRequest(msg)
        } else {
            Self::Internal(msg)
        }
    }
}

/// Structured error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.response_parts();
        let message = self.to_string();

        if let ApiError::Internal(_) = self {
            error!(error_code = code, message = %message, "API error");
        } else {
            tracing::debug!(error_code = code, message = %message, "Client error");
        }

        let body = ErrorResponse {
            error: message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::from_anyhow(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader => {
                Self::Unauthorized("Missing or invalid authorization".to_string())
            }
            AuthError::InvalidToken(msg) => Self::Unauthorized(format!("Invalid token: {}", msg)),
            AuthError::TokenExpired => Self::Unauthorized("Token has expired".to_string()),
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid credentials".to_string()),
            AuthError::AccountInactive => Self::Unauthorized("Account is inactive".to_string()),
            AuthError::InsufficientPermissions(msg) => Self::Forbidden(msg),
            AuthError::Internal(msg) => Self::Internal(format!("Authentication error: {}", msg)),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
