//! Authentication and authorization failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Failures raised by the credential, token, role, and membership gates.
///
/// `InvalidCredentials` covers both an unknown email and a wrong password;
/// merging them denies callers a user-enumeration signal. `AccountInactive`
/// is distinct and only raised once the credentials themselves verified.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingAuthHeader,

    #[error("malformed authorization header")]
    InvalidAuthHeader,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    TokenExpired,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("internal auth error: {0}")]
    Internal(String),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Stable machine-readable code carried in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingAuthHeader => "missing_auth_header",
            Self::InvalidAuthHeader => "invalid_auth_header",
            Self::InvalidToken(_) => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountInactive => "account_inactive",
            Self::InsufficientPermissions(_) => "insufficient_permissions",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: String,
    pub error_code: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = AuthErrorResponse {
            error: self.to_string(),
            error_code: self.code().to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::AccountInactive.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InsufficientPermissions("nope".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_credential_failures_share_one_variant() {
        // Unknown email and wrong password must produce byte-identical
        // error bodies; both map to this single variant.
        assert_eq!(AuthError::InvalidCredentials.code(), "invalid_credentials");
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "invalid credentials"
        );
    }

    #[test]
    fn test_inactive_account_is_its_own_code() {
        assert_eq!(AuthError::AccountInactive.code(), "account_inactive");
        assert_ne!(
            AuthError::AccountInactive.code(),
            AuthError::InvalidCredentials.code()
        );
    }
}
