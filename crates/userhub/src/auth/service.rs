//! Credential verification and login.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::error::AuthError;
use super::password::PasswordHasher;
use super::token::TokenIssuer;
use crate::user::{UserInfo, UserRepository};

/// Fixed bcrypt digest of a throwaway input. Verified on unknown-email
/// logins so that path performs the same work as a wrong-password failure.
const PHANTOM_DIGEST: &str = "$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";

/// Successful login payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: UserInfo,
    pub token: String,
}

/// Orchestrates credential verification, account-state checks, and token
/// issuance.
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    hasher: PasswordHasher,
    issuer: Arc<TokenIssuer>,
}

impl AuthService {
    /// Create a new auth service.
    pub fn new(users: UserRepository, hasher: PasswordHasher, issuer: Arc<TokenIssuer>) -> Self {
        Self {
            users,
            hasher,
            issuer,
        }
    }

    /// Verify credentials and return the safe user projection.
    ///
    /// Unknown email and wrong password fail identically; callers cannot
    /// tell which check rejected them.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserInfo, AuthError> {
        let user = self
            .users
            .get_by_email(email)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let Some(user) = user else {
            // Unknown email still pays for one digest verification.
            let _ = self.hasher.verify(password, PHANTOM_DIGEST);
            return Err(AuthError::InvalidCredentials);
        };

        let valid = self
            .hasher
            .verify(password, &user.password_hash)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        // Disclosed only after the credentials themselves verified.
        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        // Best effort: a failed audit write must not block the login.
        if let Err(e) = self.users.update_last_login(&user.id).await {
            warn!(user_id = %user.id, error = ?e, "failed to record last login");
        }

        Ok(user.into())
    }

    /// Issue a bearer token for an authenticated user.
    ///
    /// Pure composition over the token issuer; no side effects.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub fn login(&self, user: UserInfo) -> Result<LoginResponse, AuthError> {
        let token = self.issuer.issue(&user.id, &user.email, user.role)?;
        info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse { user, token })
    }
}
