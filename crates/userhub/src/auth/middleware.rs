//! Request authentication: the gate every protected route passes first.

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::claims::{Claims, Role};
use super::config::{AuthConfig, ConfigValidationError};
use super::error::AuthError;
use super::token::TokenIssuer;

/// Pull the token out of an `Authorization: Bearer <token>` value.
///
/// Tolerates surrounding whitespace but nothing else: exactly one scheme
/// word (case-insensitive "bearer") followed by exactly one token word.
fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    let mut words = header_value.split_whitespace();

    match (words.next(), words.next(), words.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Process-wide authentication state.
///
/// Wraps the token issuer built once from validated configuration; every
/// request shares it through the router state.
#[derive(Clone)]
pub struct AuthState {
    issuer: Arc<TokenIssuer>,
    allowed_origins: Arc<Vec<String>>,
}

impl AuthState {
    /// Validate the config, resolve the signing secret, and build the
    /// shared issuer.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        let secret = config
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        Ok(Self {
            issuer: Arc::new(TokenIssuer::new(&secret, config.token_ttl_secs)),
            allowed_origins: Arc::new(config.allowed_origins.clone()),
        })
    }

    /// The shared token issuer.
    pub fn issuer(&self) -> Arc<TokenIssuer> {
        self.issuer.clone()
    }

    /// Configured CORS origins.
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    /// Issue a token for the given principal.
    pub fn issue_token(&self, user_id: &str, email: &str, role: Role) -> Result<String, AuthError> {
        self.issuer.issue(user_id, email, role)
    }

    /// Verify a bearer token, then check the claims against an optional
    /// required role set.
    ///
    /// The single entry point gating every protected operation: token
    /// first, role second. `None` admits any authenticated user.
    pub fn authorize(
        &self,
        token: &str,
        required_roles: Option<&[Role]>,
    ) -> Result<Claims, AuthError> {
        let claims = self.issuer.verify(token)?;

        if let Some(required) = required_roles
            && !required.contains(&claims.role)
        {
            return Err(AuthError::InsufficientPermissions(format!(
                "role {} may not perform this operation",
                claims.role
            )));
        }

        Ok(claims)
    }
}

/// The acting user, as resolved from the request's token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub claims: Claims,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.claims.sub
    }

    pub fn email(&self) -> &str {
        &self.claims.email
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn is_admin(&self) -> bool {
        self.claims.is_admin()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Placed into extensions by auth_middleware; absence means the
        // route was wired outside the protected router.
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// Layer applied to the protected router.
///
/// Verifies the bearer header (the only token transport) and makes
/// [`CurrentUser`] available to handlers through request extensions.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let claims = auth.authorize(bearer_token(header)?, None)?;
    req.extensions_mut().insert(CurrentUser { claims });

    Ok(next.run(req).await)
}

/// Extractor rejecting any caller without an administrative role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(AuthError::InsufficientPermissions(
                "admin role required".to_string(),
            ));
        }

        Ok(RequireAdmin(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::policy::ADMIN_ROLES;

    fn test_auth_state() -> AuthState {
        let config = AuthConfig {
            jwt_secret: Some("test-secret-for-unit-tests-minimum-32-chars-long".to_string()),
            ..AuthConfig::default()
        };
        AuthState::new(&config).unwrap()
    }

    #[test]
    fn test_bearer_token_valid() {
        assert_eq!(bearer_token("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token("bearer   token123").unwrap(), "token123");
        assert_eq!(bearer_token("   Bearer\tmixed-case ").unwrap(), "mixed-case");
    }

    #[test]
    fn test_bearer_token_invalid() {
        let cases = [
            "",
            "Bearer",
            "Bearer ",
            "Token something",
            "Bearer token extra",
            "bear token",
        ];

        for case in cases {
            assert!(bearer_token(case).is_err(), "{case} should fail");
        }
    }

    #[test]
    fn test_auth_state_requires_valid_config() {
        let config = AuthConfig::default();
        assert!(AuthState::new(&config).is_err());
    }

    #[test]
    fn test_authorize_round_trip() {
        let auth = test_auth_state();
        let token = auth
            .issue_token("usr_abc123", "user@example.com", Role::User)
            .unwrap();

        let claims = auth.authorize(&token, None).unwrap();
        assert_eq!(claims.sub, "usr_abc123");
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn test_authorize_role_gate() {
        let auth = test_auth_state();

        let user_token = auth
            .issue_token("usr_u", "user@example.com", Role::User)
            .unwrap();
        let admin_token = auth
            .issue_token("usr_a", "admin@example.com", Role::Admin)
            .unwrap();

        // Regular user rejected from an admin-only operation.
        let err = auth.authorize(&user_token, Some(ADMIN_ROLES)).unwrap_err();
        assert!(matches!(err, AuthError::InsufficientPermissions(_)));

        // Admin admitted.
        let claims = auth.authorize(&admin_token, Some(ADMIN_ROLES)).unwrap();
        assert!(claims.is_admin());
    }

    #[test]
    fn test_authorize_rejects_bad_token() {
        let auth = test_auth_state();
        assert!(auth.authorize("garbage", None).is_err());
    }

    #[test]
    fn test_current_user_accessors() {
        let claims = Claims {
            sub: "usr_1".to_string(),
            email: "user@example.com".to_string(),
            role: Role::SuperAdmin,
            exp: 4_000_000_000,
            iat: 1_700_000_000,
        };

        let user = CurrentUser { claims };
        assert_eq!(user.id(), "usr_1");
        assert_eq!(user.email(), "user@example.com");
        assert!(user.is_admin());
    }
}
