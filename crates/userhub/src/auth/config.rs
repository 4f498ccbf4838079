//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// The placeholder secret shipped in documentation; refused at startup.
const INSECURE_SECRET: &str = "dev-secret-change-in-production";

/// Minimum length accepted for an HS256 signing secret.
const MIN_SECRET_LEN: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JWT secret for HS256. REQUIRED; supports `env:VAR_NAME` syntax.
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds.
    pub token_ttl_secs: i64,

    /// bcrypt cost for password hashing. Defaults to the library default
    /// in release builds when unset.
    pub bcrypt_cost: Option<u32>,

    /// Enforce the organization-membership gate on member-scoped
    /// operations. When false those operations are authenticated-only.
    pub enforce_membership: bool,

    /// Allowed CORS origins. If empty, cross-origin requests are denied.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // There is deliberately no default secret; startup fails
            // until one is configured or generated.
            jwt_secret: None,
            token_ttl_secs: 60 * 60 * 24,
            bcrypt_cost: None,
            enforce_membership: true,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl AuthConfig {
    /// Resolve the configured JWT secret, reading through `env:VAR_NAME`
    /// indirection when present.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        let Some(value) = &self.jwt_secret else {
            return Ok(None);
        };

        let Some(var_name) = value.strip_prefix("env:") else {
            return Ok(Some(value.clone()));
        };

        match std::env::var(var_name) {
            Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
            Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
            Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let secret = self
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        if secret == INSECURE_SECRET {
            return Err(ConfigValidationError::InsecureJwtSecret);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigValidationError::JwtSecretTooShort);
        }
        if self.token_ttl_secs <= 0 {
            return Err(ConfigValidationError::InvalidTokenTtl);
        }

        Ok(())
    }

    /// Generate a fresh signing secret from the OS random source.
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;
        use rand::distr::Alphanumeric;

        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    MissingJwtSecret,
    InsecureJwtSecret,
    JwtSecretTooShort,
    InvalidTokenTtl,
    EnvVarNotFound(String),
    EnvVarEmpty(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingJwtSecret => write!(
                f,
                "no JWT secret configured; set auth.jwt_secret (or point it at an environment variable with env:VAR_NAME)"
            ),
            Self::InsecureJwtSecret => write!(
                f,
                "auth.jwt_secret is still the well-known placeholder; generate a real secret"
            ),
            Self::JwtSecretTooShort => write!(
                f,
                "auth.jwt_secret must be at least {MIN_SECRET_LEN} characters"
            ),
            Self::InvalidTokenTtl => {
                write!(f, "auth.token_ttl_secs must be a positive number of seconds")
            }
            Self::EnvVarNotFound(var) => {
                write!(f, "environment variable '{var}' (from env:{var}) is not set")
            }
            Self::EnvVarEmpty(var) => {
                write!(f, "environment variable '{var}' (from env:{var}) is empty")
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(config.jwt_secret.is_none());
        assert_eq!(config.token_ttl_secs, 86400);
        assert!(config.enforce_membership);
    }

    #[test]
    fn test_config_validation_no_secret() {
        let config = AuthConfig::default();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::MissingJwtSecret
        );
    }

    #[test]
    fn test_config_validation_insecure_secret() {
        let config = AuthConfig {
            jwt_secret: Some(INSECURE_SECRET.to_string()),
            ..AuthConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::InsecureJwtSecret
        );
    }

    #[test]
    fn test_config_validation_short_secret() {
        let config = AuthConfig {
            jwt_secret: Some("tooshort".to_string()),
            ..AuthConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::JwtSecretTooShort
        );
    }

    #[test]
    fn test_config_validation_bad_ttl() {
        let config = AuthConfig {
            jwt_secret: Some("a-very-long-and-secure-jwt-secret-that-is-fine".to_string()),
            token_ttl_secs: 0,
            ..AuthConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidTokenTtl
        );
    }

    #[test]
    fn test_config_validation_valid() {
        let config = AuthConfig {
            jwt_secret: Some("a-very-long-and-secure-jwt-secret-that-is-fine".to_string()),
            ..AuthConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generate_jwt_secret_length_and_charset() {
        let secret = AuthConfig::generate_jwt_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_secret_passes_validation() {
        let config = AuthConfig {
            jwt_secret: Some(AuthConfig::generate_jwt_secret()),
            ..AuthConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_jwt_secret_literal() {
        let config = AuthConfig {
            jwt_secret: Some("my-literal-secret".to_string()),
            ..AuthConfig::default()
        };
        let resolved = config.resolve_jwt_secret().unwrap();
        assert_eq!(resolved, Some("my-literal-secret".to_string()));
    }

    #[test]
    fn test_resolve_jwt_secret_env_var() {
        // SAFETY: test-only environment variable with a unique name
        unsafe {
            std::env::set_var(
                "USERHUB_TEST_JWT_SECRET",
                "secret-from-env-var-at-least-32-chars",
            );
        }

        let config = AuthConfig {
            jwt_secret: Some("env:USERHUB_TEST_JWT_SECRET".to_string()),
            ..AuthConfig::default()
        };
        let resolved = config.resolve_jwt_secret().unwrap();
        assert_eq!(
            resolved,
            Some("secret-from-env-var-at-least-32-chars".to_string())
        );

        // SAFETY: cleaning up the test variable
        unsafe {
            std::env::remove_var("USERHUB_TEST_JWT_SECRET");
        }
    }

    #[test]
    fn test_resolve_jwt_secret_env_var_not_found() {
        let config = AuthConfig {
            jwt_secret: Some("env:USERHUB_NONEXISTENT_VAR".to_string()),
            ..AuthConfig::default()
        };
        assert_eq!(
            config.resolve_jwt_secret().unwrap_err(),
            ConfigValidationError::EnvVarNotFound("USERHUB_NONEXISTENT_VAR".to_string())
        );
    }
}
