//! Token payload and user roles.

use serde::{Deserialize, Serialize};

/// Access level attached to a user account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
    /// Platform-wide administrator.
    SuperAdmin,
}

impl Role {
    /// Whether this role carries administrative privileges.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

// Lets sqlx decode the role column through its TEXT representation.
impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Signed token payload identifying the authenticated principal.
///
/// Never persisted; rebuilt from the token on each verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::SuperAdmin.to_string(), "super_admin");
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("SUPER_ADMIN".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert!("invalid".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_is_admin() {
        assert!(!Role::User.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(Role::SuperAdmin.is_admin());
    }

    #[test]
    fn test_claims_serde_round_trip() {
        let claims = Claims {
            sub: "usr_abc123".to_string(),
            email: "user@example.com".to_string(),
            role: Role::SuperAdmin,
            exp: 1_800_000_000,
            iat: 1_700_000_000,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("\"super_admin\""));

        let parsed: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, claims);
    }
}
