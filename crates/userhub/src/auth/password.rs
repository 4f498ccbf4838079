//! Password hashing.

use anyhow::{Context, Result};

/// Salted one-way password hashing with a configurable work factor.
///
/// bcrypt embeds the salt and cost in the digest, and its comparison is
/// constant-time for equal-length digests, so `verify` does not leak where
/// a mismatch occurs.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with an explicit bcrypt cost.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext password into an opaque digest.
    pub fn hash(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.cost).context("Failed to hash password")
    }

    /// Verify a plaintext password against a stored digest.
    ///
    /// The only error path is a malformed digest.
    pub fn verify(&self, password: &str, digest: &str) -> Result<bool> {
        bcrypt::verify(password, digest).context("Failed to verify password")
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        // Debug builds trade hash strength for test speed
        let cost = if cfg!(debug_assertions) {
            4
        } else {
            bcrypt::DEFAULT_COST
        };
        Self { cost }
    }
}
