//! Password hashing, bearer tokens and link secrets.

mod jwt;

pub use jwt::{Claims, IssuedToken, TokenCodec, MAX_JWT_SIZE_BYTES};

use crate::errors::AuthError;
use base64::{engine::general_purpose, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::instrument;

/// Number of random bytes behind every activation and reset link.
pub const LINK_TOKEN_BYTES: usize = 32;

/// Work factors bcrypt itself accepts.
const BCRYPT_MIN_COST: u32 = 4;
const BCRYPT_MAX_COST: u32 = 31;

/// One-way password hashing with a fixed bcrypt work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::HashingFailed` if the cost is outside what bcrypt
    /// accepts or the underlying hash fails.
    #[instrument(skip_all)]
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&self.cost) {
            return Err(AuthError::HashingFailed(format!(
                "Invalid bcrypt cost: {} (must be {}-{})",
                self.cost,
                BCRYPT_MIN_COST,
                BCRYPT_MAX_COST
            )));
        }

        bcrypt::hash(plaintext, self.cost)
            .map_err(|e| AuthError::HashingFailed(format!("Password hashing failed: {}", e)))
    }

    /// Verify a plaintext password against a stored digest.
    ///
    /// A mismatch is `Ok(false)`. Only a malformed digest is an error.
    #[instrument(skip_all)]
    pub fn verify(&self, digest: &str, plaintext: &str) -> Result<bool, AuthError> {
        bcrypt::verify(plaintext, digest).map_err(|e| {
            AuthError::HashingFailed(format!("Password verification failed: {}", e))
        })
    }
}

/// Generate cryptographically secure random bytes
pub fn generate_random_bytes(len: usize) -> Result<Vec<u8>, AuthError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|e| AuthError::Internal(format!("Random bytes generation failed: {}", e)))?;
    Ok(bytes)
}

/// Generate an unguessable link token (URL-safe base64, no padding).
#[instrument(skip_all)]
pub fn generate_link_token() -> Result<String, AuthError> {
    let bytes = generate_random_bytes(LINK_TOKEN_BYTES)?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_password_hashing() {
        let hasher = PasswordHasher::new(4);
        let digest = hasher.hash("pw12345678").unwrap();

        assert!(digest.starts_with("$2b$04$"));
        assert!(hasher.verify(&digest, "pw12345678").unwrap());
        assert!(!hasher.verify(&digest, "wrong-password").unwrap());
    }

    #[test]
    fn test_verify_with_malformed_digest() {
        let hasher = PasswordHasher::new(4);
        let result = hasher.verify("not-a-bcrypt-hash", "pw12345678");
        assert!(matches!(result, Err(AuthError::HashingFailed(_))));
    }

    #[test]
    fn test_hash_rejects_out_of_range_cost() {
        let hasher = PasswordHasher::new(40);
        assert!(matches!(
            hasher.hash("pw12345678"),
            Err(AuthError::HashingFailed(_))
        ));
    }

    #[test]
    fn test_link_tokens_are_url_safe_and_unique() {
        let mut seen = HashSet::new();
        for _ in 0..64 {
            let token = generate_link_token().unwrap();
            // 32 bytes -> 43 base64 characters without padding
            assert_eq!(token.len(), 43);
            assert!(token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            assert!(seen.insert(token));
        }
    }
}
