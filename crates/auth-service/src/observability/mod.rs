//! Observability for the auth service.
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit field
//! allow-listing:
//! - **SAFE**: operation tags, outcome labels, request ids
//! - **HASHED**: usernames and emails, via [`hash_for_correlation`]
//! - **NEVER**: passwords, tokens, link tokens, secrets

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// A one-way hash for joining log lines, not a secret-safe digest.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    hex::encode(result.get(..4).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_for_correlation_is_stable_and_short() {
        let a = hash_for_correlation("alice@x.com");
        let b = hash_for_correlation("alice@x.com");
        let c = hash_for_correlation("bob@x.com");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 8);
        assert!(!a.contains("alice"));
    }
}
