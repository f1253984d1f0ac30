//! Custom test assertions for issued tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    #[serde(default)]
    pub typ: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub jti: String,
    pub uid: i64,
    pub username: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

fn decode_part<T: for<'de> Deserialize<'de>>(token: &str, index: usize, what: &str) -> T {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT has no {} segment", what));
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("JWT {} is not base64url: {}", what, e));
    serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("JWT {} is not JSON: {}", what, e))
}

/// Assertions on a compact JWT string. Signatures are not checked.
///
/// # Example
/// ```rust,ignore
/// tokens.access_token
///     .assert_valid_jwt()
///     .assert_for_username("alice")
///     .assert_expires_in(900);
/// ```
pub trait TokenAssertions {
    /// Three segments, an HS256 header and the full claim set.
    fn assert_valid_jwt(&self) -> &Self;

    fn assert_for_username(&self, username: &str) -> &Self;

    fn assert_for_account(&self, uid: i64) -> &Self;

    /// Expiry is within a few seconds of `seconds` from now.
    fn assert_expires_in(&self, seconds: u64) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts
        );

        let header: JwtHeader = decode_part(self, 0, "header");
        assert_eq!(header.alg, "HS256", "JWT must be signed with HS256");
        if let Some(typ) = header.typ {
            assert_eq!(typ, "JWT");
        }

        let claims: JwtClaims = decode_part(self, 1, "payload");
        assert!(!claims.jti.is_empty(), "JWT must carry a jti");
        assert!(claims.nbf <= claims.exp, "nbf must not be after exp");
        assert!(claims.iat <= claims.exp, "iat must not be after exp");
        self
    }

    fn assert_for_username(&self, username: &str) -> &Self {
        let claims: JwtClaims = decode_part(self, 1, "payload");
        assert_eq!(claims.username, username, "JWT issued for wrong username");
        self
    }

    fn assert_for_account(&self, uid: i64) -> &Self {
        let claims: JwtClaims = decode_part(self, 1, "payload");
        assert_eq!(claims.uid, uid, "JWT issued for wrong account");
        self
    }

    fn assert_expires_in(&self, seconds: u64) -> &Self {
        let claims: JwtClaims = decode_part(self, 1, "payload");
        let remaining = claims.exp - Utc::now().timestamp();
        let expected = seconds as i64;
        assert!(
            (remaining - expected).abs() <= 5,
            "JWT expires in {}s, expected about {}s",
            remaining,
            expected
        );
        self
    }
}
