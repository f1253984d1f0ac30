use crate::errors::AuthError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// Maximum accepted token size in bytes.
///
/// Larger tokens are rejected before any base64 decoding or signature work.
pub const MAX_JWT_SIZE_BYTES: usize = 4096;

/// Claims carried by access and refresh tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Unique token id; separates tokens issued for identical subjects.
    pub jti: String,
    /// Account id
    pub uid: i64,
    pub username: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Custom Debug implementation that redacts the subject name.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("jti", &self.jti)
            .field("uid", &self.uid)
            .field("username", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("exp", &self.exp)
            .finish()
    }
}

/// A freshly signed token and its absolute expiry.
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// HS256 signer/verifier bound to one secret and one TTL.
///
/// Access and refresh tokens each get their own codec.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    leeway_seconds: u64,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            ttl,
            leeway_seconds: 0,
        }
    }

    /// Tolerated clock skew when checking `exp` and `nbf`.
    pub fn with_leeway(mut self, leeway_seconds: u64) -> Self {
        self.leeway_seconds = leeway_seconds;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `uid` valid from now until now + TTL.
    pub fn issue(&self, uid: i64, username: &str) -> Result<IssuedToken, AuthError> {
        self.issue_at(uid, username, Utc::now())
    }

    /// Sign a token whose validity window starts at `issued_at`.
    #[instrument(skip_all)]
    pub fn issue_at(
        &self,
        uid: i64,
        username: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AuthError::Internal(format!("Token TTL out of range: {}", e)))?;
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Internal("Token expiry overflow".to_string()))?;

        let claims = Claims {
            jti: Uuid::new_v4().to_string(),
            uid,
            username: username.to_string(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());

        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("JWT signing operation failed: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify the signature and validity window of `token`.
    ///
    /// Expired or not-yet-valid tokens fail with `TokenExpired`; every other
    /// failure (wrong secret, malformed payload, wrong algorithm) is `BadToken`.
    #[instrument(skip_all)]
    pub fn parse(&self, token: &str) -> Result<Claims, AuthError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "auth.crypto",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(AuthError::BadToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => {
                    AuthError::TokenExpired
                }
                _ => {
                    tracing::debug!(target: "auth.crypto", error = %e, "Token verification failed");
                    AuthError::BadToken
                }
            }
        })?;

        Ok(data.claims)
    }
}
