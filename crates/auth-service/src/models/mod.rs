use crate::errors::AuthError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;

/// Account model (maps to account table)
#[derive(Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Custom Debug implementation that redacts the email and password hash.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &"[REDACTED]")
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields required to create an account.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &"[REDACTED]")
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Refresh token row (maps to refresh_token table)
#[derive(Clone, FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub account_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshToken")
            .field("id", &self.id)
            .field("account_id", &self.account_id)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Activation link row (maps to activation_link table)
#[derive(Debug, Clone, FromRow)]
pub struct ActivationLink {
    pub id: i64,
    pub account_id: i64,
    pub link: String,
    pub is_activated: bool,
}

/// Password reset link row (maps to password_link table)
#[derive(Clone, FromRow)]
pub struct PasswordResetLink {
    pub id: i64,
    pub email: String,
    pub link: String,
}

impl fmt::Debug for PasswordResetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordResetLink")
            .field("id", &self.id)
            .field("email", &"[REDACTED]")
            .field("link", &"[REDACTED]")
            .finish()
    }
}

/// The single key type for account lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelector {
    ById(i64),
    ByUsername(String),
    ByEmail(String),
}

impl AccountSelector {
    /// Pick the lookup key from a login request.
    ///
    /// A non-empty username wins over the email. Both empty is reported as
    /// bad credentials so callers cannot probe which field is missing.
    pub fn from_identifiers(username: &str, email: &str) -> Result<Self, AuthError> {
        let username = username.trim();
        let email = email.trim();

        if !username.is_empty() {
            Ok(AccountSelector::ByUsername(username.to_string()))
        } else if !email.is_empty() {
            Ok(AccountSelector::ByEmail(email.to_string()))
        } else {
            Err(AuthError::BadCredentials)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AccountSelector::ById(_) => "id",
            AccountSelector::ByUsername(_) => "username",
            AccountSelector::ByEmail(_) => "email",
        }
    }
}

/// Access/refresh token pair returned by Login and Refresh.
#[derive(Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_prefers_username() {
        let selector = AccountSelector::from_identifiers("alice", "alice@x.com").unwrap();
        assert_eq!(selector, AccountSelector::ByUsername("alice".to_string()));
    }

    #[test]
    fn test_selector_falls_back_to_email() {
        let selector = AccountSelector::from_identifiers("  ", "alice@x.com").unwrap();
        assert_eq!(selector, AccountSelector::ByEmail("alice@x.com".to_string()));
        assert_eq!(selector.kind(), "email");
    }

    #[test]
    fn test_selector_rejects_empty_identifiers() {
        let result = AccountSelector::from_identifiers("", "");
        assert!(matches!(result, Err(AuthError::BadCredentials)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let account = Account {
            id: 7,
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: "$2b$10$abcdef".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let rendered = format!("{:?}", account);
        assert!(!rendered.contains("alice@x.com"));
        assert!(!rendered.contains("$2b$10$abcdef"));

        let pair = TokenPair {
            access_token: "access-secret".to_string(),
            refresh_token: "refresh-secret".to_string(),
        };
        let rendered = format!("{:?}", pair);
        assert!(!rendered.contains("access-secret"));
        assert!(!rendered.contains("refresh-secret"));
    }
}
