//! Storage contracts for accounts, sessions and one-time links.
//!
//! These traits are the only seam to persistent storage; every business rule
//! lives in the credential service. Two implementations exist: [`PgStore`]
//! (Postgres via sqlx) and [`MemoryStore`] (tests and local harnesses).

mod accounts;
mod activation_links;
pub mod memory;
mod password_links;
mod sessions;

pub use memory::{Fault, MemoryStore};

use crate::errors::AuthError;
use crate::models::{
    Account, AccountSelector, ActivationLink, NewAccount, PasswordResetLink, RefreshToken,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

/// Storage-contract error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Map into the caller-facing kind, naming what a miss means here.
    pub fn into_auth_error(self, not_found: AuthError) -> AuthError {
        match self {
            StoreError::NotFound => not_found,
            StoreError::AlreadyExists => AuthError::AccountAlreadyExists,
            StoreError::Database(msg) => AuthError::Internal(msg),
        }
    }

    pub(crate) fn from_sqlx(context: &str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::AlreadyExists;
            }
        }
        StoreError::Database(format!("{}: {}", context, err))
    }
}

/// Durable store of accounts, unique by username and by email.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Fails `AlreadyExists` if the username or email is taken.
    async fn create_account(&self, account: &NewAccount) -> Result<Account, StoreError>;

    async fn find_account(&self, selector: &AccountSelector) -> Result<Account, StoreError>;

    /// Administrative removal. Cascades to the account's sessions and link.
    async fn delete_account(&self, account_id: i64) -> Result<(), StoreError>;
}

/// Durable store of issued refresh tokens.
#[async_trait]
pub trait SessionLedger: Send + Sync {
    async fn insert_session(
        &self,
        account_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError>;

    async fn get_session(&self, token: &str) -> Result<RefreshToken, StoreError>;

    /// Fails `NotFound` if no row holds `token`.
    async fn delete_session(&self, token: &str) -> Result<(), StoreError>;
}

/// Durable store of per-account activation links.
#[async_trait]
pub trait ActivationLinks: Send + Sync {
    async fn create_activation_link(
        &self,
        account_id: i64,
        link: &str,
    ) -> Result<ActivationLink, StoreError>;

    async fn get_activation_link(&self, link: &str) -> Result<ActivationLink, StoreError>;

    async fn activation_for_account(&self, account_id: i64)
        -> Result<ActivationLink, StoreError>;

    async fn mark_activated(&self, id: i64) -> Result<(), StoreError>;
}

/// Durable store of outstanding password-reset links, at most one per email.
#[async_trait]
pub trait PasswordResetLinks: Send + Sync {
    /// Fails `AlreadyExists` if the email already has an outstanding link.
    async fn create_reset_link(
        &self,
        email: &str,
        link: &str,
    ) -> Result<PasswordResetLink, StoreError>;

    async fn reset_link_for_email(&self, email: &str) -> Result<PasswordResetLink, StoreError>;

    async fn get_reset_link(&self, link: &str) -> Result<PasswordResetLink, StoreError>;

    /// Consume `link` atomically: set the account's password hash, purge every
    /// refresh token of that account and delete the link.
    ///
    /// Fails `NotFound` with nothing changed if the link was already consumed
    /// or its account is gone.
    async fn redeem_reset_link(
        &self,
        link: &str,
        password_hash: &str,
    ) -> Result<PasswordResetLink, StoreError>;
}

/// Handles to every store the credential service talks to.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountDirectory>,
    pub sessions: Arc<dyn SessionLedger>,
    pub activations: Arc<dyn ActivationLinks>,
    pub resets: Arc<dyn PasswordResetLinks>,
}

impl Stores {
    /// Use one backend for all four contracts.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: AccountDirectory + SessionLedger + ActivationLinks + PasswordResetLinks + 'static,
    {
        Self {
            accounts: store.clone(),
            sessions: store.clone(),
            activations: store.clone(),
            resets: store,
        }
    }
}

/// Postgres-backed implementation of every storage contract.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            StoreError::NotFound.into_auth_error(AuthError::LinkNotFound),
            AuthError::LinkNotFound
        ));
        assert!(matches!(
            StoreError::AlreadyExists.into_auth_error(AuthError::AccountNotFound),
            AuthError::AccountAlreadyExists
        ));
        assert!(matches!(
            StoreError::Database("boom".into()).into_auth_error(AuthError::AccountNotFound),
            AuthError::Internal(_)
        ));
    }

    #[test]
    fn test_row_not_found_is_not_a_unique_violation() {
        let err = StoreError::from_sqlx("Failed to insert", sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
