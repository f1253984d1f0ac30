//! Credential orchestration.
//!
//! Composes the password hasher, token codecs, storage contracts, notifier
//! and profile provisioner into the eight account operations. Every business
//! rule lives here; the stores only enforce uniqueness.
//!
//! Each operation takes an explicit [`RequestContext`]. Cancellation is
//! checked before each write begins. Once Register has created an account it
//! either finishes or compensates, so cancellation never leaves an account
//! without its activation link.

use crate::context::RequestContext;
use crate::crypto::{generate_link_token, PasswordHasher, TokenCodec};
use crate::errors::{AuthError, ServiceError};
use crate::models::{AccountSelector, NewAccount, TokenPair};
use crate::notifier::Notifier;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{record_bcrypt_duration, record_operation, record_token_issued};
use crate::repositories::{StoreError, Stores};
use crate::services::profile_client::ProfileProvisioner;
use crate::services::validation::{validate_password, validate_registration};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

const OP_REGISTER: &str = "auth.register";
const OP_LOGIN: &str = "auth.login";
const OP_LOGOUT: &str = "auth.logout";
const OP_ACTIVATE: &str = "auth.activate";
const OP_REFRESH: &str = "auth.refresh";
const OP_VERIFY: &str = "auth.verify";
const OP_SEND_PWD_LINK: &str = "auth.send_pwd_link";
const OP_CHANGE_PWD: &str = "auth.change_pwd";

/// Access and refresh codecs. They must use distinct secrets.
#[derive(Debug, Clone)]
pub struct TokenCodecs {
    pub access: TokenCodec,
    pub refresh: TokenCodec,
}

pub struct CredentialService {
    stores: Stores,
    hasher: PasswordHasher,
    tokens: TokenCodecs,
    notifier: Notifier,
    provisioner: Arc<dyn ProfileProvisioner>,
    /// Verified against when the account does not exist, so both login
    /// failures cost one bcrypt run.
    dummy_hash: String,
}

fn store_failure(err: StoreError) -> AuthError {
    AuthError::Internal(err.to_string())
}

/// Run one operation, tag its error and record its outcome.
async fn observe<T, F>(op: &'static str, fut: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    let start = Instant::now();
    let result = fut.await.map_err(|e| e.in_operation(op));
    let elapsed = start.elapsed();

    match &result {
        Ok(_) => {
            record_operation(op, "success", elapsed);
            debug!(target: "auth.service", op, duration_ms = elapsed.as_millis() as u64, "Operation succeeded");
        }
        Err(e) => {
            record_operation(op, e.kind().metric_label(), elapsed);
            match e.kind() {
                AuthError::Internal(_) | AuthError::HashingFailed(_) => {
                    error!(target: "auth.service", op, error = %e, "Operation failed");
                }
                _ => {
                    info!(target: "auth.service", op, error = %e, "Operation rejected");
                }
            }
            if let Some(cleanup) = e.cleanup() {
                warn!(target: "auth.service", op, cleanup_error = %cleanup, "Cleanup step failed");
            }
        }
    }

    result
}

impl CredentialService {
    /// # Errors
    ///
    /// Returns `AuthError::HashingFailed` if the hasher's cost is unusable.
    pub fn new(
        stores: Stores,
        hasher: PasswordHasher,
        tokens: TokenCodecs,
        notifier: Notifier,
        provisioner: Arc<dyn ProfileProvisioner>,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash("timing-equalization-placeholder")?;
        Ok(Self {
            stores,
            hasher,
            tokens,
            notifier,
            provisioner,
            dummy_hash,
        })
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher;
        let password = password.to_string();
        let start = Instant::now();

        let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {}", e)))??;

        record_bcrypt_duration("hash", start.elapsed());
        Ok(digest)
    }

    async fn verify_password(&self, digest: &str, password: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher;
        let digest = digest.to_string();
        let password = password.to_string();
        let start = Instant::now();

        let matches = tokio::task::spawn_blocking(move || hasher.verify(&digest, &password))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {}", e)))??;

        record_bcrypt_duration("verify", start.elapsed());
        Ok(matches)
    }

    /// Create an account and its activation link, then queue the activation
    /// email. No token is issued; the account must be activated first.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for missing or malformed input
    /// - `AccountAlreadyExists` if the username or email is taken
    #[instrument(skip_all, name = "auth.register", fields(request_id = %ctx.request_id))]
    pub async fn register(
        &self,
        ctx: &RequestContext,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ServiceError> {
        observe(OP_REGISTER, async {
            let username = username.trim();
            let email = email.trim();
            validate_registration(username, email, password)?;

            ctx.ensure_active()?;
            let password_hash = self.hash_password(password).await?;
            ctx.ensure_active()?;

            let account = self
                .stores
                .accounts
                .create_account(&NewAccount {
                    username: username.to_string(),
                    email: email.to_string(),
                    password_hash,
                })
                .await
                .map_err(|e| match e {
                    StoreError::AlreadyExists => AuthError::AccountAlreadyExists,
                    other => store_failure(other),
                })?;

            let link = match generate_link_token() {
                Ok(token) => self
                    .stores
                    .activations
                    .create_activation_link(account.id, &token)
                    .await
                    .map_err(store_failure),
                Err(e) => Err(e),
            };

            let link = match link {
                Ok(link) => link,
                Err(primary) => {
                    // An account must never exist without its activation link.
                    let err = ServiceError::new(OP_REGISTER, primary);
                    return Err(match self.stores.accounts.delete_account(account.id).await {
                        Ok(()) => err,
                        Err(cleanup) => err.with_cleanup(store_failure(cleanup)),
                    });
                }
            };

            self.notifier.send_activation(&account.email, &link.link);

            info!(
                target: "auth.service",
                account_id = account.id,
                user = %hash_for_correlation(&account.username),
                "Account registered"
            );
            Ok(())
        })
        .await
    }

    /// Exchange credentials for an access/refresh token pair.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if no account matches the selector
    /// - `BadCredentials` if the password does not match
    /// - `NotActivated` if the account is not activated or its activation
    ///   state cannot be read
    #[instrument(skip_all, name = "auth.login", fields(request_id = %ctx.request_id, selector = selector.kind()))]
    pub async fn login(
        &self,
        ctx: &RequestContext,
        selector: AccountSelector,
        password: &str,
    ) -> Result<TokenPair, ServiceError> {
        observe(OP_LOGIN, async {
            if password.is_empty() {
                return Err(AuthError::InvalidArgument("password is required".to_string()).into());
            }

            let account = match self.stores.accounts.find_account(&selector).await {
                Ok(account) => account,
                Err(StoreError::NotFound) => {
                    let _ = self.verify_password(&self.dummy_hash, password).await;
                    return Err(AuthError::AccountNotFound.into());
                }
                Err(e) => return Err(store_failure(e).into()),
            };

            if !self
                .verify_password(&account.password_hash, password)
                .await?
            {
                return Err(AuthError::BadCredentials.into());
            }

            let activated = match self
                .stores
                .activations
                .activation_for_account(account.id)
                .await
            {
                Ok(link) => link.is_activated,
                Err(e) => {
                    warn!(target: "auth.service", account_id = account.id, error = %e, "Activation state unavailable");
                    false
                }
            };
            if !activated {
                return Err(AuthError::NotActivated.into());
            }

            let access = self.tokens.access.issue(account.id, &account.username)?;
            let refresh = self.tokens.refresh.issue(account.id, &account.username)?;

            ctx.ensure_active()?;
            self.stores
                .sessions
                .insert_session(account.id, &refresh.token, refresh.expires_at)
                .await
                .map_err(store_failure)?;

            record_token_issued("access");
            record_token_issued("refresh");

            Ok(TokenPair {
                access_token: access.token,
                refresh_token: refresh.token,
            })
        })
        .await
    }

    /// Revoke one refresh token.
    ///
    /// # Errors
    ///
    /// - `TokenNotFound` if the token is not in the ledger
    #[instrument(skip_all, name = "auth.logout", fields(request_id = %ctx.request_id))]
    pub async fn logout(&self, ctx: &RequestContext, refresh_token: &str) -> Result<(), ServiceError> {
        observe(OP_LOGOUT, async {
            self.stores
                .sessions
                .get_session(refresh_token)
                .await
                .map_err(|e| e.into_auth_error(AuthError::TokenNotFound))?;

            ctx.ensure_active()?;
            self.stores
                .sessions
                .delete_session(refresh_token)
                .await
                .map_err(|e| e.into_auth_error(AuthError::TokenNotFound))?;

            Ok(())
        })
        .await
    }

    /// Activate the account behind `link`, creating its default profile.
    ///
    /// An already-activated link succeeds without calling the profile
    /// service again.
    ///
    /// # Errors
    ///
    /// - `LinkNotFound` for an unknown link
    /// - `Internal` if the profile service fails; nothing is activated
    #[instrument(skip_all, name = "auth.activate", fields(request_id = %ctx.request_id))]
    pub async fn activate_account(&self, ctx: &RequestContext, link: &str) -> Result<(), ServiceError> {
        observe(OP_ACTIVATE, async {
            let activation = self
                .stores
                .activations
                .get_activation_link(link)
                .await
                .map_err(|e| e.into_auth_error(AuthError::LinkNotFound))?;

            if activation.is_activated {
                debug!(target: "auth.service", account_id = activation.account_id, "Account already activated");
                return Ok(());
            }

            ctx.ensure_active()?;
            self.provisioner
                .create_default(activation.account_id)
                .await
                .map_err(|e| AuthError::Internal(format!("Profile provisioning failed: {}", e)))?;

            ctx.ensure_active()?;
            self.stores
                .activations
                .mark_activated(activation.id)
                .await
                .map_err(|e| e.into_auth_error(AuthError::LinkNotFound))?;

            info!(target: "auth.service", account_id = activation.account_id, "Account activated");
            Ok(())
        })
        .await
    }

    /// Issue a new access token for a stored refresh token.
    ///
    /// The refresh token itself is returned unchanged.
    ///
    /// # Errors
    ///
    /// - `TokenNotFound` if the token is not in the ledger
    /// - `TokenExpired` if it has expired; the ledger row is deleted and a
    ///   failed delete is attached as the cleanup error
    /// - `BadToken` for any other verification failure
    /// - `AccountNotFound` if the account was deleted since issuance
    #[instrument(skip_all, name = "auth.refresh", fields(request_id = %ctx.request_id))]
    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<TokenPair, ServiceError> {
        observe(OP_REFRESH, async {
            let session = self
                .stores
                .sessions
                .get_session(refresh_token)
                .await
                .map_err(|e| e.into_auth_error(AuthError::TokenNotFound))?;

            let claims = match self.tokens.refresh.parse(refresh_token) {
                Ok(claims) => claims,
                Err(AuthError::TokenExpired) => {
                    let err = ServiceError::new(OP_REFRESH, AuthError::TokenExpired);
                    return Err(match self.stores.sessions.delete_session(refresh_token).await {
                        Ok(()) | Err(StoreError::NotFound) => err,
                        Err(cleanup) => err.with_cleanup(store_failure(cleanup)),
                    });
                }
                Err(e) => return Err(e.into()),
            };

            if claims.uid != session.account_id {
                warn!(target: "auth.service", "Refresh token subject does not match its ledger row");
                return Err(AuthError::BadToken.into());
            }

            ctx.ensure_active()?;
            let account = self
                .stores
                .accounts
                .find_account(&AccountSelector::ById(session.account_id))
                .await
                .map_err(|e| e.into_auth_error(AuthError::AccountNotFound))?;

            let access = self.tokens.access.issue(account.id, &account.username)?;
            record_token_issued("access");

            Ok(TokenPair {
                access_token: access.token,
                refresh_token: refresh_token.to_string(),
            })
        })
        .await
    }

    /// Check an access token without touching storage.
    ///
    /// # Errors
    ///
    /// - `TokenExpired` if expired or not yet valid
    /// - `BadToken` for any other verification failure
    #[instrument(skip_all, name = "auth.verify", fields(request_id = %ctx.request_id))]
    pub async fn verify(&self, ctx: &RequestContext, access_token: &str) -> Result<bool, ServiceError> {
        observe(OP_VERIFY, async {
            self.tokens.access.parse(access_token)?;
            Ok(true)
        })
        .await
    }

    /// Queue a password-reset email, reusing the outstanding link if any.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if no account has this email
    #[instrument(skip_all, name = "auth.send_pwd_link", fields(request_id = %ctx.request_id))]
    pub async fn send_pwd_link(&self, ctx: &RequestContext, email: &str) -> Result<(), ServiceError> {
        observe(OP_SEND_PWD_LINK, async {
            let email = email.trim();
            if email.is_empty() {
                return Err(AuthError::InvalidArgument("email is required".to_string()).into());
            }

            let account = self
                .stores
                .accounts
                .find_account(&AccountSelector::ByEmail(email.to_string()))
                .await
                .map_err(|e| e.into_auth_error(AuthError::AccountNotFound))?;

            let link = match self.stores.resets.reset_link_for_email(&account.email).await {
                Ok(link) => link,
                Err(StoreError::NotFound) => {
                    ctx.ensure_active()?;
                    let token = generate_link_token()?;
                    match self
                        .stores
                        .resets
                        .create_reset_link(&account.email, &token)
                        .await
                    {
                        Ok(link) => link,
                        // A concurrent request minted the link first.
                        Err(StoreError::AlreadyExists) => self
                            .stores
                            .resets
                            .reset_link_for_email(&account.email)
                            .await
                            .map_err(|e| e.into_auth_error(AuthError::LinkNotFound))?,
                        Err(e) => return Err(store_failure(e).into()),
                    }
                }
                Err(e) => return Err(store_failure(e).into()),
            };

            self.notifier.send_password_reset(&account.email, &link.link);

            info!(
                target: "auth.service",
                account_id = account.id,
                "Password reset link queued"
            );
            Ok(())
        })
        .await
    }

    /// Set a new password through a reset link.
    ///
    /// The password update, the revocation of every refresh token of the
    /// account and the consumption of the link commit together.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the new password is too short or too long
    /// - `LinkNotFound` for an unknown or already consumed link
    #[instrument(skip_all, name = "auth.change_pwd", fields(request_id = %ctx.request_id))]
    pub async fn change_pwd(
        &self,
        ctx: &RequestContext,
        link: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        observe(OP_CHANGE_PWD, async {
            validate_password(new_password)?;

            let reset = self
                .stores
                .resets
                .get_reset_link(link)
                .await
                .map_err(|e| e.into_auth_error(AuthError::LinkNotFound))?;

            ctx.ensure_active()?;
            let password_hash = self.hash_password(new_password).await?;
            ctx.ensure_active()?;

            self.stores
                .resets
                .redeem_reset_link(&reset.link, &password_hash)
                .await
                .map_err(|e| e.into_auth_error(AuthError::LinkNotFound))?;

            info!(
                target: "auth.service",
                user = %hash_for_correlation(&reset.email),
                "Password changed, sessions revoked"
            );
            Ok(())
        })
        .await
    }
}
