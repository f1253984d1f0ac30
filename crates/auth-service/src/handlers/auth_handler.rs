//! JSON handlers for the credential operations.
//!
//! Each handler checks that its required fields are present, builds a
//! [`RequestContext`] and delegates to the [`CredentialService`].
//!
//! [`CredentialService`]: crate::services::CredentialService

use crate::context::RequestContext;
use crate::errors::{AuthError, ServiceError};
use crate::models::{AccountSelector, TokenPair};
use crate::routes::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<SecretString>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<SecretString>,
}

#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct ActivateRequest {
    #[serde(default)]
    pub link: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub access_token: String,
}

#[derive(Deserialize)]
pub struct PasswordLinkRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub password: Option<SecretString>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

const SUCCESS: SuccessResponse = SuccessResponse { success: true };

/// Use the caller's `x-request-id` when it is a UUID, otherwise mint one.
/// The context is cancelled when the server shuts down.
fn request_context(state: &AppState, headers: &HeaderMap) -> RequestContext {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .unwrap_or_else(Uuid::new_v4);

    RequestContext::new(request_id, state.shutdown.child_token())
}

fn require<'a>(op: &'static str, field: &str, value: &'a str) -> Result<&'a str, ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::new(
            op,
            AuthError::InvalidArgument(format!("{} is required", field)),
        ));
    }
    Ok(value)
}

fn require_secret<'a>(
    op: &'static str,
    field: &str,
    value: &'a Option<SecretString>,
) -> Result<&'a str, ServiceError> {
    let secret = value.as_ref().map(|s| s.expose_secret()).unwrap_or_default();
    require(op, field, secret)
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    const OP: &str = "auth.register";
    let username = require(OP, "username", &payload.username)?;
    let email = require(OP, "email", &payload.email)?;
    let password = require_secret(OP, "password", &payload.password)?;

    let ctx = request_context(&state, &headers);
    state
        .service
        .register(&ctx, username, email, password)
        .await?;

    Ok(Json(SUCCESS))
}

/// POST /api/v1/auth/login
///
/// An unknown account is reported exactly like a wrong password.
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ServiceError> {
    const OP: &str = "auth.login";
    let selector = AccountSelector::from_identifiers(&payload.username, &payload.email)
        .map_err(|e| ServiceError::new(OP, e))?;
    let password = require_secret(OP, "password", &payload.password)?;

    let ctx = request_context(&state, &headers);
    let tokens = state
        .service
        .login(&ctx, selector, password)
        .await
        .map_err(ServiceError::mask_unknown_account)?;

    Ok(Json(tokens))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    let token = require("auth.logout", "refresh_token", &payload.refresh_token)?;

    let ctx = request_context(&state, &headers);
    state.service.logout(&ctx, token).await?;

    Ok(Json(SUCCESS))
}

/// POST /api/v1/auth/activate
pub async fn handle_activate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ActivateRequest>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    let link = require("auth.activate", "link", &payload.link)?;

    let ctx = request_context(&state, &headers);
    state.service.activate_account(&ctx, link).await?;

    Ok(Json(SUCCESS))
}

/// POST /api/v1/auth/refresh
pub async fn handle_refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, ServiceError> {
    let token = require("auth.refresh", "refresh_token", &payload.refresh_token)?;

    let ctx = request_context(&state, &headers);
    let tokens = state.service.refresh(&ctx, token).await?;

    Ok(Json(tokens))
}

/// POST /api/v1/auth/verify
pub async fn handle_verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ServiceError> {
    let token = require("auth.verify", "access_token", &payload.access_token)?;

    let ctx = request_context(&state, &headers);
    let verified = state.service.verify(&ctx, token).await?;

    Ok(Json(VerifyResponse { verified }))
}

/// POST /api/v1/auth/password/link
pub async fn handle_send_password_link(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<PasswordLinkRequest>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    let email = require("auth.send_pwd_link", "email", &payload.email)?;

    let ctx = request_context(&state, &headers);
    state.service.send_pwd_link(&ctx, email).await?;

    Ok(Json(SUCCESS))
}

/// POST /api/v1/auth/password/change
pub async fn handle_change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    const OP: &str = "auth.change_pwd";
    let link = require(OP, "link", &payload.link)?;
    let password = require_secret(OP, "password", &payload.password)?;

    let ctx = request_context(&state, &headers);
    state.service.change_pwd(&ctx, link, password).await?;

    Ok(Json(SUCCESS))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        let err = require("auth.logout", "refresh_token", "   ").unwrap_err();
        assert_eq!(err.op(), "auth.logout");
        assert!(
            matches!(err.kind(), AuthError::InvalidArgument(msg) if msg == "refresh_token is required")
        );
        assert_eq!(require("auth.logout", "refresh_token", "abc").unwrap(), "abc");
    }

    #[test]
    fn test_missing_secret_is_invalid_argument() {
        let err = require_secret("auth.login", "password", &None).unwrap_err();
        assert!(matches!(err.kind(), AuthError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_fields_deserialize_to_empty() {
        let req: LoginRequest = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(req.username, "alice");
        assert!(req.email.is_empty());
        assert!(req.password.is_none());

        let req: ChangePasswordRequest =
            serde_json::from_str(r#"{"link":"abc","password":"pw12345678"}"#).unwrap();
        assert_eq!(
            req.password.as_ref().map(|p| p.expose_secret().to_string()),
            Some("pw12345678".to_string())
        );
    }
}
