//! Error taxonomy for the credential flows.
//!
//! [`AuthError`] is the caller-facing kind. [`ServiceError`] tags it with the
//! operation that produced it and, for multi-step flows, carries a secondary
//! cleanup failure without changing the reported kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Transport-level error category.
///
/// Every [`AuthError`] maps to exactly one code; the mapping is stable so
/// gateways can translate it into their own status space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    Unauthenticated,
    Cancelled,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists => StatusCode::CONFLICT,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Cancelled => StatusCode::REQUEST_TIMEOUT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            ErrorCode::InvalidArgument => tonic::Code::InvalidArgument,
            ErrorCode::NotFound => tonic::Code::NotFound,
            ErrorCode::AlreadyExists => tonic::Code::AlreadyExists,
            ErrorCode::Unauthenticated => tonic::Code::Unauthenticated,
            ErrorCode::Cancelled => tonic::Code::Cancelled,
            ErrorCode::Internal => tonic::Code::Internal,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Account with these credentials already exists")]
    AccountAlreadyExists,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Bad credentials")]
    BadCredentials,

    #[error("Token not found")]
    TokenNotFound,

    #[error("Link not found")]
    LinkNotFound,

    #[error("Account is not activated")]
    NotActivated,

    #[error("Token expired")]
    TokenExpired,

    #[error("Bad token")]
    BadToken,

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::InvalidArgument(_) | AuthError::BadCredentials => {
                ErrorCode::InvalidArgument
            }
            AuthError::AccountNotFound | AuthError::TokenNotFound | AuthError::LinkNotFound => {
                ErrorCode::NotFound
            }
            AuthError::AccountAlreadyExists => ErrorCode::AlreadyExists,
            AuthError::NotActivated | AuthError::TokenExpired | AuthError::BadToken => {
                ErrorCode::Unauthenticated
            }
            AuthError::Cancelled => ErrorCode::Cancelled,
            AuthError::HashingFailed(_) | AuthError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Bounded label for metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            AuthError::InvalidArgument(_) => "invalid_argument",
            AuthError::AccountAlreadyExists => "account_already_exists",
            AuthError::AccountNotFound => "account_not_found",
            AuthError::BadCredentials => "bad_credentials",
            AuthError::TokenNotFound => "token_not_found",
            AuthError::LinkNotFound => "link_not_found",
            AuthError::NotActivated => "not_activated",
            AuthError::TokenExpired => "token_expired",
            AuthError::BadToken => "bad_token",
            AuthError::HashingFailed(_) => "hashing_failed",
            AuthError::Cancelled => "cancelled",
            AuthError::Internal(_) => "internal",
        }
    }

    /// Message safe to return to callers. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AuthError::InvalidArgument(reason) => reason.clone(),
            AuthError::AccountAlreadyExists => "Account already exists".to_string(),
            AuthError::AccountNotFound => "Account not found".to_string(),
            AuthError::BadCredentials => "Invalid email, username or password".to_string(),
            AuthError::TokenNotFound => "Token not found".to_string(),
            AuthError::LinkNotFound => "Link not found".to_string(),
            AuthError::NotActivated => "Account not activated".to_string(),
            AuthError::TokenExpired => "Token expired".to_string(),
            AuthError::BadToken => "Bad token".to_string(),
            AuthError::Cancelled => "Request cancelled".to_string(),
            AuthError::HashingFailed(_) | AuthError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

/// An [`AuthError`] tagged with the operation that produced it.
#[derive(Debug)]
pub struct ServiceError {
    op: &'static str,
    kind: AuthError,
    cleanup: Option<AuthError>,
}

impl ServiceError {
    pub fn new(op: &'static str, kind: AuthError) -> Self {
        Self {
            op,
            kind,
            cleanup: None,
        }
    }

    /// Attach a failure from a best-effort cleanup step.
    pub fn with_cleanup(mut self, cleanup: AuthError) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    pub(crate) fn in_operation(mut self, op: &'static str) -> Self {
        self.op = op;
        self
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn kind(&self) -> &AuthError {
        &self.kind
    }

    pub fn cleanup(&self) -> Option<&AuthError> {
        self.cleanup.as_ref()
    }

    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// Report an unknown account exactly like a wrong password.
    pub fn mask_unknown_account(mut self) -> Self {
        if matches!(self.kind, AuthError::AccountNotFound) {
            self.kind = AuthError::BadCredentials;
        }
        self
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.op, self.kind)?;
        if let Some(cleanup) = &self.cleanup {
            write!(f, "; cleanup failed: {}", cleanup)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<AuthError> for ServiceError {
    fn from(kind: AuthError) -> Self {
        ServiceError::new("auth", kind)
    }
}

impl From<ServiceError> for tonic::Status {
    fn from(err: ServiceError) -> Self {
        tonic::Status::new(err.code().grpc_code(), err.kind.public_message())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

fn error_response(kind: &AuthError) -> Response {
    let code = kind.code();
    let body = ErrorResponse {
        error: ErrorDetail {
            code: code.as_str().to_string(),
            message: kind.public_message(),
        },
    };

    (code.http_status(), Json(body)).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        error_response(&self)
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        error_response(&self.kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_follow_transport_mapping() {
        assert_eq!(
            AuthError::InvalidArgument("x".into()).code(),
            ErrorCode::InvalidArgument
        );
        assert_eq!(AuthError::BadCredentials.code(), ErrorCode::InvalidArgument);
        assert_eq!(AuthError::AccountNotFound.code(), ErrorCode::NotFound);
        assert_eq!(AuthError::TokenNotFound.code(), ErrorCode::NotFound);
        assert_eq!(AuthError::LinkNotFound.code(), ErrorCode::NotFound);
        assert_eq!(
            AuthError::AccountAlreadyExists.code(),
            ErrorCode::AlreadyExists
        );
        assert_eq!(AuthError::NotActivated.code(), ErrorCode::Unauthenticated);
        assert_eq!(AuthError::TokenExpired.code(), ErrorCode::Unauthenticated);
        assert_eq!(AuthError::BadToken.code(), ErrorCode::Unauthenticated);
        assert_eq!(AuthError::Cancelled.code(), ErrorCode::Cancelled);
        assert_eq!(
            AuthError::HashingFailed("x".into()).code(),
            ErrorCode::Internal
        );
        assert_eq!(AuthError::Internal("x".into()).code(), ErrorCode::Internal);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            ErrorCode::InvalidArgument.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::AlreadyExists.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::Unauthenticated.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::Internal.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_error_keeps_primary_kind_with_cleanup() {
        let err = ServiceError::new("auth.refresh", AuthError::TokenExpired)
            .with_cleanup(AuthError::Internal("delete failed".into()));

        assert!(matches!(err.kind(), AuthError::TokenExpired));
        assert_eq!(err.code(), ErrorCode::Unauthenticated);
        assert!(matches!(err.cleanup(), Some(AuthError::Internal(_))));

        let rendered = err.to_string();
        assert!(rendered.starts_with("auth.refresh: Token expired"));
        assert!(rendered.contains("cleanup failed"));
    }

    #[test]
    fn test_mask_unknown_account() {
        let masked = ServiceError::new("auth.login", AuthError::AccountNotFound)
            .mask_unknown_account();
        assert!(matches!(masked.kind(), AuthError::BadCredentials));

        let untouched =
            ServiceError::new("auth.login", AuthError::NotActivated).mask_unknown_account();
        assert!(matches!(untouched.kind(), AuthError::NotActivated));
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AuthError::Internal("connection refused to 10.0.0.5".into());
        assert_eq!(err.public_message(), "An internal error occurred");
    }

    #[test]
    fn test_grpc_status_conversion() {
        let status: tonic::Status =
            ServiceError::new("auth.register", AuthError::AccountAlreadyExists).into();
        assert_eq!(status.code(), tonic::Code::AlreadyExists);

        let status: tonic::Status =
            ServiceError::new("auth.verify", AuthError::BadToken).into();
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
    }
}
