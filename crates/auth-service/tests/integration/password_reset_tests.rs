//! E2E tests for the password reset flow.

use auth_test_utils::server_harness::TestAuthServer;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_password_reset_flow_revokes_sessions() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let tokens = server
        .fixture()
        .register_and_login("alice", "alice@x.com", "pw12345678")
        .await?;

    let response = server
        .post_json("/api/v1/auth/password/link", &json!({ "email": "alice@x.com" }))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let link = server
        .fixture()
        .reset_link_for("alice@x.com")
        .await
        .ok_or_else(|| anyhow::anyhow!("no reset email"))?;

    let response = server
        .post_json(
            "/api/v1/auth/password/change",
            &json!({ "link": link, "password": "new-password-1" }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let refresh = server
        .post_json(
            "/api/v1/auth/refresh",
            &json!({ "refresh_token": tokens.refresh_token }),
        )
        .await?;
    assert_eq!(refresh.status(), StatusCode::NOT_FOUND);

    let old_login = server
        .post_json(
            "/api/v1/auth/login",
            &json!({ "username": "alice", "password": "pw12345678" }),
        )
        .await?;
    assert_eq!(old_login.status(), StatusCode::BAD_REQUEST);

    let new_login = server
        .post_json(
            "/api/v1/auth/login",
            &json!({ "username": "alice", "password": "new-password-1" }),
        )
        .await?;
    assert_eq!(new_login.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_password_link_unknown_email_returns_404() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .post_json("/api/v1/auth/password/link", &json!({ "email": "nobody@x.com" }))
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_change_password_short_password_returns_400() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .post_json(
            "/api/v1/auth/password/change",
            &json!({ "link": "whatever", "password": "short" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_change_password_reused_link_returns_404() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server
        .fixture()
        .register_and_activate("alice", "alice@x.com", "pw12345678")
        .await?;
    server
        .post_json("/api/v1/auth/password/link", &json!({ "email": "alice@x.com" }))
        .await?;
    let link = server
        .fixture()
        .reset_link_for("alice@x.com")
        .await
        .ok_or_else(|| anyhow::anyhow!("no reset email"))?;

    let first = server
        .post_json(
            "/api/v1/auth/password/change",
            &json!({ "link": link, "password": "new-password-1" }),
        )
        .await?;
    let second = server
        .post_json(
            "/api/v1/auth/password/change",
            &json!({ "link": link, "password": "new-password-2" }),
        )
        .await?;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    Ok(())
}
