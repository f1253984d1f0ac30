//! E2E tests for login.

use auth_test_utils::assertions::TokenAssertions;
use auth_test_utils::server_harness::TestAuthServer;
use reqwest::StatusCode;
use serde_json::json;

async fn register(server: &TestAuthServer, username: &str, email: &str) -> Result<(), anyhow::Error> {
    let response = server
        .post_json(
            "/api/v1/auth/register",
            &json!({ "username": username, "email": email, "password": "pw12345678" }),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

async fn activate(server: &TestAuthServer, email: &str) -> Result<(), anyhow::Error> {
    let link = server
        .fixture()
        .activation_link_for(email)
        .await
        .ok_or_else(|| anyhow::anyhow!("no activation email"))?;
    let response = server
        .post_json("/api/v1/auth/activate", &json!({ "link": link }))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_login_before_activation_returns_401() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    register(&server, "alice", "alice@x.com").await?;

    let response = server
        .post_json(
            "/api/v1/auth/login",
            &json!({ "username": "alice", "password": "pw12345678" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    Ok(())
}

#[tokio::test]
async fn test_login_after_activation_returns_token_pair() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    register(&server, "alice", "alice@x.com").await?;
    activate(&server, "alice@x.com").await?;

    let response = server
        .post_json(
            "/api/v1/auth/login",
            &json!({ "username": "alice", "password": "pw12345678" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    let access = body["access_token"].as_str().unwrap_or_default().to_string();
    let refresh = body["refresh_token"].as_str().unwrap_or_default().to_string();
    access
        .assert_valid_jwt()
        .assert_for_username("alice")
        .assert_expires_in(900);
    refresh.assert_valid_jwt().assert_expires_in(3600);
    Ok(())
}

#[tokio::test]
async fn test_login_by_email_succeeds() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    register(&server, "alice", "alice@x.com").await?;
    activate(&server, "alice@x.com").await?;

    let response = server
        .post_json(
            "/api/v1/auth/login",
            &json!({ "email": "alice@x.com", "password": "pw12345678" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_login_unknown_user_matches_wrong_password() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    register(&server, "alice", "alice@x.com").await?;
    activate(&server, "alice@x.com").await?;

    let wrong_password = server
        .post_json(
            "/api/v1/auth/login",
            &json!({ "username": "alice", "password": "not-the-password" }),
        )
        .await?;
    let unknown_user = server
        .post_json(
            "/api/v1/auth/login",
            &json!({ "username": "mallory", "password": "pw12345678" }),
        )
        .await?;

    assert_eq!(wrong_password.status(), unknown_user.status());
    assert_eq!(wrong_password.status(), StatusCode::BAD_REQUEST);
    let a: serde_json::Value = wrong_password.json().await?;
    let b: serde_json::Value = unknown_user.json().await?;
    assert_eq!(a, b, "Response bodies must not reveal which part was wrong");
    Ok(())
}

#[tokio::test]
async fn test_login_without_identifier_returns_400() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .post_json("/api/v1/auth/login", &json!({ "password": "pw12345678" }))
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
