//! E2E tests for refresh, verify and logout.

use auth_test_utils::server_harness::TestAuthServer;
use reqwest::StatusCode;
use serde_json::json;

async fn logged_in(server: &TestAuthServer) -> Result<(String, String), anyhow::Error> {
    let tokens = server
        .fixture()
        .register_and_login("alice", "alice@x.com", "pw12345678")
        .await?;
    Ok((tokens.access_token, tokens.refresh_token))
}

#[tokio::test]
async fn test_verify_valid_access_token_returns_true() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let (access, _) = logged_in(&server).await?;

    let response = server
        .post_json("/api/v1/auth/verify", &json!({ "access_token": access }))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, json!({ "verified": true }));
    Ok(())
}

#[tokio::test]
async fn test_verify_garbage_returns_401() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .post_json("/api/v1/auth/verify", &json!({ "access_token": "not.a.jwt" }))
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["message"], "Bad token");
    Ok(())
}

#[tokio::test]
async fn test_refresh_returns_same_refresh_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let (_, refresh) = logged_in(&server).await?;

    let response = server
        .post_json("/api/v1/auth/refresh", &json!({ "refresh_token": refresh }))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["refresh_token"].as_str(), Some(refresh.as_str()));
    assert!(body["access_token"].as_str().is_some());
    Ok(())
}

#[tokio::test]
async fn test_logout_then_refresh_returns_404() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let (_, refresh) = logged_in(&server).await?;

    let logout = server
        .post_json("/api/v1/auth/logout", &json!({ "refresh_token": refresh }))
        .await?;
    assert_eq!(logout.status(), StatusCode::OK);

    let refresh_again = server
        .post_json("/api/v1/auth/refresh", &json!({ "refresh_token": refresh }))
        .await?;
    assert_eq!(refresh_again.status(), StatusCode::NOT_FOUND);

    let logout_again = server
        .post_json("/api/v1/auth/logout", &json!({ "refresh_token": refresh }))
        .await?;
    assert_eq!(logout_again.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_logout_empty_token_returns_400() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .post_json("/api/v1/auth/logout", &json!({ "refresh_token": "" }))
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_request_id_header_is_accepted() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let (access, _) = logged_in(&server).await?;

    let response = server
        .client()
        .post(server.endpoint("/api/v1/auth/verify"))
        .header("x-request-id", "8f14e45f-ceea-467a-9b36-3c1b5a7e8a01")
        .json(&json!({ "access_token": access }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
