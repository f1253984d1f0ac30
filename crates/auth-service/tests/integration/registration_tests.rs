//! E2E tests for registration and activation.
//!
//! ## Test Naming
//!
//! Tests follow the convention: `test_<feature>_<scenario>_<expected_result>`

use auth_test_utils::server_harness::TestAuthServer;
use auth_test_utils::TestServiceBuilder;
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_happy_path_returns_success() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .post_json(
            "/api/v1/auth/register",
            &json!({
                "username": "alice",
                "email": "alice@x.com",
                "password": "pw12345678"
            }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, json!({ "success": true }));
    assert!(body.get("access_token").is_none(), "No token before activation");

    let link = server.fixture().activation_link_for("alice@x.com").await;
    assert!(link.is_some(), "Activation email should be sent");
    Ok(())
}

#[tokio::test]
async fn test_register_duplicate_username_returns_409() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server
        .post_json(
            "/api/v1/auth/register",
            &json!({ "username": "alice", "email": "alice@x.com", "password": "pw12345678" }),
        )
        .await?;

    let response = server
        .post_json(
            "/api/v1/auth/register",
            &json!({ "username": "alice", "email": "other@x.com", "password": "pw12345678" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "ALREADY_EXISTS");
    Ok(())
}

#[tokio::test]
async fn test_register_missing_field_returns_400() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .post_json(
            "/api/v1/auth/register",
            &json!({ "username": "alice", "password": "pw12345678" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
    assert_eq!(body["error"]["message"], "email is required");
    assert_eq!(server.fixture().store.account_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_register_malformed_email_returns_400() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .post_json(
            "/api/v1/auth/register",
            &json!({ "username": "alice", "email": "alice", "password": "pw12345678" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_register_succeeds_when_mail_fails() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn_with(TestServiceBuilder::new().failing_mailer()).await?;

    let response = server
        .post_json(
            "/api/v1/auth/register",
            &json!({ "username": "alice", "email": "alice@x.com", "password": "pw12345678" }),
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let attempted = server
        .fixture()
        .mailer
        .wait_for(1, std::time::Duration::from_secs(2))
        .await;
    assert_eq!(attempted.len(), 1, "Send is attempted exactly once");
    Ok(())
}

// ============================================================================
// Activation
// ============================================================================

#[tokio::test]
async fn test_activate_unknown_link_returns_404() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .post_json("/api/v1/auth/activate", &json!({ "link": "does-not-exist" }))
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn test_activate_provisioner_down_returns_500_without_details() -> Result<(), anyhow::Error>
{
    let server =
        TestAuthServer::spawn_with(TestServiceBuilder::new().failing_provisioner()).await?;
    server
        .post_json(
            "/api/v1/auth/register",
            &json!({ "username": "alice", "email": "alice@x.com", "password": "pw12345678" }),
        )
        .await?;
    let link = server
        .fixture()
        .activation_link_for("alice@x.com")
        .await
        .ok_or_else(|| anyhow::anyhow!("no activation email"))?;

    let response = server
        .post_json("/api/v1/auth/activate", &json!({ "link": link }))
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["message"], "An internal error occurred");
    assert_eq!(server.fixture().provisioner.call_count(), 1);
    Ok(())
}
