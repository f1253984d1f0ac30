//! Operational endpoint tests.

use auth_test_utils::server_harness::TestAuthServer;
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_returns_ok() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server.client().get(server.endpoint("/health")).send().await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_renders_text() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server.client().get(server.endpoint("/metrics")).send().await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_404() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = server
        .client()
        .get(server.endpoint("/api/v1/auth/nope"))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
