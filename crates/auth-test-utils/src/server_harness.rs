//! Test server harness for E2E testing
//!
//! Provides TestAuthServer for spawning the real auth router in tests.

use crate::fixtures::{TestService, TestServiceBuilder};
use auth_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test harness serving the auth routes over the in-memory store.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_register_e2e() -> Result<(), anyhow::Error> {
///     let server = TestAuthServer::spawn().await?;
///     let response = server
///         .client()
///         .post(server.endpoint("/api/v1/auth/register"))
///         .json(&serde_json::json!({
///             "username": "alice",
///             "email": "alice@x.com",
///             "password": "pw12345678",
///         }))
///         .send()
///         .await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    fixture: TestService,
    client: reqwest::Client,
    shutdown: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestAuthServer {
    /// Spawn a server with default fixtures.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(TestServiceBuilder::new()).await
    }

    /// Spawn a server around a customised fixture.
    ///
    /// The server binds to 127.0.0.1:0 and runs in the background until
    /// the harness is dropped.
    pub async fn spawn_with(builder: TestServiceBuilder) -> Result<Self, anyhow::Error> {
        let fixture = builder.build();
        let shutdown = CancellationToken::new();

        let state = Arc::new(AppState {
            service: fixture.service.clone(),
            shutdown: shutdown.clone(),
        });

        // The global recorder can only be installed once per test process.
        // Later servers get a standalone recorder.
        let metrics_handle = match routes::init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let server_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await });
            if let Err(e) = serve.await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            fixture,
            client: reqwest::Client::new(),
            shutdown,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url(), path)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// The service and test doubles behind the server.
    pub fn fixture(&self) -> &TestService {
        &self.fixture
    }

    /// POST a JSON body to `path`.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let response = self.client.post(self.endpoint(path)).json(body).send().await?;
        Ok(response)
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.fixture.cancel.cancel();
    }
}
