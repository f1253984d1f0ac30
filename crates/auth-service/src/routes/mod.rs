//! HTTP routes for the auth service.
//!
//! Defines the Axum router and application state.

use crate::handlers;
use crate::services::CredentialService;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CredentialService>,

    /// Cancelled after the server has drained. Every request context is a
    /// child of it.
    pub shutdown: CancellationToken,
}

/// Build the application routes.
///
/// - `/api/v1/auth/*` - one POST route per credential operation
/// - `/health` - liveness probe
/// - `/metrics` - Prometheus metrics
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_routes = Router::new()
        .route("/api/v1/auth/register", post(handlers::handle_register))
        .route("/api/v1/auth/login", post(handlers::handle_login))
        .route("/api/v1/auth/logout", post(handlers::handle_logout))
        .route("/api/v1/auth/activate", post(handlers::handle_activate))
        .route("/api/v1/auth/refresh", post(handlers::handle_refresh))
        .route("/api/v1/auth/verify", post(handlers::handle_verify))
        .route(
            "/api/v1/auth/password/link",
            post(handlers::handle_send_password_link),
        )
        .route(
            "/api/v1/auth/password/change",
            post(handlers::handle_change_password),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    auth_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
