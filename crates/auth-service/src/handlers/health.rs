//! Operational endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// Liveness probe. Does not check dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Prometheus text exposition of everything recorded in this process.
#[tracing::instrument(skip_all, name = "auth.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
