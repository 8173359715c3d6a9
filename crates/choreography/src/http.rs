//! Health and metrics routes shared by every service.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::connection::ConnectionMonitor;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub broker: &'static str,
}

/// GET /health: UP while the broker connection is established.
pub async fn health(State(monitor): State<ConnectionMonitor>) -> impl IntoResponse {
    let state = monitor.state();
    if state.is_connected() {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "UP",
                broker: state.as_str(),
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "DOWN",
                broker: state.as_str(),
            }),
        )
    }
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}

/// Adds `/health` and `/metrics` to a service's own routes, with CORS and
/// request tracing on everything.
pub fn service_router(
    routes: Router,
    monitor: ConnectionMonitor,
    metrics_handle: PrometheusHandle,
) -> Router {
    let health_router = Router::new()
        .route("/health", get(health))
        .with_state(monitor);

    let metrics_router = Router::new()
        .route("/metrics", get(metrics))
        .with_state(metrics_handle);

    routes
        .merge(health_router)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
