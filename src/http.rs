//! HTTP server for the Prometheus metrics endpoint.
//!
//! Runs on a separate tokio task, off the game port.

use axum::{Router, routing::get};
use std::net::SocketAddr;

/// Handler for GET /metrics - Prometheus text format.
async fn metrics_handler() -> String {
    crate::metrics::gather()
}

/// Handler for GET /healthz - liveness probe.
async fn healthz_handler() -> &'static str {
    "ok"
}

/// Run the metrics HTTP server on `0.0.0.0:port`.
///
/// Long-running; spawn it in the background.
pub async fn run_http_server(port: u16) {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "metrics HTTP server listening");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind metrics HTTP server");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "metrics HTTP server error");
    }
}
