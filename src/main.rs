//! gobangd - online gobang (five-in-a-row) battle platform backend.

use gobangd::config::Config;
use gobangd::db::Database;
use gobangd::game::DiscardBridge;
use gobangd::network::Gateway;
use gobangd::state::Hub;
use gobangd::{http, metrics};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "failed to load config");
        e
    })?;

    info!(server = %config.server.name, "starting gobangd");

    // Initialize database
    let db_path = config
        .database
        .as_ref()
        .map(|d| d.path.as_str())
        .unwrap_or("gobang.db");
    let db = Database::new(db_path).await?;

    // Prometheus metrics are optional.
    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.server.metrics_port.unwrap_or(9090);
    if metrics_port == 0 {
        info!("metrics disabled");
    } else {
        metrics::init();
        tokio::spawn(async move {
            http::run_http_server(metrics_port).await;
        });
        info!(port = metrics_port, "metrics endpoint started");
    }

    // Shared state, injected into the gateway; the game bridge is a stub
    // until the match logic lands.
    let hub = Arc::new(Hub::new(
        config.server.name.clone(),
        db,
        Arc::new(DiscardBridge),
    ));

    let gateway = Gateway::bind(
        config.listen.address,
        config.web.landing_page.clone(),
        hub,
    )
    .await?;

    gateway.run().await
}
