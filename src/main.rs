//! Crisis Monitor — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, the Prometheus
//! exporter, and the background retention sweeper.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crisis_monitor::api::{create_router, AppState};
use crisis_monitor::cleanup::spawn_retention_sweeper;
use crisis_monitor::config::Config;
use crisis_monitor::metrics::Metrics;
use crisis_monitor::store::MemoryStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crisis_monitor=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = Config::from_env();
    let metrics = Metrics::init();
    let store = MemoryStore::shared();

    let _sweeper = spawn_retention_sweeper(store.clone(), cfg.sweep_interval);

    let app = create_router(AppState::new(store, cfg.feed), cfg.cors_layer())
        .merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "crisis-monitor API listening");

    axum::serve(listener, app).await.context("serving API")?;
    Ok(())
}
