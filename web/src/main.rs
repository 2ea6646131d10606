//! todo-relay server binary.
//!
//! One process, two listeners: the REST API and the WebSocket updates
//! endpoint, sharing a single store and broadcaster so both surfaces
//! observe the same event sequence.

use anyhow::Context as _;
use std::future::IntoFuture as _;
use todo_relay_core::ServiceConfig;
use todo_relay_web::{AppState, api_router, updates_router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::from_env();
    let state = AppState::from_config(&config);

    let api_listener = tokio::net::TcpListener::bind(config.api_addr)
        .await
        .with_context(|| format!("binding API listener on {}", config.api_addr))?;
    let updates_listener = tokio::net::TcpListener::bind(config.updates_addr)
        .await
        .with_context(|| format!("binding updates listener on {}", config.updates_addr))?;

    info!(api = %config.api_addr, updates = %config.updates_addr, "todo-relay listening");

    tokio::try_join!(
        axum::serve(api_listener, api_router(state.clone())).into_future(),
        axum::serve(updates_listener, updates_router(state)).into_future(),
    )
    .context("server terminated")?;

    Ok(())
}
