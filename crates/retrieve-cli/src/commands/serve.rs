//! Serve command handler

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use retrieve_core::{server, BlockServer, Config, Store};

/// Run the block server until Ctrl-C
pub async fn run(config: &Config, listen: Option<String>, store: Option<String>) -> Result<()> {
    let listen = listen.unwrap_or_else(|| config.listen.clone());
    let conn = store.unwrap_or_else(|| config.store.clone());

    let store = Store::open_with_options(&conn, config.store_options())
        .await
        .context("Failed to open store")?;
    let store = Arc::new(store);

    let listener = TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to listen on {}", listen))?;

    let block_server = Arc::new(BlockServer::new(Arc::clone(&store)));
    server::serve(listener, block_server, shutdown_signal())
        .await
        .context("Block server failed")?;

    match Arc::try_unwrap(store) {
        Ok(store) => store.close().await,
        Err(_) => warn!("store still in use at shutdown"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
