use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use peerchat_server::config::ServerConfig;
use peerchat_server::{Directory, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    logging::init(config.verbose, "info");

    let directory = Arc::new(Directory::new());
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to listen on {}", addr))?;

    info!("Directory server listening on {}", listener.local_addr()?);

    tokio::select! {
        _ = directory.serve(listener) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    Ok(())
}
