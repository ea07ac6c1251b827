//! MindMeld Game Server
//!
//! Server binary for the two-player matching game: binds the WebSocket
//! listener and runs until shutdown.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mindmeld::network::{GameServer, ServerConfig};
use mindmeld::{LOBBY_CAPACITY, MAX_ROUNDS, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env().context("invalid server configuration")?;

    info!("MindMeld Server v{}", VERSION);
    info!("Rounds per game: {}", MAX_ROUNDS);
    info!("Players per room: {}", LOBBY_CAPACITY);

    let server = GameServer::new(config);
    server.run().await.context("server exited with error")?;

    Ok(())
}
