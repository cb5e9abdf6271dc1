//! Multi-room WebSocket Chat Relay - Entry Point
//!
//! Loads configuration, starts the ChatServer actor and accepts
//! connections.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use room_relay::{
    handle_connection, ChatServer, Config, MemoryStore, MessageStore, RoomRegistry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let dotenv_loaded = dotenv::dotenv().is_ok();

    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=room_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("room_relay=info")),
        )
        .init();

    if dotenv_loaded {
        debug!("Loaded environment from .env");
    }

    let mut config = Config::from_env()?;

    // Bind address on the command line overrides the environment
    if let Some(addr) = env::args().nth(1) {
        config.bind_address = addr;
    }

    info!(?config, "Configuration loaded");

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Chat relay listening on {}", config.bind_address);

    let store: Arc<dyn MessageStore> = Arc::new(MemoryStore::new());

    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer_size);
    let registry = RoomRegistry::with_rooms(&config.default_rooms);
    tokio::spawn(ChatServer::with_registry(cmd_rx, registry).run());

    info!("ChatServer actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let store = store.clone();
                let buffer_size = config.client_buffer_size;

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, store, buffer_size).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
