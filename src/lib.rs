//! Multi-room WebSocket Chat Relay Library
//!
//! A real-time chat relay built with tokio-tungstenite using the Actor
//! pattern for room state.
//!
//! # Features
//! - Named rooms, created on first join
//! - Message history with reply threading
//! - Membership count updates
//! - Room history clearing
//! - Disconnection handling
//!
//! # Architecture
//! - `ChatServer` is the central actor owning the room registry and every
//!   connection's outbound channel
//! - Each connection runs a `Session` that awaits the message store and
//!   then posts commands to the actor
//! - No locks around room state - all access goes through message passing
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use room_relay::{ChatServer, MemoryStore, MessageStore, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:5000").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!     let store: Arc<dyn MessageStore> = Arc::new(MemoryStore::new());
//!
//!     tokio::spawn(ChatServer::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, cmd_tx.clone(), store.clone(), 64));
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod message;
pub mod room;
pub mod server;
pub mod session;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{AppError, SendError, StoreError};
pub use handler::handle_connection;
pub use message::{ClientEvent, ClientMessage, OutboundMessage, ServerMessage};
pub use room::{Room, RoomRegistry};
pub use server::{ChatServer, ServerCommand};
pub use session::{Session, SessionState};
pub use store::{MemoryStore, MessageStore, NewMessage, ReplySummary, ResolvedMessage, StoredMessage};
pub use types::{MessageId, ParticipantId, RoomName, SYSTEM_AUTHOR};
