//! Error types for the chat relay
//!
//! Defines application-level errors, persistence errors and message send
//! errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// These end a connection. Per-event failures never surface here; see
/// [`StoreError`].
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Channel send error (fatal - chat server actor is gone)
    #[error("Channel send error")]
    ChannelSend,
}

/// Persistence gateway errors
///
/// Contained per event: the session logs them and carries on.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Message send errors
///
/// Occurs when attempting to deliver to a connection's outbound channel.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The connection is not draining its outbound queue
    #[error("Channel full")]
    ChannelFull,
}
