//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake, JSON
//! framing, and bidirectional communication with the ChatServer.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::session::Session;
use crate::store::MessageStore;
use crate::types::ParticipantId;

/// Handle a new TCP connection
///
/// Performs WebSocket handshake, sets up bidirectional communication,
/// and manages the connection lifecycle.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    store: Arc<dyn MessageStore>,
    buffer_size: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let participant = ParticipantId::new();
    info!("Participant {} connected from {}", participant, peer_addr);

    // Channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(buffer_size);

    // Queued ahead of any room traffic so the client learns its own id first.
    // Nothing fallible may run between connect and the task spawns below,
    // or the participant would stay registered with the server.
    msg_tx
        .send(ServerMessage::Connected {
            participant_id: participant.to_string(),
        })
        .await
        .map_err(|_| AppError::ChannelSend)?;

    let session = Session::connect(participant, msg_tx, store, cmd_tx).await?;

    let read_session = session.clone();

    // Read task: WebSocket -> Session, one event at a time
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        if read_session.handle_message(client_msg).await.is_err() {
                            debug!("Server closed, ending read task for {}", participant);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Invalid event from {}: {}", participant, e);
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Participant {} sent close frame", participant);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", participant);
                }
                Ok(Message::Pong(_)) => {
                    debug!("Pong from {}", participant);
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", participant, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", participant);
    });

    // Write task: ServerMessage -> WebSocket
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                }
            }
        }
        debug!("Write task ended for {}", participant);

        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete, then stop the other
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", participant);
            write_task.abort();
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", participant);
            read_task.abort();
        }
    }

    let _ = session.disconnect().await;

    info!("Participant {} disconnected", participant);

    Ok(())
}
