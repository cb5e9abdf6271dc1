//! Client struct definition
//!
//! The server-side handle of one connection: its participant ID and the
//! channel feeding its WebSocket write task.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ParticipantId;

/// Connected client
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ParticipantId,
    /// Server → Client message channel
    sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client with the given ID and sender channel
    pub fn new(id: ParticipantId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { id, sender }
    }

    /// Queue a message for this client without waiting
    ///
    /// Fails if the channel is closed (client disconnected) or full (client
    /// not keeping up). Either way the message is dropped.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::ChannelFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_send() {
        let (tx, mut rx) = mpsc::channel(32);
        let client = Client::new(ParticipantId::new(), tx);

        client.send(ServerMessage::ChatCleared).unwrap();
        assert_eq!(rx.recv().await, Some(ServerMessage::ChatCleared));
    }

    #[tokio::test]
    async fn test_client_send_full() {
        let (tx, _rx) = mpsc::channel(1);
        let client = Client::new(ParticipantId::new(), tx);

        client.send(ServerMessage::ChatCleared).unwrap();
        assert!(matches!(
            client.send(ServerMessage::ChatCleared),
            Err(SendError::ChannelFull)
        ));
    }

    #[tokio::test]
    async fn test_client_send_closed() {
        let (tx, rx) = mpsc::channel(32);
        let client = Client::new(ParticipantId::new(), tx);
        drop(rx);

        assert!(matches!(
            client.send(ServerMessage::ChatCleared),
            Err(SendError::ChannelClosed)
        ));
    }
}
