//! Per-connection session handling
//!
//! A [`Session`] reacts to one connection's events in order. Store I/O is
//! awaited here, inside the connection task, so a slow store only stalls
//! this connection; membership changes and fan-out are handed to the
//! [`ChatServer`](crate::server::ChatServer) actor as commands.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::AppError;
use crate::message::{ClientEvent, ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::store::{MessageStore, NewMessage};
use crate::types::{MessageId, ParticipantId, RoomName};

/// Where a connection stands, as tracked by the chat server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// Connected, no room
    Connected,
    Joined(RoomName),
}

impl SessionState {
    pub fn room(&self) -> Option<&RoomName> {
        match self {
            SessionState::Joined(room) => Some(room),
            _ => None,
        }
    }
}

/// Event reactor for one connection
#[derive(Clone)]
pub struct Session {
    participant: ParticipantId,
    store: Arc<dyn MessageStore>,
    commands: mpsc::Sender<ServerCommand>,
}

impl Session {
    /// Register a new connection with the chat server
    pub async fn connect(
        participant: ParticipantId,
        sender: mpsc::Sender<ServerMessage>,
        store: Arc<dyn MessageStore>,
        commands: mpsc::Sender<ServerCommand>,
    ) -> Result<Self, AppError> {
        let session = Self {
            participant,
            store,
            commands,
        };
        session
            .submit(ServerCommand::Connect {
                participant,
                sender,
            })
            .await?;
        Ok(session)
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    /// Handle a decoded client frame
    ///
    /// Frames missing a room or body are dropped. Only a dead chat server is
    /// an error.
    pub async fn handle_message(&self, msg: ClientMessage) -> Result<(), AppError> {
        match msg.validate() {
            Ok(event) => self.handle_event(event).await,
            Err(skip) => {
                debug!("Skipping event from {}: {}", self.participant, skip);
                Ok(())
            }
        }
    }

    pub async fn handle_event(&self, event: ClientEvent) -> Result<(), AppError> {
        match event {
            ClientEvent::Join { room } => self.join(room).await,
            ClientEvent::Send {
                room,
                message,
                reply_to,
            } => self.send(room, message, reply_to).await,
            ClientEvent::Clear { room } => self.clear(room).await,
            ClientEvent::Leave { room } => self.leave(room).await,
        }
    }

    async fn join(&self, room: RoomName) -> Result<(), AppError> {
        self.submit(ServerCommand::Join {
            participant: self.participant,
            room: room.clone(),
        })
        .await?;

        let history = match self.store.history(&room).await {
            Ok(history) => Some(history),
            Err(e) => {
                error!("Failed to load history of {} for {}: {}", room, self.participant, e);
                None
            }
        };

        self.submit(ServerCommand::JoinCompleted {
            participant: self.participant,
            room,
            history,
        })
        .await
    }

    async fn send(
        &self,
        room: RoomName,
        message: String,
        reply_to: Option<MessageId>,
    ) -> Result<(), AppError> {
        let new_message = NewMessage::from_participant(self.participant, room, message, reply_to);

        let stored = match self.store.append(new_message).await {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to store message from {}: {}", self.participant, e);
                return Ok(());
            }
        };

        let resolved = match self.store.resolve_reply(stored).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(
                    "Failed to resolve reply for message from {}: {}",
                    self.participant, e
                );
                return Ok(());
            }
        };

        debug!(
            "Participant {} sent message {} to {}",
            self.participant, resolved.id, resolved.room
        );

        self.submit(ServerCommand::MessageStored { message: resolved })
            .await
    }

    // Any participant may clear any room.
    async fn clear(&self, room: RoomName) -> Result<(), AppError> {
        match self.store.clear(&room).await {
            Ok(removed) => {
                debug!("Removed {} messages from {}", removed, room);
            }
            Err(e) => {
                error!("Failed to clear {} for {}: {}", room, self.participant, e);
                return Ok(());
            }
        }

        self.submit(ServerCommand::HistoryCleared {
            room,
            cleared_by: self.participant,
        })
        .await
    }

    async fn leave(&self, room: RoomName) -> Result<(), AppError> {
        self.submit(ServerCommand::Leave {
            participant: self.participant,
            room,
        })
        .await
    }

    /// Tell the chat server the transport is gone
    pub async fn disconnect(&self) -> Result<(), AppError> {
        self.submit(ServerCommand::Disconnect {
            participant: self.participant,
        })
        .await
    }

    async fn submit(&self, cmd: ServerCommand) -> Result<(), AppError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| AppError::ChannelSend)
    }
}
