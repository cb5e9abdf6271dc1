//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol. Every frame is
//! `{"event": <name>, "data": <payload>}`, mapped with Serde's adjacently
//! tagged enums.
//!
//! Client payload fields are all optional on the wire. Validation into a
//! [`ClientEvent`] happens afterwards, so a frame with a missing room or
//! body is skipped rather than rejected as malformed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::ResolvedMessage;
use crate::types::{MessageId, RoomName, SYSTEM_AUTHOR};

/// Client → Server message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join (or switch to) a room
    JoinRoom(RoomPayload),
    /// Send a message, optionally as a reply
    ChatMessage(ChatPayload),
    /// Clear a room's history; payload is the bare room name
    ClearChat(Option<String>),
    /// Leave a room
    LeaveRoom(RoomPayload),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoomPayload {
    pub room: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatPayload {
    pub room: Option<String>,
    pub message: Option<String>,
    pub reply_to: Option<MessageId>,
}

/// Why a client message was dropped without effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationSkip {
    #[error("missing room")]
    MissingRoom,
    #[error("missing message body")]
    MissingMessage,
}

/// A validated client event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Join {
        room: RoomName,
    },
    Send {
        room: RoomName,
        message: String,
        reply_to: Option<MessageId>,
    },
    Clear {
        room: RoomName,
    },
    Leave {
        room: RoomName,
    },
}

fn require_room(room: Option<String>) -> Result<RoomName, ValidationSkip> {
    match room {
        Some(room) if !room.is_empty() => Ok(RoomName(room)),
        _ => Err(ValidationSkip::MissingRoom),
    }
}

impl ClientMessage {
    /// Check required fields, producing the event the session acts on
    pub fn validate(self) -> Result<ClientEvent, ValidationSkip> {
        match self {
            ClientMessage::JoinRoom(RoomPayload { room }) => Ok(ClientEvent::Join {
                room: require_room(room)?,
            }),
            ClientMessage::ChatMessage(ChatPayload {
                room,
                message,
                reply_to,
            }) => {
                let room = require_room(room)?;
                let message = match message {
                    Some(message) if !message.is_empty() => message,
                    _ => return Err(ValidationSkip::MissingMessage),
                };
                Ok(ClientEvent::Send {
                    room,
                    message,
                    reply_to,
                })
            }
            ClientMessage::ClearChat(room) => Ok(ClientEvent::Clear {
                room: require_room(room)?,
            }),
            ClientMessage::LeaveRoom(RoomPayload { room }) => Ok(ClientEvent::Leave {
                room: require_room(room)?,
            }),
        }
    }
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Handshake done, opaque participant ID issued
    Connected { participant_id: String },
    /// New chat message or system notification
    Message(OutboundMessage),
    /// Room history, sent once per join
    ChatHistory(Vec<ResolvedMessage>),
    /// Membership count update
    RoomUsers { count: usize },
    /// Room history was wiped
    ChatCleared,
}

impl ServerMessage {
    /// System notification authored by the server
    pub fn system(text: impl Into<String>) -> Self {
        ServerMessage::Message(OutboundMessage::System(SystemMessage::new(text)))
    }

    /// Participant message, already persisted and reply-resolved
    pub fn chat(message: ResolvedMessage) -> Self {
        ServerMessage::Message(OutboundMessage::Chat(message))
    }
}

/// Payload of the `message` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    System(SystemMessage),
    Chat(ResolvedMessage),
}

/// `{authorId: "system", message, replyTo: null}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessage {
    pub author_id: String,
    pub message: String,
    pub reply_to: Option<MessageId>,
}

impl SystemMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            author_id: SYSTEM_AUTHOR.to_string(),
            message: text.into(),
            reply_to: None,
        }
    }
}
