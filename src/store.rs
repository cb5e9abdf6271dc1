//! Message persistence gateway
//!
//! The chat server only sees the [`MessageStore`] trait: append a message,
//! resolve its reply reference, load a room's history, clear a room.
//! [`MemoryStore`] is the in-process implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::types::{MessageId, ParticipantId, RoomName};

/// A message about to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub author_id: String,
    pub room: RoomName,
    pub message: String,
    pub reply_to: Option<MessageId>,
}

impl NewMessage {
    /// Message written by a participant
    pub fn from_participant(
        author: ParticipantId,
        room: RoomName,
        message: String,
        reply_to: Option<MessageId>,
    ) -> Self {
        Self {
            author_id: author.to_string(),
            room,
            message,
            reply_to,
        }
    }
}

/// Persisted record: `{id, authorId, room, message, timestamp, replyTo}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: MessageId,
    pub author_id: String,
    pub room: RoomName,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub reply_to: Option<MessageId>,
}

/// Display summary of a replied-to message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplySummary {
    pub id: MessageId,
    pub author_id: String,
    pub message: String,
}

/// Stored message with its reply reference resolved for display
///
/// `replyTo` is `null` when the message is not a reply or when the parent
/// no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMessage {
    pub id: MessageId,
    pub author_id: String,
    pub room: RoomName,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub reply_to: Option<ReplySummary>,
}

impl ResolvedMessage {
    fn new(stored: StoredMessage, reply_to: Option<ReplySummary>) -> Self {
        Self {
            id: stored.id,
            author_id: stored.author_id,
            room: stored.room,
            message: stored.message,
            timestamp: stored.timestamp,
            reply_to,
        }
    }
}

/// Persistence gateway consumed by the sessions
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Assign an id and timestamp, persist, return the stored form
    async fn append(&self, message: NewMessage) -> Result<StoredMessage, StoreError>;

    /// Attach the parent's summary, or `None` if it is missing
    async fn resolve_reply(&self, message: StoredMessage) -> Result<ResolvedMessage, StoreError>;

    /// All messages of a room, ascending by timestamp, replies resolved
    async fn history(&self, room: &RoomName) -> Result<Vec<ResolvedMessage>, StoreError>;

    /// Delete every message of a room, returning how many were removed
    async fn clear(&self, room: &RoomName) -> Result<u64, StoreError>;
}

/// In-memory message store
///
/// Messages are kept in insertion order, which is also timestamp order.
/// Each write takes the lock once, so inserts and bulk clears are atomic to
/// readers.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    messages: Arc<RwLock<Vec<StoredMessage>>>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, as if the backend were down
    pub fn unavailable() -> Self {
        Self {
            messages: Arc::default(),
            unavailable: true,
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("memory store disabled".to_string()))
        } else {
            Ok(())
        }
    }

    /// Total number of stored messages across all rooms
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }
}

impl From<&StoredMessage> for ReplySummary {
    fn from(m: &StoredMessage) -> Self {
        Self {
            id: m.id,
            author_id: m.author_id.clone(),
            message: m.message.clone(),
        }
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, message: NewMessage) -> Result<StoredMessage, StoreError> {
        self.check_available()?;

        let mut messages = self.messages.write().await;

        // Clamp so timestamps never go backwards, even if the clock does
        let now = Utc::now();
        let timestamp = match messages.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let stored = StoredMessage {
            id: MessageId::new(),
            author_id: message.author_id,
            room: message.room,
            message: message.message,
            timestamp,
            reply_to: message.reply_to,
        };
        messages.push(stored.clone());

        Ok(stored)
    }

    async fn resolve_reply(&self, message: StoredMessage) -> Result<ResolvedMessage, StoreError> {
        self.check_available()?;

        let messages = self.messages.read().await;
        // Parent must live in the same room as the reply
        let reply_to = message.reply_to.and_then(|parent| {
            messages
                .iter()
                .find(|m| m.id == parent && m.room == message.room)
                .map(ReplySummary::from)
        });
        Ok(ResolvedMessage::new(message, reply_to))
    }

    async fn history(&self, room: &RoomName) -> Result<Vec<ResolvedMessage>, StoreError> {
        self.check_available()?;

        let messages = self.messages.read().await;
        let in_room: Vec<&StoredMessage> = messages.iter().filter(|m| &m.room == room).collect();
        let by_id: HashMap<MessageId, &StoredMessage> = in_room.iter().map(|m| (m.id, *m)).collect();

        let history = in_room
            .iter()
            .map(|m| {
                let reply_to = m
                    .reply_to
                    .and_then(|parent| by_id.get(&parent))
                    .map(|parent| ReplySummary::from(*parent));
                ResolvedMessage::new((*m).clone(), reply_to)
            })
            .collect();
        Ok(history)
    }

    async fn clear(&self, room: &RoomName) -> Result<u64, StoreError> {
        self.check_available()?;

        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|m| &m.room != room);
        Ok((before - messages.len()) as u64)
    }
}
