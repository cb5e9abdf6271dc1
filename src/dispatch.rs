//! Broadcast dispatcher
//!
//! Connection table plus room fan-out. Delivery is fire-and-forget: a full
//! or closed connection misses the event and resyncs on its next join.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::client::Client;
use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ParticipantId;

#[derive(Debug, Default)]
pub struct Dispatcher {
    clients: HashMap<ParticipantId, Client>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client: Client) {
        self.clients.insert(client.id, client);
    }

    pub fn unregister(&mut self, participant: ParticipantId) -> Option<Client> {
        self.clients.remove(&participant)
    }

    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    /// Deliver to a single connection
    pub fn to_participant(&self, participant: ParticipantId, msg: ServerMessage) {
        let Some(client) = self.clients.get(&participant) else {
            debug!("No connection for {}, dropping message", participant);
            return;
        };
        deliver(client, msg);
    }

    /// Deliver to every member of a room snapshot, optionally skipping one
    pub fn to_room(
        &self,
        members: &[ParticipantId],
        msg: &ServerMessage,
        exclude: Option<ParticipantId>,
    ) {
        for &member in members {
            if Some(member) == exclude {
                continue;
            }
            if let Some(client) = self.clients.get(&member) {
                deliver(client, msg.clone());
            }
        }
    }
}

fn deliver(client: &Client, msg: ServerMessage) {
    match client.send(msg) {
        Ok(()) => {}
        Err(SendError::ChannelFull) => {
            warn!("Outbound queue full for {}, message dropped", client.id);
        }
        Err(SendError::ChannelClosed) => {
            debug!("Connection {} already closed, message dropped", client.id);
        }
    }
}
