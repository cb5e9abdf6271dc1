//! ChatServer Actor implementation
//!
//! The central actor that owns all in-memory state: the room registry, each
//! connection's session state and the broadcast dispatcher. Commands are
//! processed one at a time on a single task, so every fan-out sees a
//! consistent membership snapshot and no locks are needed.
//!
//! Persistence never happens here. Sessions do their store I/O in their own
//! connection task and post the outcome back as a command.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::client::Client;
use crate::dispatch::Dispatcher;
use crate::message::ServerMessage;
use crate::room::RoomRegistry;
use crate::session::SessionState;
use crate::store::ResolvedMessage;
use crate::types::{ParticipantId, RoomName};

/// Commands sent from sessions to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection established
    Connect {
        participant: ParticipantId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Connection closed at the transport level
    Disconnect { participant: ParticipantId },
    /// Enter a room (leaving any other room first)
    Join {
        participant: ParticipantId,
        room: RoomName,
    },
    /// History for a join has been loaded (`None` if the load failed)
    JoinCompleted {
        participant: ParticipantId,
        room: RoomName,
        history: Option<Vec<ResolvedMessage>>,
    },
    /// Leave a room
    Leave {
        participant: ParticipantId,
        room: RoomName,
    },
    /// A message was persisted and should be fanned out
    MessageStored { message: ResolvedMessage },
    /// A room's history was deleted
    HistoryCleared {
        room: RoomName,
        cleared_by: ParticipantId,
    },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// Room name -> joined participants
    registry: RoomRegistry,
    /// Session state of every live connection
    sessions: HashMap<ParticipantId, SessionState>,
    /// Outbound channels of every live connection
    dispatcher: Dispatcher,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with a fresh registry
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self::with_registry(receiver, RoomRegistry::new())
    }

    /// Create a ChatServer around an existing registry
    pub fn with_registry(receiver: mpsc::Receiver<ServerCommand>, registry: RoomRegistry) -> Self {
        Self {
            registry,
            sessions: HashMap::new(),
            dispatcher: Dispatcher::new(),
            receiver,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn session_state(&self, participant: ParticipantId) -> SessionState {
        self.sessions
            .get(&participant)
            .cloned()
            .unwrap_or(SessionState::Disconnected)
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    pub fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect {
                participant,
                sender,
            } => self.handle_connect(participant, sender),
            ServerCommand::Disconnect { participant } => self.handle_disconnect(participant),
            ServerCommand::Join { participant, room } => self.handle_join(participant, room),
            ServerCommand::JoinCompleted {
                participant,
                room,
                history,
            } => self.handle_join_completed(participant, room, history),
            ServerCommand::Leave { participant, room } => self.handle_leave(participant, room),
            ServerCommand::MessageStored { message } => self.handle_message_stored(message),
            ServerCommand::HistoryCleared { room, cleared_by } => {
                self.handle_history_cleared(room, cleared_by)
            }
        }
    }

    /// Handle new connection
    fn handle_connect(&mut self, participant: ParticipantId, sender: mpsc::Sender<ServerMessage>) {
        info!("Participant {} connected", participant);
        self.dispatcher.register(Client::new(participant, sender));
        self.sessions.insert(participant, SessionState::Connected);
        debug!(
            "Total connections: {}, Total rooms: {}",
            self.dispatcher.connection_count(),
            self.registry.room_count()
        );
    }

    /// Handle connection closure
    ///
    /// Safe to call after an explicit leave: only rooms still listing the
    /// participant get a departure notice.
    fn handle_disconnect(&mut self, participant: ParticipantId) {
        info!("Participant {} disconnected", participant);

        for room in self.registry.remove_everywhere(participant) {
            self.notify_left(&room, participant);
        }

        self.sessions.remove(&participant);
        self.dispatcher.unregister(participant);

        debug!(
            "Total connections: {}, Total rooms: {}",
            self.dispatcher.connection_count(),
            self.registry.room_count()
        );
    }

    /// Handle room joining
    ///
    /// Welcome and the join notice go out now; history and the member count
    /// follow on `JoinCompleted`.
    fn handle_join(&mut self, participant: ParticipantId, room: RoomName) {
        let Some(state) = self.sessions.get(&participant).cloned() else {
            return;
        };

        if let SessionState::Joined(current) = &state {
            if current != &room {
                debug!(
                    "Participant {} switching from {} to {}",
                    participant, current, room
                );
                self.leave_room(participant, current);
            }
        }

        let newly_joined = self.registry.join(&room, participant);
        self.sessions
            .insert(participant, SessionState::Joined(room.clone()));

        info!("Participant {} joined room {}", participant, room);

        self.dispatcher
            .to_participant(participant, ServerMessage::system(format!("Welcome to {room}!")));

        if newly_joined {
            let members = self.registry.members(&room);
            self.dispatcher.to_room(
                &members,
                &ServerMessage::system(format!("{participant} has joined the chat")),
                Some(participant),
            );
        }
    }

    /// Deliver the loaded history, then the updated count
    fn handle_join_completed(
        &mut self,
        participant: ParticipantId,
        room: RoomName,
        history: Option<Vec<ResolvedMessage>>,
    ) {
        if let Some(history) = history {
            debug!(
                "Sending {} history messages of {} to {}",
                history.len(),
                room,
                participant
            );
            self.dispatcher
                .to_participant(participant, ServerMessage::ChatHistory(history));
        }

        self.broadcast_count(&room);
    }

    /// Handle voluntary room leaving
    fn handle_leave(&mut self, participant: ParticipantId, room: RoomName) {
        if !self.sessions.contains_key(&participant) {
            return;
        }

        if !self.leave_room(participant, &room) {
            debug!("Participant {} is not in room {}", participant, room);
        }
    }

    /// Fan out a persisted message to the whole room, sender included
    fn handle_message_stored(&mut self, message: ResolvedMessage) {
        let members = self.registry.members(&message.room);
        debug!(
            "Broadcasting message {} to {} members of {}",
            message.id,
            members.len(),
            message.room
        );
        self.dispatcher
            .to_room(&members, &ServerMessage::chat(message), None);
    }

    fn handle_history_cleared(&mut self, room: RoomName, cleared_by: ParticipantId) {
        info!("Room {} history cleared by {}", room, cleared_by);

        let members = self.registry.members(&room);
        self.dispatcher
            .to_room(&members, &ServerMessage::ChatCleared, None);
        self.dispatcher.to_room(
            &members,
            &ServerMessage::system("Chat history has been cleared"),
            None,
        );
    }

    /// Helper: Remove a participant from a room and notify who remains
    ///
    /// Returns false if the participant was not a member.
    fn leave_room(&mut self, participant: ParticipantId, room: &RoomName) -> bool {
        if !self.registry.leave(room, participant) {
            return false;
        }

        if let Some(state) = self.sessions.get_mut(&participant) {
            if state.room() == Some(room) {
                *state = SessionState::Connected;
            }
        }

        info!("Participant {} left room {}", participant, room);
        self.notify_left(room, participant);
        true
    }

    /// Helper: Departure notice plus count to the remaining members
    fn notify_left(&self, room: &RoomName, participant: ParticipantId) {
        let members = self.registry.members(room);
        self.dispatcher.to_room(
            &members,
            &ServerMessage::system(format!("{participant} has left the chat")),
            None,
        );
        self.dispatcher.to_room(
            &members,
            &ServerMessage::RoomUsers {
                count: members.len(),
            },
            None,
        );
    }

    fn broadcast_count(&self, room: &RoomName) {
        let members = self.registry.members(room);
        self.dispatcher.to_room(
            &members,
            &ServerMessage::RoomUsers {
                count: members.len(),
            },
            None,
        );
    }
}
