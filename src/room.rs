//! Room registry
//!
//! In-process map from room name to the participants currently joined.
//! Rooms are created on first join and kept once empty.

use std::collections::HashMap;

use crate::types::{ParticipantId, RoomName};

/// Chat room membership
///
/// Members are kept in join order without duplicates.
#[derive(Debug)]
pub struct Room {
    /// Room name for identification
    pub name: RoomName,
    members: Vec<ParticipantId>,
}

impl Room {
    /// Create a new empty room
    pub fn new(name: RoomName) -> Self {
        Self {
            name,
            members: Vec::new(),
        }
    }

    /// Add a participant. Returns false if already a member.
    pub fn add(&mut self, participant: ParticipantId) -> bool {
        if self.contains(participant) {
            false
        } else {
            self.members.push(participant);
            true
        }
    }

    /// Remove a participant. Returns false if it was not a member.
    pub fn remove(&mut self, participant: ParticipantId) -> bool {
        let before = self.members.len();
        self.members.retain(|&id| id != participant);
        self.members.len() != before
    }

    /// Check if a participant is in this room
    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.members.contains(&participant)
    }

    pub fn members(&self) -> &[ParticipantId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// All rooms known to the server
///
/// Owned by the chat server actor; every operation on an unknown room or
/// participant is a silent no-op.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomName, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the given rooms already created, all empty
    pub fn with_rooms<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rooms = names
            .into_iter()
            .map(|name| {
                let name = RoomName::new(name);
                (name.clone(), Room::new(name))
            })
            .collect();
        Self { rooms }
    }

    /// Add a participant to a room, creating the room if absent.
    ///
    /// Returns false if the participant was already a member.
    pub fn join(&mut self, room: &RoomName, participant: ParticipantId) -> bool {
        self.rooms
            .entry(room.clone())
            .or_insert_with(|| Room::new(room.clone()))
            .add(participant)
    }

    /// Remove a participant from a room. Returns true if it was a member.
    pub fn leave(&mut self, room: &RoomName, participant: ParticipantId) -> bool {
        self.rooms
            .get_mut(room)
            .is_some_and(|r| r.remove(participant))
    }

    /// Remove a participant from every room listing it.
    ///
    /// Returns the rooms it was actually removed from.
    pub fn remove_everywhere(&mut self, participant: ParticipantId) -> Vec<RoomName> {
        let mut removed: Vec<RoomName> = self
            .rooms
            .values_mut()
            .filter_map(|r| r.remove(participant).then(|| r.name.clone()))
            .collect();
        removed.sort();
        removed
    }

    /// Current membership size, 0 for an unknown room
    pub fn count(&self, room: &RoomName) -> usize {
        self.rooms.get(room).map_or(0, Room::len)
    }

    /// Membership snapshot in join order
    pub fn members(&self, room: &RoomName) -> Vec<ParticipantId> {
        self.rooms
            .get(room)
            .map(|r| r.members().to_vec())
            .unwrap_or_default()
    }

    pub fn contains(&self, room: &RoomName, participant: ParticipantId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|r| r.contains(participant))
    }

    /// Number of rooms ever created
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
