//! The room registry: every live room, keyed by room number.
//!
//! Like the session registry it has no lock of its own; the lobby owns
//! both registries behind a single mutex.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use skirmish_protocol::{PlayerId, RoomNumber, RoomSnapshot};

use crate::{Room, RoomError};

// ---------------------------------------------------------------------------
// Room numbers
// ---------------------------------------------------------------------------

/// Hands out room numbers derived from the wall clock in milliseconds.
///
/// Two rooms created in the same millisecond (or across a clock step
/// backwards) still get distinct, increasing numbers.
#[derive(Debug, Default)]
pub struct RoomNumberGenerator {
    last: u64,
}

impl RoomNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next number, given the current time in milliseconds.
    pub fn next_at(&mut self, now_ms: u64) -> RoomNumber {
        self.last = now_ms.max(self.last.saturating_add(1));
        RoomNumber(self.last)
    }

    /// Next number for the current wall-clock time.
    pub fn next(&mut self) -> RoomNumber {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        self.next_at(now_ms)
    }
}

// ---------------------------------------------------------------------------
// RoomRegistry
// ---------------------------------------------------------------------------

/// Maps room numbers to rooms.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomNumber, Room>,
    numbers: RoomNumberGenerator,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the number for a room about to be created.
    pub fn next_room_number(&mut self) -> RoomNumber {
        self.numbers.next()
    }

    pub fn get(&self, number: RoomNumber) -> Option<&Room> {
        self.rooms.get(&number)
    }

    pub fn get_mut(&mut self, number: RoomNumber) -> Option<&mut Room> {
        self.rooms.get_mut(&number)
    }

    /// Adds `player` to room `number`.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] for an unknown number, otherwise whatever
    /// [`Room::join`] refuses with.
    pub fn join(&mut self, number: RoomNumber, player: PlayerId) -> Result<(), RoomError> {
        self.rooms
            .get_mut(&number)
            .ok_or(RoomError::NotFound(number))?
            .join(player)
    }

    /// Registers a room.
    ///
    /// # Errors
    /// [`RoomError::AlreadyExists`] if the number is taken; the registered
    /// room is kept.
    pub fn put(&mut self, room: Room) -> Result<(), RoomError> {
        let number = room.number();
        if self.rooms.contains_key(&number) {
            return Err(RoomError::AlreadyExists(number));
        }
        self.rooms.insert(number, room);
        Ok(())
    }

    /// Removes and returns a room. Removing an absent room is a no-op.
    pub fn remove(&mut self, number: RoomNumber) -> Option<Room> {
        let removed = self.rooms.remove(&number);
        if removed.is_some() {
            tracing::info!(room = %number, "room disposed");
        }
        removed
    }

    /// Point-in-time list of every room, oldest first.
    pub fn snapshot_all(&self) -> Vec<RoomSnapshot> {
        let mut snapshots: Vec<RoomSnapshot> =
            self.rooms.values().map(Room::snapshot).collect();
        snapshots.sort_by_key(|s| s.room_number);
        snapshots
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
