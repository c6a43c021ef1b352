//! Error types for the room layer.
//!
//! Every variant is a refused guard: the room was left exactly as it was,
//! and the dispatcher answers `approved:false`.

use skirmish_protocol::{PlayerId, RoomNumber};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    /// The room does not exist (never created, or already disposed).
    #[error("room {0} not found")]
    NotFound(RoomNumber),

    /// A room with this number is already registered.
    #[error("room {0} already exists")]
    AlreadyExists(RoomNumber),

    /// Capacity outside `1..=4`.
    #[error("invalid capacity {0}")]
    InvalidCapacity(usize),

    /// The game has started; the room no longer takes joins or a second start.
    #[error("room {0} has already started")]
    NotOpen(RoomNumber),

    /// No player slots left.
    #[error("room {0} is full")]
    Full(RoomNumber),

    /// The host left and nobody took over, so the room cannot be joined.
    #[error("room {0} has no host")]
    NoHost(RoomNumber),

    #[error("player {0} already in room {1}")]
    AlreadyMember(PlayerId, RoomNumber),

    #[error("player {0} not in room {1}")]
    NotMember(PlayerId, RoomNumber),

    /// Host-only action attempted by someone else.
    #[error("player {0} is not the host of room {1}")]
    NotHost(PlayerId, RoomNumber),

    /// The team table does not describe a playable game yet.
    #[error("room {0} is not ready to start")]
    NotReady(RoomNumber),
}
