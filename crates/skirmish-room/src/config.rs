//! Room creation parameters and the lifecycle state.

use serde_json::Value;

/// Largest capacity a room can be created with: one player per team slot.
pub const MAX_CAPACITY: usize = skirmish_protocol::TEAM_SLOTS;

// ---------------------------------------------------------------------------
// RoomOrigin
// ---------------------------------------------------------------------------

/// What the room's game is built from. Both payloads are opaque to the
/// lobby and only forwarded to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomOrigin {
    /// A fresh map.
    Map(Value),
    /// A previously saved game being resumed.
    SavedGame(Value),
}

impl RoomOrigin {
    /// The saved-game payload, if the room resumes one.
    pub fn saved_game(&self) -> Option<&Value> {
        match self {
            Self::SavedGame(game) => Some(game),
            Self::Map(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomParams
// ---------------------------------------------------------------------------

/// Everything the creator chooses for a new room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomParams {
    pub map_name: String,
    /// Maximum players, `1..=MAX_CAPACITY`.
    pub capacity: usize,
    pub start_gold: i32,
    pub max_population: i32,
    pub origin: RoomOrigin,
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Open ──(start)──→ Started
/// ```
///
/// `Started` is terminal: no joins, no second start. Disposal is not a
/// state; a disposed room is simply no longer in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomState {
    #[default]
    Open,
    Started,
}

impl RoomState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Started => write!(f, "Started"),
        }
    }
}
