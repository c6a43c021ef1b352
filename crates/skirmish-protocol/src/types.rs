//! Identity, allocation, and snapshot types that travel on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};
use skirmish_transport::ConnectionId;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// A player is a live connection, so the id is the connection id and is
/// stable for exactly as long as the connection is. Serializes as a plain
/// integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

/// A unique identifier for a room, derived from its creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomNumber(pub u64);

impl fmt::Display for RoomNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Which members of a room a notification is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every current member.
    All,
    /// Every current member except the actor who caused the event.
    AllExcept(PlayerId),
}

impl Recipient {
    /// Returns `true` if `player` is in this recipient set.
    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::AllExcept(excluded) => *excluded != player,
        }
    }
}

// ---------------------------------------------------------------------------
// Team allocation
// ---------------------------------------------------------------------------

/// Number of team slots in every room, regardless of capacity.
pub const TEAM_SLOTS: usize = 4;

/// Who controls a team slot. Integer-coded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayerType {
    /// The slot is unused.
    #[default]
    None = 0,
    /// Played on the machine that owns the slot.
    Local = 1,
    /// Played by another connected client.
    Remote = 2,
    /// Played by the AI.
    Robot = 3,
}

impl PlayerType {
    /// Returns `true` if the slot takes part in the game.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl TryFrom<u8> for PlayerType {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Local),
            2 => Ok(Self::Remote),
            3 => Ok(Self::Robot),
            code => Err(ProtocolError::UnknownCode {
                what: "player type",
                code,
            }),
        }
    }
}

impl From<PlayerType> for u8 {
    fn from(value: PlayerType) -> Self {
        value as u8
    }
}

/// One of the four team slots of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeamSlot {
    pub player_type: PlayerType,
    /// Alliance id; slots sharing an alliance fight on the same side.
    pub alliance: i32,
    /// Gold allocated to the slot at game start.
    pub allocation: i32,
}

/// The fixed four-slot team table of a room.
///
/// On the wire the table is three parallel arrays (`types`, `alliance`,
/// `allocation`), each of exactly [`TEAM_SLOTS`] entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "TeamArrays", into = "TeamArrays")]
pub struct TeamTable(pub [TeamSlot; TEAM_SLOTS]);

impl TeamTable {
    /// Iterates over the slots that take part in the game.
    pub fn active(&self) -> impl Iterator<Item = &TeamSlot> {
        self.0.iter().filter(|slot| slot.player_type.is_active())
    }
}

#[derive(Serialize, Deserialize)]
struct TeamArrays {
    types: [PlayerType; TEAM_SLOTS],
    alliance: [i32; TEAM_SLOTS],
    allocation: [i32; TEAM_SLOTS],
}

impl From<TeamArrays> for TeamTable {
    fn from(arrays: TeamArrays) -> Self {
        Self(std::array::from_fn(|i| TeamSlot {
            player_type: arrays.types[i],
            alliance: arrays.alliance[i],
            allocation: arrays.allocation[i],
        }))
    }
}

impl From<TeamTable> for TeamArrays {
    fn from(table: TeamTable) -> Self {
        Self {
            types: table.0.map(|slot| slot.player_type),
            alliance: table.0.map(|slot| slot.alliance),
            allocation: table.0.map(|slot| slot.allocation),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Read-only view of a room member, built on demand for a [`RoomSetting`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub username: String,
    pub is_host: bool,
}

/// One row of the room list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_number: RoomNumber,
    pub room_name: String,
    pub map_name: String,
    pub capacity: usize,
    pub remaining: usize,
    pub player_count: usize,
    pub started: bool,
    pub host: Option<PlayerId>,
}

/// Full room state sent to a member on create and join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSetting {
    pub room_number: RoomNumber,
    pub room_name: String,
    pub map_name: String,
    pub capacity: usize,
    pub started: bool,
    pub host: Option<PlayerId>,
    pub teams: TeamTable,
    pub start_gold: i32,
    pub max_population: i32,
    pub players: Vec<PlayerSnapshot>,
    /// The saved game the room was created from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<serde_json::Value>,
}
