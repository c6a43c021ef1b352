//! Rooms for the Skirmish lobby.
//!
//! A room is a game lobby: a handful of players, a four-slot team table,
//! a host, and an OPEN → STARTED lifecycle.
//!
//! # Key types
//!
//! - [`Room`]: the state machine with guarded transitions
//! - [`RoomRegistry`]: every live room, plus room-number allocation
//! - [`RoomParams`] / [`RoomOrigin`]: what a creator chooses
//! - [`RoomState`]: OPEN or STARTED
//! - [`RoomError`]: the refused guard, for an `approved:false` answer

mod config;
mod error;
mod registry;
mod room;

pub use config::{MAX_CAPACITY, RoomOrigin, RoomParams, RoomState};
pub use error::RoomError;
pub use registry::{RoomNumberGenerator, RoomRegistry};
pub use room::{LeaveOutcome, Room};
