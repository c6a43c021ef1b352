//! Wire protocol for the Skirmish lobby.
//!
//! This crate defines what clients and the lobby say to each other:
//!
//! - **Envelope** ([`Envelope`], [`Kind`], [`Operation`]): the flat JSON
//!   frame with its integer-coded kind and operation.
//! - **Payloads** ([`Request`], [`ClientNotification`], [`Reply`],
//!   [`ServerNotification`]): typed views of the operation-specific fields.
//! - **Projections** ([`RoomSetting`], [`RoomSnapshot`], [`PlayerSnapshot`],
//!   [`TeamTable`]): read-only room state sent to clients.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, envelopes out.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope → Inbound) → Dispatcher
//! ```
//!
//! The crate knows nothing about sessions or rooms as live objects; it only
//! describes their wire shape.

mod codec;
mod envelope;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use envelope::{
    AuthenticateRequest, ClientNotification, CreateRoomFromSaveRequest,
    CreateRoomRequest, Envelope, GameEventNotification, Inbound,
    JoinRoomRequest, Kind, MessageNotification, Operation, Reply, Request,
    ServerNotification,
};
pub use error::ProtocolError;
pub use types::{
    PlayerId, PlayerSnapshot, PlayerType, Recipient, RoomNumber,
    RoomSetting, RoomSnapshot, TEAM_SLOTS, TeamSlot, TeamTable,
};

/// Version of the lobby protocol, mixed into the verification string.
pub const PROTOCOL_VERSION: u32 = 1;
