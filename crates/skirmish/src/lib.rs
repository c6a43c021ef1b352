//! # Skirmish
//!
//! Lobby server for turn-based strategy games.
//!
//! Clients connect over WebSocket, authenticate with a verification string
//! derived from the game content, and then list, create, and join rooms.
//! Inside a room the host edits the team table and starts the game; every
//! membership change is announced to the other members.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skirmish::prelude::*;
//!
//! # async fn serve() -> Result<(), SkirmishError> {
//! let server = SkirmishServer::builder()
//!     .bind("0.0.0.0:5438")
//!     .content_fingerprint("units-v3:tiles-v7")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod dispatcher;
mod error;
mod handler;
mod lobby;
mod notifier;
mod server;

pub use error::SkirmishError;
pub use lobby::{Handled, Lobby};
pub use notifier::{Broadcast, plan};
pub use server::{ServerConfig, SkirmishServer, SkirmishServerBuilder};

/// Convenience re-exports for server setup.
pub mod prelude {
    pub use crate::{ServerConfig, SkirmishError, SkirmishServer, SkirmishServerBuilder};
    pub use skirmish_protocol::{
        Kind, Operation, PROTOCOL_VERSION, PlayerId, PlayerType, RoomNumber, TeamSlot, TeamTable,
    };
    pub use skirmish_session::{Authenticator, SessionError, VersionGate, verification_string};
}
