//! Player sessions for the Skirmish lobby.
//!
//! This crate handles the connection-side half of the lobby state:
//!
//! 1. **Authentication**: the version-compatibility gate ([`Authenticator`],
//!    [`VersionGate`])
//! 2. **Session tracking**: one [`Session`] per live connection, held in a
//!    [`SessionRegistry`]
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby (above)  ← joins sessions to rooms under one lock
//!     ↕
//! Session Layer (this crate)  ← identity, auth flag, current room
//!     ↕
//! Protocol Layer (below)  ← PlayerId, RoomNumber
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod registry;
mod session;

pub use auth::{Authenticator, VersionGate, verification_string};
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{Label, Session};
