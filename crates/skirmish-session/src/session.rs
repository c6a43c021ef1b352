//! The per-connection session record.
//!
//! A session is the lobby's view of one live connection:
//! - WHO it is (`player_id`, and `username` once authenticated)
//! - WHETHER it passed the version gate
//! - WHERE it is (the room it currently belongs to, if any)
//! - HOW to reach it (`handle`, the outbound half of the connection)

use std::fmt;
use std::net::SocketAddr;

use skirmish_protocol::{PlayerId, RoomNumber};

/// A single connection's session.
///
/// Generic over the delivery handle so the lobby logic can be exercised
/// without real sockets; the server uses an `Arc` of the transport
/// connection.
#[derive(Debug, Clone)]
pub struct Session<H> {
    pub player_id: PlayerId,

    /// Used to deliver responses and notifications to this player.
    pub handle: H,

    pub authenticated: bool,

    /// Display name bound at authentication; empty before that.
    pub username: String,

    /// The room this player is a member of. Must always agree with that
    /// room's member set.
    pub room: Option<RoomNumber>,

    /// Remote address, for log lines.
    pub address: Option<SocketAddr>,
}

impl<H> Session<H> {
    /// A fresh, unauthenticated session that belongs to no room.
    pub fn new(player_id: PlayerId, handle: H) -> Self {
        Self {
            player_id,
            handle,
            authenticated: false,
            username: String::new(),
            room: None,
            address: None,
        }
    }

    /// Sets the remote address reported by the transport.
    pub fn with_address(mut self, address: Option<SocketAddr>) -> Self {
        self.address = address;
        self
    }

    /// Marks the session authenticated under `username`.
    pub fn authenticate(&mut self, username: impl Into<String>) {
        self.authenticated = true;
        self.username = username.into();
    }

    /// A `username@address` label for logs.
    pub fn label(&self) -> Label<'_> {
        Label {
            username: &self.username,
            address: self.address,
        }
    }
}

/// Display adapter returned by [`Session::label`].
pub struct Label<'a> {
    username: &'a str,
    address: Option<SocketAddr>,
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let username = if self.username.is_empty() {
            "anonymous"
        } else {
            self.username
        };
        match self.address {
            Some(addr) => write!(f, "{username}@{addr}"),
            None => write!(f, "{username}@unknown"),
        }
    }
}
