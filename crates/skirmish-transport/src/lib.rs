//! Transport abstraction layer for the Skirmish lobby server.
//!
//! The lobby core only needs whole, ordered, reliable messages per
//! connection plus a signal when the peer goes away. [`Transport`] and
//! [`Connection`] capture exactly that; everything above this crate is
//! written against the traits.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket-over-TCP transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, WebSocketConnection, WebSocketHandshake, WebSocketTransport,
};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// Identifies one accepted connection.
///
/// Ids are handed out from a process-wide counter starting at 1 and are
/// never reused, so the lobby can use them as player ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener handing out peers.
///
/// `accept` only takes the socket off the listener. The protocol handshake
/// runs later through [`Handshake::complete`], on the peer's own task, so a
/// peer that connects and then goes quiet cannot hold up the listener.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;
    type Handshake: Handshake<Connection = Self::Connection, Error = Self::Error>;

    /// Resolves with the next raw peer. Cancel-safe.
    async fn accept(&mut self) -> Result<Self::Handshake, Self::Error>;
}

/// An accepted peer whose handshake has not run yet.
pub trait Handshake: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    /// Runs the handshake, failing if it does not finish within the
    /// transport's handshake timeout.
    fn complete(self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// One peer, exchanging whole frames.
///
/// `send` and `recv` may be called concurrently: the lobby delivers
/// notifications from worker tasks while the connection task is parked
/// in `recv`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Next frame from the peer; `Ok(None)` once the peer has closed.
    fn recv(&self) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn id(&self) -> ConnectionId;

    /// Remote address, when the transport knows it. Only used in logs.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}
