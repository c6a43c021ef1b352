//! Error types for the session layer.

use skirmish_protocol::PlayerId;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The presented verification string did not match the server's.
    /// The client and server were built from different game content or
    /// speak different protocol versions.
    #[error("verification string mismatch for {username}")]
    VersionMismatch { username: String },

    /// A session for this connection is already registered.
    #[error("player {0} already has a session")]
    AlreadyConnected(PlayerId),
}
