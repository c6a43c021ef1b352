use std::io;

/// A socket-level failure. Each variant keeps the underlying I/O error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener, or taking a socket off it.
    #[error("could not accept connection: {0}")]
    AcceptFailed(#[source] io::Error),

    /// The peer sent a bad upgrade request, or none before the timeout.
    #[error("websocket handshake failed: {0}")]
    HandshakeFailed(#[source] io::Error),

    #[error("could not send frame: {0}")]
    SendFailed(#[source] io::Error),

    #[error("could not receive frame: {0}")]
    ReceiveFailed(#[source] io::Error),
}

impl TransportError {
    /// Whether a single peer failed, as opposed to the listener.
    pub fn is_peer_gone(&self) -> bool {
        matches!(
            self,
            Self::HandshakeFailed(_) | Self::SendFailed(_) | Self::ReceiveFailed(_)
        )
    }
}
