//! Unified error type for the Skirmish server.

use skirmish_protocol::ProtocolError;
use skirmish_session::SessionError;
use skirmish_tasks::TaskError;
use skirmish_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SkirmishError {
    /// Accept, handshake, send, or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The task pool refused work.
    #[error(transparent)]
    Task(#[from] TaskError),
}

#[cfg(test)]
mod tests {
    use skirmish_protocol::PlayerId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "gone",
        ));
        let skirmish_err: SkirmishError = err.into();
        assert!(matches!(skirmish_err, SkirmishError::Transport(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::MissingField("request_id");
        let skirmish_err: SkirmishError = err.into();
        assert!(matches!(skirmish_err, SkirmishError::Protocol(_)));
        assert!(skirmish_err.to_string().contains("request_id"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AlreadyConnected(PlayerId(3));
        let skirmish_err: SkirmishError = err.into();
        assert!(matches!(skirmish_err, SkirmishError::Session(_)));
        assert_eq!(skirmish_err.to_string(), "player P-3 already has a session");
    }

    #[test]
    fn test_from_task_error() {
        let skirmish_err: SkirmishError = TaskError::Closed.into();
        assert_eq!(skirmish_err.to_string(), "task scheduler is closed");
    }
}
