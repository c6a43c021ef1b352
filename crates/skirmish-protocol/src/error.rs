//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` always means a frame could not be turned into (or out
//! of) a well-formed envelope; the dispatcher logs it and drops the frame.

use crate::{Kind, Operation};

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// or fields of the wrong type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// An integer enum on the wire carried a value we don't know.
    #[error("unknown {what} code {code}")]
    UnknownCode { what: &'static str, code: u8 },

    /// A field required by the envelope kind is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// The operation code is not valid for the envelope kind
    /// (e.g. GAME_START sent as a client notification).
    #[error("operation {operation:?} not accepted in a {kind:?} frame")]
    UnexpectedOperation { kind: Kind, operation: Operation },

    /// The message is invalid at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
