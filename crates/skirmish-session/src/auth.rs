//! Authentication hook for the AUTHENTICATE request.
//!
//! The lobby has no accounts. A client proves only that it was built from
//! the same game content and speaks the same protocol version, by
//! presenting a verification string the server can recompute. That check
//! is [`VersionGate`]; anything else can be plugged in through the
//! [`Authenticator`] trait.

use sha2::{Digest, Sha256};
use skirmish_protocol::PROTOCOL_VERSION;

use crate::SessionError;

/// Decides whether a client may authenticate.
///
/// `Send + Sync + 'static` because one instance is shared by every worker
/// task for the lifetime of the server.
///
/// # Example
///
/// ```rust
/// use skirmish_session::{Authenticator, SessionError};
///
/// /// Lets everyone in. Only for local testing.
/// struct OpenDoor;
///
/// impl Authenticator for OpenDoor {
///     async fn authenticate(
///         &self,
///         _username: &str,
///         _v_string: &str,
///     ) -> Result<(), SessionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Checks the credentials of an AUTHENTICATE request.
    ///
    /// # Returns
    /// - `Ok(())`: the session may be marked authenticated
    /// - `Err(_)`: answer `approved:false` and leave the session as is
    fn authenticate(
        &self,
        username: &str,
        v_string: &str,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

/// Compares the presented verification string with one derived from the
/// loaded game content and [`PROTOCOL_VERSION`].
///
/// The expected string is the lowercase hex SHA-256 of
/// `"{content_fingerprint}:{PROTOCOL_VERSION}"`, computed once.
#[derive(Debug, Clone)]
pub struct VersionGate {
    expected: String,
}

impl VersionGate {
    pub fn new(content_fingerprint: &str) -> Self {
        Self {
            expected: verification_string(content_fingerprint),
        }
    }

    /// The string a compatible client must present.
    pub fn expected(&self) -> &str {
        &self.expected
    }
}

/// Derives the verification string for a content fingerprint.
pub fn verification_string(content_fingerprint: &str) -> String {
    let digest = Sha256::digest(format!("{content_fingerprint}:{PROTOCOL_VERSION}"));
    hex::encode(digest)
}

impl Authenticator for VersionGate {
    async fn authenticate(&self, username: &str, v_string: &str) -> Result<(), SessionError> {
        if v_string == self.expected {
            Ok(())
        } else {
            Err(SessionError::VersionMismatch {
                username: username.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_string_is_hex_sha256() {
        let v = verification_string("units:tiles");
        assert_eq!(v.len(), 64);
        assert!(v.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(v, verification_string("units:tiles"));
        assert_ne!(v, verification_string("units:tiles2"));
    }

    #[tokio::test]
    async fn test_version_gate_accepts_matching_string() {
        let gate = VersionGate::new("content-a");
        let presented = verification_string("content-a");
        assert!(gate.authenticate("alice", &presented).await.is_ok());
    }

    #[tokio::test]
    async fn test_version_gate_rejects_mismatch() {
        let gate = VersionGate::new("content-a");
        let presented = verification_string("content-b");
        let err = gate.authenticate("alice", &presented).await.unwrap_err();
        assert!(matches!(err, SessionError::VersionMismatch { ref username } if username == "alice"));
    }
}
