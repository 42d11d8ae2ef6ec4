//! Error types for the Lounge client.

use thiserror::Error;

use crate::close_codes::CloseCode;
use crate::protocol::RoomKind;

/// The authentication collaborator could not produce an identity token.
///
/// Kept as its own type (rather than a `LoungeError` variant alone) because
/// the room-transition path treats a missing identity as a silent no-op
/// while the session path treats it as a hard failure.
#[derive(Debug, Clone, Error)]
#[error("no authenticated identity: {0}")]
pub struct AuthError(pub String);

/// Errors that can occur when using the Lounge client.
#[derive(Debug, Error)]
pub enum LoungeError {
    /// No authenticated identity exists.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Reconnection with a persisted credential failed.
    ///
    /// Always recovered locally: the credential is discarded and the session
    /// falls back to a fresh join. Never surfaced to the user.
    #[error("reconnection failed: {0}")]
    Reconnection(String),

    /// Joining a room failed.
    ///
    /// Carries the server close code when the failure came with one, so the
    /// transition path can translate recognized codes into user-facing text.
    #[error("join failed: {message}")]
    Join {
        /// Server close code accompanying the failure, if any.
        code: Option<u16>,
        /// Human-readable failure description.
        message: String,
    },

    /// The server handed back a room of the wrong kind.
    ///
    /// Raised during transition validation when the target room's declared
    /// kind is not `preparation` (e.g. the room id went stale and now points
    /// at a game room).
    #[error("expected a preparation room, got {actual:?}")]
    UnexpectedRoomKind {
        /// The kind the joined room actually declared.
        actual: RoomKind,
    },

    /// Leaving a room failed.
    ///
    /// Leaves are best-effort; this error is logged and never aborts the
    /// surrounding flow.
    #[error("leave failed: {0}")]
    Leave(String),

    /// The credential store failed.
    #[error("credential storage error: {0}")]
    Storage(String),

    /// Attempted an operation that requires an active connection.
    #[error("not connected to the lobby")]
    NotConnected,

    /// Failed to serialize or deserialize a protocol payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LoungeError {
    /// Returns the recognized [`CloseCode`] carried by this error, if any.
    ///
    /// Only [`LoungeError::Join`] failures carry close codes, and only codes
    /// inside the closed enumeration are recognized — everything else yields
    /// `None` and produces no user-facing message.
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Join {
                code: Some(code), ..
            } => CloseCode::from_code(*code),
            _ => None,
        }
    }
}

/// A specialized [`Result`] type for Lounge client operations.
pub type Result<T> = std::result::Result<T, LoungeError>;

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn join_error_recovers_recognized_close_code() {
        let err = LoungeError::Join {
            code: Some(CloseCode::AccountBanned.code()),
            message: "kicked".into(),
        };
        assert_eq!(err.close_code(), Some(CloseCode::AccountBanned));
    }

    #[test]
    fn join_error_with_unknown_code_yields_none() {
        let err = LoungeError::Join {
            code: Some(1006),
            message: "abnormal".into(),
        };
        assert!(err.close_code().is_none());
    }

    #[test]
    fn non_join_errors_carry_no_close_code() {
        let err = LoungeError::NotConnected;
        assert!(err.close_code().is_none());
    }
}
