//! Close codes for classifying server-initiated disconnects.
//!
//! The Lounge server closes a room connection with a numeric application
//! close code. The codes that have a user-facing translation form a closed
//! enumeration; any code outside it produces no user-facing message and is
//! treated as a transient disconnect.

use std::fmt;

/// Recognized application close codes sent by the Lounge server.
///
/// Use [`from_code()`](CloseCode::from_code) to map a raw wire code into the
/// enumeration and [`user_message()`](CloseCode::user_message) for the text
/// shown to the player. Codes that imply the identity itself is no longer
/// valid answer `true` from
/// [`invalidates_identity()`](CloseCode::invalidates_identity) and force
/// navigation back to the entry page when received on the lobby view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    /// The account has been marked inactive.
    AccountInactive,
    /// The account is banned.
    AccountBanned,
    /// The account was deleted.
    AccountDeleted,
    /// The connection was never authenticated, or the identity expired.
    NotAuthenticated,
    /// The target room reached its seat limit before the join completed.
    RoomFull,
    /// The target room was disposed between listing and join.
    RoomDisposed,
    /// Another connection already occupies this player's seat.
    SeatTaken,
}

impl CloseCode {
    /// Maps a raw wire close code into the enumeration.
    ///
    /// Returns `None` for anything outside the closed set — those codes are
    /// transient by definition and never reach the user.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            4401 => Some(Self::AccountInactive),
            4402 => Some(Self::AccountBanned),
            4403 => Some(Self::AccountDeleted),
            4404 => Some(Self::NotAuthenticated),
            4410 => Some(Self::RoomFull),
            4411 => Some(Self::RoomDisposed),
            4412 => Some(Self::SeatTaken),
            _ => None,
        }
    }

    /// The raw wire value of this close code.
    pub fn code(self) -> u16 {
        match self {
            Self::AccountInactive => 4401,
            Self::AccountBanned => 4402,
            Self::AccountDeleted => 4403,
            Self::NotAuthenticated => 4404,
            Self::RoomFull => 4410,
            Self::RoomDisposed => 4411,
            Self::SeatTaken => 4412,
        }
    }

    /// Whether this code means the identity itself is no longer valid.
    ///
    /// These are the only codes that trigger forced navigation to the entry
    /// page; everything else (network blip, server restart) is logged only.
    pub fn invalidates_identity(self) -> bool {
        matches!(
            self,
            Self::AccountInactive
                | Self::AccountBanned
                | Self::AccountDeleted
                | Self::NotAuthenticated
        )
    }

    /// Returns the user-facing message for this close code.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::AccountInactive => {
                "Your account is inactive. Please sign in again to continue."
            }
            Self::AccountBanned => {
                "Your account has been banned. Contact support if you believe this is a mistake."
            }
            Self::AccountDeleted => {
                "This account no longer exists. Create a new account to keep playing."
            }
            Self::NotAuthenticated => {
                "Your session has expired. Please sign in again."
            }
            Self::RoomFull => {
                "That room is already full. Try another one."
            }
            Self::RoomDisposed => {
                "That room has closed. Pick a different room from the list."
            }
            Self::SeatTaken => {
                "You are already connected from another session."
            }
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

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
    fn round_trips_every_recognized_code() {
        let all = [
            CloseCode::AccountInactive,
            CloseCode::AccountBanned,
            CloseCode::AccountDeleted,
            CloseCode::NotAuthenticated,
            CloseCode::RoomFull,
            CloseCode::RoomDisposed,
            CloseCode::SeatTaken,
        ];
        for code in all {
            assert_eq!(CloseCode::from_code(code.code()), Some(code));
        }
    }

    #[test]
    fn unknown_codes_are_not_recognized() {
        assert!(CloseCode::from_code(1000).is_none());
        assert!(CloseCode::from_code(1006).is_none());
        assert!(CloseCode::from_code(4999).is_none());
    }

    #[test]
    fn only_identity_codes_invalidate_identity() {
        assert!(CloseCode::AccountInactive.invalidates_identity());
        assert!(CloseCode::AccountBanned.invalidates_identity());
        assert!(CloseCode::AccountDeleted.invalidates_identity());
        assert!(CloseCode::NotAuthenticated.invalidates_identity());
        assert!(!CloseCode::RoomFull.invalidates_identity());
        assert!(!CloseCode::RoomDisposed.invalidates_identity());
        assert!(!CloseCode::SeatTaken.invalidates_identity());
    }

    #[test]
    fn display_uses_the_user_message() {
        let text = format!("{}", CloseCode::AccountBanned);
        assert_eq!(text, CloseCode::AccountBanned.user_message());
    }
}
