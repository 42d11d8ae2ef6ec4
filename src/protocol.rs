//! Protocol types for the Lounge lobby protocol.
//!
//! Every type in this module matches the JSON the Lounge server emits on its
//! point-to-point message channel and its state-synchronization stream. Key
//! conventions:
//!
//! - Tagged unions use `#[serde(tag = "type", content = "data")]`
//! - Timestamps travel as `String` (ISO 8601)
//! - Free-form payloads (booster content) stay `serde_json::Value`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Type aliases ────────────────────────────────────────────────────

/// Unique identifier for users. The server issues opaque string ids.
pub type UserId = String;

/// Unique identifier for rooms.
pub type RoomId = String;

// ── Enums ───────────────────────────────────────────────────────────

/// The declared kind of a server room.
///
/// Room-transition validation requires the target to declare
/// [`Preparation`](RoomKind::Preparation); the kind also gates which
/// `ADD_ROOM` announcements are forwarded to the sink.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    /// The shared lobby room every client sits in between matches.
    #[default]
    Lounge,
    /// A per-match preparation room (deck selection, ready checks).
    Preparation,
    /// A live game room.
    Game,
    /// Any kind this client version does not know about.
    #[serde(other)]
    Unknown,
}

/// Connection status of the logical lobby session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

// ── Structs ─────────────────────────────────────────────────────────

/// Summary of a server room as it appears in room listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub kind: RoomKind,
    pub client_count: u32,
    pub max_clients: u32,
}

/// A user profile as delivered by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    pub elo: u32,
}

/// One entry in the lobby chat message list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Server-issued message id.
    pub id: Uuid,
    pub author: UserId,
    pub text: String,
    /// ISO 8601 timestamp.
    pub sent_at: String,
}

/// A participant inside a tournament, keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentPlayer {
    pub user_id: UserId,
    pub eliminated: bool,
}

/// An elimination bracket inside a tournament.
///
/// `players_id` is one versioned value: the server replaces the whole
/// sequence on change, it is never diffed element-by-element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentBracket {
    pub bracket_id: String,
    pub name: String,
    pub finished: bool,
    pub players_id: Vec<UserId>,
}

/// A tournament's own fields, without its child collections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentSummary {
    pub id: String,
    pub name: String,
    /// ISO 8601 timestamp.
    pub start_date: String,
}

/// A full tournament snapshot as carried by an add event.
///
/// The projector walks this parent-first: the tournament itself, then
/// players, then brackets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentSnapshot {
    pub id: String,
    pub name: String,
    /// ISO 8601 timestamp.
    pub start_date: String,
    #[serde(default)]
    pub players: Vec<TournamentPlayer>,
    #[serde(default)]
    pub brackets: Vec<TournamentBracket>,
}

impl TournamentSnapshot {
    /// The tournament's own fields, for the sink's add operation.
    pub fn summary(&self) -> TournamentSummary {
        TournamentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            start_date: self.start_date.clone(),
        }
    }
}

// ── Field changes ───────────────────────────────────────────────────

/// A change to one of a tournament's own fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum TournamentChange {
    Name(String),
    StartDate(String),
}

/// A change to one of a bracket's fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum BracketChange {
    Name(String),
    Finished(bool),
    /// Wholesale replacement of the bracket's player ordering.
    PlayersId(Vec<UserId>),
}

// ── Synchronization events ──────────────────────────────────────────

/// One hierarchical mutation from the server's state-synchronization stream.
///
/// Events arrive strictly in server order; the
/// [`StateProjector`](crate::projector::StateProjector) consumes them one
/// at a time with no reordering or batching. Field-change events repeat
/// the full new value
/// even when it equals the previous one — at-least-once semantics, the
/// consumer tolerates redundant writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum SyncEvent {
    /// The lobby's concurrent-user count changed.
    CcuChanged { count: u32 },
    /// A chat message was appended to the lobby message list.
    MessageAdded { message: ChatMessage },
    /// A chat message's text was rewritten (moderation edit).
    MessageChanged { id: Uuid, text: String },
    /// A chat message was removed from the lobby message list.
    MessageRemoved { id: Uuid },
    /// A tournament appeared, with any children it already has.
    TournamentAdded { tournament: TournamentSnapshot },
    /// A tournament was removed; its whole subtree goes with it.
    TournamentRemoved { id: String },
    /// One of a tournament's own fields changed.
    TournamentChanged { id: String, change: TournamentChange },
    /// A player joined a tournament.
    PlayerAdded {
        tournament_id: String,
        player: TournamentPlayer,
    },
    /// A player left a tournament.
    PlayerRemoved {
        tournament_id: String,
        user_id: UserId,
    },
    /// A tournament player's elimination flag changed.
    PlayerChanged {
        tournament_id: String,
        user_id: UserId,
        eliminated: bool,
    },
    /// A bracket was created inside a tournament.
    BracketAdded {
        tournament_id: String,
        bracket: TournamentBracket,
    },
    /// A bracket was removed from a tournament.
    BracketRemoved {
        tournament_id: String,
        bracket_id: String,
    },
    /// One of a bracket's fields changed.
    BracketChanged {
        tournament_id: String,
        bracket_id: String,
        change: BracketChange,
    },
}

// ── Point-to-point messages ─────────────────────────────────────────

/// Tag of a point-to-point server message, used for handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTag {
    Banned,
    Rooms,
    RequestRoom,
    AddRoom,
    RemoveRoom,
    UserProfile,
    ReconnectPrompt,
    User,
    BoosterContent,
    Suggestions,
}

/// A tagged point-to-point message from the server.
///
/// Exactly one router handler is registered per tag; payload shape is
/// tag-dependent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// The account was banned; carries the human-readable reason.
    Banned { reason: String },
    /// Full listing of joinable rooms.
    Rooms { rooms: Vec<RoomSummary> },
    /// The server asks this client to move into the given room.
    RequestRoom { room_id: RoomId },
    /// A room was opened. Only preparation/game kinds are forwarded.
    AddRoom { room: RoomSummary },
    /// A room was closed.
    RemoveRoom { room_id: RoomId },
    /// The authenticated user's own profile.
    UserProfile { profile: Profile },
    /// A previous game is still pending; the client may rejoin it.
    ReconnectPrompt { pending_game_id: String },
    /// Result of a user search.
    User { profile: Profile },
    /// Booster pack contents, shape owned by the game layer.
    BoosterContent { content: serde_json::Value },
    /// Suggested opponents/friends.
    Suggestions { users: Vec<Profile> },
}

impl ServerMessage {
    /// The registration tag for this message.
    pub fn tag(&self) -> MessageTag {
        match self {
            Self::Banned { .. } => MessageTag::Banned,
            Self::Rooms { .. } => MessageTag::Rooms,
            Self::RequestRoom { .. } => MessageTag::RequestRoom,
            Self::AddRoom { .. } => MessageTag::AddRoom,
            Self::RemoveRoom { .. } => MessageTag::RemoveRoom,
            Self::UserProfile { .. } => MessageTag::UserProfile,
            Self::ReconnectPrompt { .. } => MessageTag::ReconnectPrompt,
            Self::User { .. } => MessageTag::User,
            Self::BoosterContent { .. } => MessageTag::BoosterContent,
            Self::Suggestions { .. } => MessageTag::Suggestions,
        }
    }
}

// ── Connection events ───────────────────────────────────────────────

/// Everything a live room connection delivers to the client core.
///
/// A consented leave ends the event stream without a `Closed` entry; a
/// server-initiated close delivers `Closed { code }` as the final event.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// A state-synchronization mutation.
    Sync(SyncEvent),
    /// A tagged point-to-point message.
    Message(ServerMessage),
    /// A non-fatal transport error; the connection stays up.
    Error { message: String },
    /// The server closed the connection with the given code.
    Closed { code: u16 },
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
    fn room_kind_tolerates_unknown_values() {
        let kind: RoomKind = serde_json::from_str("\"spectator\"").unwrap();
        assert_eq!(kind, RoomKind::Unknown);
    }

    #[test]
    fn server_message_tag_covers_every_variant() {
        let msg = ServerMessage::RequestRoom {
            room_id: "prep42".into(),
        };
        assert_eq!(msg.tag(), MessageTag::RequestRoom);

        let msg = ServerMessage::BoosterContent {
            content: serde_json::json!({ "cards": [1, 2, 3] }),
        };
        assert_eq!(msg.tag(), MessageTag::BoosterContent);
    }

    #[test]
    fn sync_event_uses_tagged_encoding() {
        let event = SyncEvent::CcuChanged { count: 512 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CcuChanged");
        assert_eq!(json["data"]["count"], 512);
    }

    #[test]
    fn snapshot_summary_strips_children() {
        let snapshot = TournamentSnapshot {
            id: "t1".into(),
            name: "Friday Cup".into(),
            start_date: "2026-08-07T18:00:00Z".into(),
            players: vec![TournamentPlayer {
                user_id: "u1".into(),
                eliminated: false,
            }],
            brackets: vec![],
        };
        let summary = snapshot.summary();
        assert_eq!(summary.id, "t1");
        assert_eq!(summary.name, "Friday Cup");
    }

    #[test]
    fn snapshot_children_default_to_empty() {
        let json = r#"{
            "id": "t9",
            "name": "Empty",
            "start_date": "2026-08-08T10:00:00Z"
        }"#;
        let snapshot: TournamentSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.players.is_empty());
        assert!(snapshot.brackets.is_empty());
    }
}
