//! The external state store receiving normalized updates from the core.
//!
//! The sink is a collaborator with a fixed set of fire-and-forget update
//! operations — synchronous from the caller's point of view, never awaited.
//! The projector and the message handlers both write into it; it must
//! tolerate repeat writes (the transport is at-least-once and field changes
//! are not deduplicated by value).

use uuid::Uuid;

use crate::protocol::{
    BracketChange, ChatMessage, ConnectionStatus, Profile, RoomSummary, TournamentBracket,
    TournamentChange, TournamentPlayer, TournamentSummary,
};

/// Fixed update-operation surface of the external state store.
///
/// Add operations are upsert-shaped; remove operations for absent entries
/// are no-ops. Per-tournament cleanup on removal is the sink's own
/// responsibility — the projector only guarantees it stops forwarding
/// events for removed subtrees.
pub trait StateSink: Send + Sync + 'static {
    // ── Session ─────────────────────────────────────────────────────
    fn set_connection_status(&self, status: ConnectionStatus);
    fn set_ccu_count(&self, count: u32);

    // ── Rooms ───────────────────────────────────────────────────────
    fn add_room(&self, room: RoomSummary);
    fn update_room(&self, room: RoomSummary);
    fn remove_room(&self, room_id: &str);

    // ── Lobby chat ──────────────────────────────────────────────────
    fn add_message(&self, message: ChatMessage);
    fn update_message(&self, id: Uuid, text: String);
    fn remove_message(&self, id: Uuid);

    // ── Tournament tree ─────────────────────────────────────────────
    fn add_tournament(&self, tournament: TournamentSummary);
    fn update_tournament(&self, id: &str, change: TournamentChange);
    fn remove_tournament(&self, id: &str);

    fn add_tournament_player(&self, tournament_id: &str, player: TournamentPlayer);
    fn update_tournament_player(&self, tournament_id: &str, user_id: &str, eliminated: bool);
    fn remove_tournament_player(&self, tournament_id: &str, user_id: &str);

    fn add_bracket(&self, tournament_id: &str, bracket: TournamentBracket);
    fn update_bracket(&self, tournament_id: &str, bracket_id: &str, change: BracketChange);
    fn remove_bracket(&self, tournament_id: &str, bracket_id: &str);

    // ── Point-to-point payloads ─────────────────────────────────────
    fn set_profile(&self, profile: Profile);
    fn set_searched_user(&self, profile: Profile);
    fn set_pending_game(&self, game_id: String);
    fn set_booster_content(&self, content: serde_json::Value);
    fn set_suggestions(&self, users: Vec<Profile>);

    // ── Scoped resets ───────────────────────────────────────────────
    fn reset_lobby(&self);
    fn reset_preparation(&self);
}
