#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Client-level integration tests: message-handler wiring and state
//! projection through a live lobby connection.

mod common;

use std::time::Duration;

use common::{profile, room_summary, Harness};
use lounge_client::protocol::{
    ChatMessage, RoomEvent, RoomKind, ServerMessage, SyncEvent, TournamentPlayer,
    TournamentSnapshot,
};

/// Connect a client and hand back the live lobby room for event injection.
async fn connected(harness: &Harness) -> (lounge_client::LoungeClient, std::sync::Arc<common::MockRoom>) {
    let (room, session) = harness.room("lobby1", RoomKind::Lounge, "tok");
    harness.connector.script_lobby_join(Ok(session));
    let client = harness.client();
    client.connect().await.unwrap();
    (client, room)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn room_listing_and_announcements_reach_the_sink() {
    let harness = Harness::new();
    let (_client, room) = connected(&harness).await;

    room.push(RoomEvent::Message(ServerMessage::Rooms {
        rooms: vec![
            room_summary("prep1", RoomKind::Preparation),
            room_summary("game1", RoomKind::Game),
        ],
    }))
    .await;
    // Announcements repeat as counts change; they land as upserts.
    room.push(RoomEvent::Message(ServerMessage::AddRoom {
        room: room_summary("prep1", RoomKind::Preparation),
    }))
    .await;
    // A lounge announcement is not actionable and is dropped.
    room.push(RoomEvent::Message(ServerMessage::AddRoom {
        room: room_summary("lounge2", RoomKind::Lounge),
    }))
    .await;
    room.push(RoomEvent::Message(ServerMessage::RemoveRoom {
        room_id: "game1".into(),
    }))
    .await;
    settle().await;

    assert!(harness.journal.contains("sink:room+:prep1"));
    assert!(harness.journal.contains("sink:room+:game1"));
    assert!(harness.journal.contains("sink:room~:prep1"));
    assert!(!harness.journal.contains("sink:room~:lounge2"));
    assert!(!harness.journal.contains("sink:room+:lounge2"));
    assert!(harness.journal.contains("sink:room-:game1"));
}

#[tokio::test]
async fn profile_and_payload_messages_reach_the_sink() {
    let harness = Harness::new();
    let (_client, room) = connected(&harness).await;

    room.push(RoomEvent::Message(ServerMessage::UserProfile {
        profile: profile("me"),
    }))
    .await;
    room.push(RoomEvent::Message(ServerMessage::User {
        profile: profile("rival"),
    }))
    .await;
    room.push(RoomEvent::Message(ServerMessage::ReconnectPrompt {
        pending_game_id: "game77".into(),
    }))
    .await;
    room.push(RoomEvent::Message(ServerMessage::BoosterContent {
        content: serde_json::json!({ "cards": ["c1", "c2"] }),
    }))
    .await;
    room.push(RoomEvent::Message(ServerMessage::Suggestions {
        users: vec![profile("s1"), profile("s2")],
    }))
    .await;
    settle().await;

    assert!(harness.journal.contains("sink:profile:me"));
    assert!(harness.journal.contains("sink:searched:rival"));
    assert!(harness.journal.contains("sink:pending:game77"));
    assert!(harness.journal.contains("sink:booster"));
    assert!(harness.journal.contains("sink:suggestions:2"));
}

#[tokio::test]
async fn banned_message_is_shown_to_the_user() {
    let harness = Harness::new();
    let (_client, room) = connected(&harness).await;

    room.push(RoomEvent::Message(ServerMessage::Banned {
        reason: "abusive chat".into(),
    }))
    .await;
    settle().await;

    assert_eq!(harness.notifier.noticed(), ["abusive chat"]);
}

#[tokio::test]
async fn sync_events_are_projected_in_order() {
    let harness = Harness::new();
    let (_client, room) = connected(&harness).await;

    room.push(RoomEvent::Sync(SyncEvent::CcuChanged { count: 412 }))
        .await;
    room.push(RoomEvent::Sync(SyncEvent::TournamentAdded {
        tournament: TournamentSnapshot {
            id: "t1".into(),
            name: "Friday Cup".into(),
            start_date: "2026-08-07T18:00:00Z".into(),
            players: vec![TournamentPlayer {
                user_id: "u1".into(),
                eliminated: false,
            }],
            brackets: vec![],
        },
    }))
    .await;
    let msg_id = uuid::Uuid::from_u128(3);
    room.push(RoomEvent::Sync(SyncEvent::MessageAdded {
        message: ChatMessage {
            id: msg_id,
            author: "u1".into(),
            text: "anyone up for a match?".into(),
            sent_at: "2026-08-07T18:01:00Z".into(),
        },
    }))
    .await;
    settle().await;

    let ccu = harness.journal.position("sink:ccu:412").expect("ccu update");
    let tournament = harness.journal.position("sink:t+:t1").expect("tournament add");
    let player = harness.journal.position("sink:p+:t1:u1").expect("player add");
    let message = harness
        .journal
        .position(&format!("sink:msg+:{msg_id}"))
        .expect("message add");
    assert!(ccu < tournament && tournament < player && player < message);
}

#[tokio::test]
async fn events_after_teardown_are_not_forwarded() {
    let harness = Harness::new();
    let (client, room) = connected(&harness).await;

    room.push(RoomEvent::Sync(SyncEvent::CcuChanged { count: 1 }))
        .await;
    settle().await;

    client.disconnect().await;
    settle().await;

    // The stream ended with the leave; nothing more can arrive, and the
    // mirror was detached before teardown finished.
    let entries = harness.journal.entries();
    assert!(entries.contains(&"sink:ccu:1".to_string()));
    assert!(entries.contains(&"leave:lobby1".to_string()));
    assert!(!client.session().is_initialized());
}
