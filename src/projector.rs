//! Incremental state projection from synchronization events.
//!
//! [`StateProjector`] consumes the hierarchical mutation stream of a live
//! lobby connection ([`SyncEvent`]) one event at a time, in arrival order,
//! and maintains a local mirror of the server-authoritative entity tree.
//! For every server-side mutation it emits exactly one normalized update to
//! the external [`StateSink`].
//!
//! The mirror is the guard that keeps the sink consistent under
//! at-least-once delivery:
//!
//! - an add for an id already present is ignored (no second add reaches the
//!   sink, the mirror is not corrupted);
//! - a remove or field change for an absent entity is a no-op — removal
//!   tombstones a whole subtree, and nothing is forwarded for it afterwards;
//! - field changes for present entities are forwarded on every event, even
//!   redundant writes of an unchanged value (the sink tolerates repeats).
//!
//! Children are strictly scoped to their parent: a player or bracket can
//! only be created under a tournament that exists in the mirror, and
//! removing the tournament drops the subtree in one step.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};
use uuid::Uuid;

use crate::protocol::{SyncEvent, TournamentBracket, TournamentPlayer, TournamentSnapshot};
use crate::sink::StateSink;

/// Mirror entry for one tournament: membership sets for its children.
///
/// Child collections are owned and indexed by stable id — never by
/// reference identity — so duplicate and out-of-order events resolve by
/// lookup, not by pointer comparison.
#[derive(Debug, Default)]
struct TournamentNode {
    players: HashSet<String>,
    brackets: HashSet<String>,
}

/// Projects the synchronization stream into sink updates.
///
/// One projector exists per lobby connection; the event pump owns it and
/// drops it when the connection closes, so nothing can fire after teardown.
pub struct StateProjector {
    sink: Arc<dyn StateSink>,
    tournaments: HashMap<String, TournamentNode>,
    messages: HashSet<Uuid>,
}

impl StateProjector {
    pub fn new(sink: Arc<dyn StateSink>) -> Self {
        Self {
            sink,
            tournaments: HashMap::new(),
            messages: HashSet::new(),
        }
    }

    /// Apply one synchronization event.
    ///
    /// Events must be fed in transport arrival order; the projector never
    /// reorders or batches.
    pub fn apply(&mut self, event: SyncEvent) {
        trace!(?event, "applying sync event");
        match event {
            SyncEvent::CcuChanged { count } => self.sink.set_ccu_count(count),

            SyncEvent::MessageAdded { message } => {
                if self.messages.insert(message.id) {
                    self.sink.add_message(message);
                } else {
                    debug!(id = %message.id, "duplicate message add ignored");
                }
            }
            SyncEvent::MessageChanged { id, text } => {
                if self.messages.contains(&id) {
                    self.sink.update_message(id, text);
                }
            }
            SyncEvent::MessageRemoved { id } => {
                if self.messages.remove(&id) {
                    self.sink.remove_message(id);
                }
            }

            SyncEvent::TournamentAdded { tournament } => self.add_tournament(tournament),
            SyncEvent::TournamentRemoved { id } => {
                if self.tournaments.remove(&id).is_some() {
                    self.sink.remove_tournament(&id);
                } else {
                    debug!(%id, "remove for unknown tournament ignored");
                }
            }
            SyncEvent::TournamentChanged { id, change } => {
                // Forwarded on every event for present entities, including
                // redundant writes — no value-equality dedup.
                if self.tournaments.contains_key(&id) {
                    self.sink.update_tournament(&id, change);
                }
            }

            SyncEvent::PlayerAdded {
                tournament_id,
                player,
            } => self.add_player(&tournament_id, player),
            SyncEvent::PlayerRemoved {
                tournament_id,
                user_id,
            } => {
                if let Some(node) = self.tournaments.get_mut(&tournament_id) {
                    if node.players.remove(&user_id) {
                        self.sink.remove_tournament_player(&tournament_id, &user_id);
                    }
                }
            }
            SyncEvent::PlayerChanged {
                tournament_id,
                user_id,
                eliminated,
            } => {
                let present = self
                    .tournaments
                    .get(&tournament_id)
                    .is_some_and(|node| node.players.contains(&user_id));
                if present {
                    self.sink
                        .update_tournament_player(&tournament_id, &user_id, eliminated);
                }
            }

            SyncEvent::BracketAdded {
                tournament_id,
                bracket,
            } => self.add_bracket(&tournament_id, bracket),
            SyncEvent::BracketRemoved {
                tournament_id,
                bracket_id,
            } => {
                if let Some(node) = self.tournaments.get_mut(&tournament_id) {
                    if node.brackets.remove(&bracket_id) {
                        self.sink.remove_bracket(&tournament_id, &bracket_id);
                    }
                }
            }
            SyncEvent::BracketChanged {
                tournament_id,
                bracket_id,
                change,
            } => {
                let present = self
                    .tournaments
                    .get(&tournament_id)
                    .is_some_and(|node| node.brackets.contains(&bracket_id));
                if present {
                    self.sink.update_bracket(&tournament_id, &bracket_id, change);
                }
            }
        }
    }

    /// Clear the mirror so no further event is forwarded.
    ///
    /// Called on connection teardown; the sink's own reset is driven
    /// separately by the transition/reset flows.
    pub fn detach(&mut self) {
        self.tournaments.clear();
        self.messages.clear();
    }

    /// Tournament ids currently present in the mirror.
    pub fn tournament_ids(&self) -> Vec<&str> {
        self.tournaments.keys().map(String::as_str).collect()
    }

    // ── Tree growth ─────────────────────────────────────────────────

    /// Walk an added tournament snapshot parent-first: the tournament's own
    /// add (its fields travel with it), then players, then brackets.
    fn add_tournament(&mut self, snapshot: TournamentSnapshot) {
        if self.tournaments.contains_key(&snapshot.id) {
            debug!(id = %snapshot.id, "duplicate tournament add ignored");
            return;
        }
        let id = snapshot.id.clone();
        self.tournaments.insert(id.clone(), TournamentNode::default());
        self.sink.add_tournament(snapshot.summary());

        for player in snapshot.players {
            self.add_player(&id, player);
        }
        for bracket in snapshot.brackets {
            self.add_bracket(&id, bracket);
        }
    }

    fn add_player(&mut self, tournament_id: &str, player: TournamentPlayer) {
        let Some(node) = self.tournaments.get_mut(tournament_id) else {
            debug!(tournament_id, "player add for unknown tournament ignored");
            return;
        };
        if node.players.insert(player.user_id.clone()) {
            self.sink.add_tournament_player(tournament_id, player);
        } else {
            debug!(tournament_id, user_id = %player.user_id, "duplicate player add ignored");
        }
    }

    fn add_bracket(&mut self, tournament_id: &str, bracket: TournamentBracket) {
        let Some(node) = self.tournaments.get_mut(tournament_id) else {
            debug!(tournament_id, "bracket add for unknown tournament ignored");
            return;
        };
        if node.brackets.insert(bracket.bracket_id.clone()) {
            self.sink.add_bracket(tournament_id, bracket);
        } else {
            debug!(tournament_id, bracket_id = %bracket.bracket_id, "duplicate bracket add ignored");
        }
    }
}

impl std::fmt::Debug for StateProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateProjector")
            .field("tournaments", &self.tournaments.len())
            .field("messages", &self.messages.len())
            .finish()
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
    use crate::protocol::{BracketChange, ChatMessage, TournamentChange};
    use std::sync::Mutex as StdMutex;

    /// Records every sink call as a compact op string, in order.
    #[derive(Default)]
    struct OpLog {
        ops: StdMutex<Vec<String>>,
    }

    impl OpLog {
        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }

        fn push(&self, op: String) {
            self.ops.lock().unwrap().push(op);
        }
    }

    impl StateSink for OpLog {
        fn set_connection_status(&self, status: crate::protocol::ConnectionStatus) {
            self.push(format!("status:{status:?}"));
        }
        fn set_ccu_count(&self, count: u32) {
            self.push(format!("ccu:{count}"));
        }
        fn add_room(&self, room: crate::protocol::RoomSummary) {
            self.push(format!("room+:{}", room.room_id));
        }
        fn update_room(&self, room: crate::protocol::RoomSummary) {
            self.push(format!("room~:{}", room.room_id));
        }
        fn remove_room(&self, room_id: &str) {
            self.push(format!("room-:{room_id}"));
        }
        fn add_message(&self, message: ChatMessage) {
            self.push(format!("msg+:{}", message.id));
        }
        fn update_message(&self, id: Uuid, text: String) {
            self.push(format!("msg~:{id}:{text}"));
        }
        fn remove_message(&self, id: Uuid) {
            self.push(format!("msg-:{id}"));
        }
        fn add_tournament(&self, tournament: crate::protocol::TournamentSummary) {
            self.push(format!("t+:{}", tournament.id));
        }
        fn update_tournament(&self, id: &str, change: TournamentChange) {
            self.push(format!("t~:{id}:{change:?}"));
        }
        fn remove_tournament(&self, id: &str) {
            self.push(format!("t-:{id}"));
        }
        fn add_tournament_player(&self, tournament_id: &str, player: TournamentPlayer) {
            self.push(format!("p+:{tournament_id}:{}", player.user_id));
        }
        fn update_tournament_player(&self, tournament_id: &str, user_id: &str, eliminated: bool) {
            self.push(format!("p~:{tournament_id}:{user_id}:{eliminated}"));
        }
        fn remove_tournament_player(&self, tournament_id: &str, user_id: &str) {
            self.push(format!("p-:{tournament_id}:{user_id}"));
        }
        fn add_bracket(&self, tournament_id: &str, bracket: TournamentBracket) {
            self.push(format!("b+:{tournament_id}:{}", bracket.bracket_id));
        }
        fn update_bracket(&self, tournament_id: &str, bracket_id: &str, change: BracketChange) {
            self.push(format!("b~:{tournament_id}:{bracket_id}:{change:?}"));
        }
        fn remove_bracket(&self, tournament_id: &str, bracket_id: &str) {
            self.push(format!("b-:{tournament_id}:{bracket_id}"));
        }
        fn set_profile(&self, profile: crate::protocol::Profile) {
            self.push(format!("profile:{}", profile.user_id));
        }
        fn set_searched_user(&self, profile: crate::protocol::Profile) {
            self.push(format!("searched:{}", profile.user_id));
        }
        fn set_pending_game(&self, game_id: String) {
            self.push(format!("pending:{game_id}"));
        }
        fn set_booster_content(&self, _content: serde_json::Value) {
            self.push("booster".into());
        }
        fn set_suggestions(&self, users: Vec<crate::protocol::Profile>) {
            self.push(format!("suggestions:{}", users.len()));
        }
        fn reset_lobby(&self) {
            self.push("reset_lobby".into());
        }
        fn reset_preparation(&self) {
            self.push("reset_preparation".into());
        }
    }

    fn player(user_id: &str) -> TournamentPlayer {
        TournamentPlayer {
            user_id: user_id.into(),
            eliminated: false,
        }
    }

    fn bracket(bracket_id: &str) -> TournamentBracket {
        TournamentBracket {
            bracket_id: bracket_id.into(),
            name: "Quarterfinal".into(),
            finished: false,
            players_id: vec![],
        }
    }

    fn snapshot(id: &str) -> TournamentSnapshot {
        TournamentSnapshot {
            id: id.into(),
            name: "Friday Cup".into(),
            start_date: "2026-08-07T18:00:00Z".into(),
            players: vec![],
            brackets: vec![],
        }
    }

    fn projector() -> (StateProjector, Arc<OpLog>) {
        let log = Arc::new(OpLog::default());
        let projector = StateProjector::new(Arc::clone(&log) as Arc<dyn StateSink>);
        (projector, log)
    }

    #[test]
    fn snapshot_walk_emits_parent_then_players_then_brackets() {
        let (mut projector, log) = projector();
        let mut snap = snapshot("t1");
        snap.players = vec![player("u1"), player("u2")];
        snap.brackets = vec![bracket("b1")];

        projector.apply(SyncEvent::TournamentAdded { tournament: snap });

        assert_eq!(log.ops(), vec!["t+:t1", "p+:t1:u1", "p+:t1:u2", "b+:t1:b1"]);
    }

    #[test]
    fn duplicate_tournament_add_is_ignored() {
        let (mut projector, log) = projector();
        projector.apply(SyncEvent::TournamentAdded {
            tournament: snapshot("t1"),
        });
        projector.apply(SyncEvent::TournamentAdded {
            tournament: snapshot("t1"),
        });

        assert_eq!(log.ops(), vec!["t+:t1"]);
        assert_eq!(projector.tournament_ids(), vec!["t1"]);
    }

    #[test]
    fn change_for_absent_tournament_is_a_noop() {
        let (mut projector, log) = projector();
        projector.apply(SyncEvent::TournamentChanged {
            id: "ghost".into(),
            change: TournamentChange::Name("Ghost Cup".into()),
        });
        assert!(log.ops().is_empty());
        assert!(projector.tournament_ids().is_empty());
    }

    #[test]
    fn redundant_field_writes_are_forwarded() {
        let (mut projector, log) = projector();
        projector.apply(SyncEvent::TournamentAdded {
            tournament: snapshot("t1"),
        });
        for _ in 0..2 {
            projector.apply(SyncEvent::TournamentChanged {
                id: "t1".into(),
                change: TournamentChange::Name("Same Name".into()),
            });
        }
        // Both identical writes reach the sink — no value dedup.
        assert_eq!(log.ops().len(), 3);
    }

    #[test]
    fn removal_tombstones_the_whole_subtree() {
        let (mut projector, log) = projector();
        let mut snap = snapshot("t1");
        snap.players = vec![player("u1")];
        snap.brackets = vec![bracket("b1")];
        projector.apply(SyncEvent::TournamentAdded { tournament: snap });
        projector.apply(SyncEvent::TournamentRemoved { id: "t1".into() });

        // Late child events for the removed subtree must not come through.
        projector.apply(SyncEvent::PlayerChanged {
            tournament_id: "t1".into(),
            user_id: "u1".into(),
            eliminated: true,
        });
        projector.apply(SyncEvent::BracketChanged {
            tournament_id: "t1".into(),
            bracket_id: "b1".into(),
            change: BracketChange::Finished(true),
        });
        projector.apply(SyncEvent::PlayerAdded {
            tournament_id: "t1".into(),
            player: player("u2"),
        });

        assert_eq!(
            log.ops(),
            vec!["t+:t1", "p+:t1:u1", "b+:t1:b1", "t-:t1"]
        );
    }

    #[test]
    fn child_add_without_parent_is_a_noop() {
        let (mut projector, log) = projector();
        projector.apply(SyncEvent::PlayerAdded {
            tournament_id: "nope".into(),
            player: player("u1"),
        });
        projector.apply(SyncEvent::BracketAdded {
            tournament_id: "nope".into(),
            bracket: bracket("b1"),
        });
        assert!(log.ops().is_empty());
    }

    #[test]
    fn players_id_is_replaced_wholesale() {
        let (mut projector, log) = projector();
        let mut snap = snapshot("t1");
        snap.brackets = vec![bracket("b1")];
        projector.apply(SyncEvent::TournamentAdded { tournament: snap });

        projector.apply(SyncEvent::BracketChanged {
            tournament_id: "t1".into(),
            bracket_id: "b1".into(),
            change: BracketChange::PlayersId(vec!["u3".into(), "u1".into()]),
        });

        let ops = log.ops();
        assert_eq!(
            ops.last().unwrap(),
            "b~:t1:b1:PlayersId([\"u3\", \"u1\"])"
        );
    }

    #[test]
    fn mirror_matches_event_implied_set_under_interleaving() {
        let (mut projector, _log) = projector();
        projector.apply(SyncEvent::TournamentAdded {
            tournament: snapshot("t1"),
        });
        projector.apply(SyncEvent::TournamentChanged {
            id: "t1".into(),
            change: TournamentChange::StartDate("2026-08-08T00:00:00Z".into()),
        });
        projector.apply(SyncEvent::TournamentAdded {
            tournament: snapshot("t2"),
        });
        projector.apply(SyncEvent::TournamentRemoved { id: "t1".into() });
        projector.apply(SyncEvent::TournamentRemoved { id: "t1".into() });
        projector.apply(SyncEvent::TournamentChanged {
            id: "t1".into(),
            change: TournamentChange::Name("stale".into()),
        });

        assert_eq!(projector.tournament_ids(), vec!["t2"]);
    }

    #[test]
    fn duplicate_message_add_is_ignored() {
        let (mut projector, log) = projector();
        let id = Uuid::from_u128(7);
        let message = ChatMessage {
            id,
            author: "u1".into(),
            text: "gl hf".into(),
            sent_at: "2026-08-07T18:00:00Z".into(),
        };
        projector.apply(SyncEvent::MessageAdded {
            message: message.clone(),
        });
        projector.apply(SyncEvent::MessageAdded { message });
        projector.apply(SyncEvent::MessageRemoved { id });
        projector.apply(SyncEvent::MessageRemoved { id });

        assert_eq!(log.ops(), vec![format!("msg+:{id}"), format!("msg-:{id}")]);
    }

    #[test]
    fn message_edit_only_applies_while_present() {
        let (mut projector, log) = projector();
        let id = Uuid::from_u128(9);
        projector.apply(SyncEvent::MessageChanged {
            id,
            text: "too early".into(),
        });
        projector.apply(SyncEvent::MessageAdded {
            message: ChatMessage {
                id,
                author: "u1".into(),
                text: "original".into(),
                sent_at: "2026-08-07T18:00:00Z".into(),
            },
        });
        projector.apply(SyncEvent::MessageChanged {
            id,
            text: "[removed by moderator]".into(),
        });

        assert_eq!(
            log.ops(),
            vec![
                format!("msg+:{id}"),
                format!("msg~:{id}:[removed by moderator]"),
            ]
        );
    }

    #[test]
    fn detach_stops_all_forwarding() {
        let (mut projector, log) = projector();
        projector.apply(SyncEvent::TournamentAdded {
            tournament: snapshot("t1"),
        });
        projector.detach();
        projector.apply(SyncEvent::TournamentChanged {
            id: "t1".into(),
            change: TournamentChange::Name("late".into()),
        });
        assert_eq!(log.ops(), vec!["t+:t1"]);
    }
}
