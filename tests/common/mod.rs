#![allow(dead_code)]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for Lounge Client integration tests.
//!
//! Provides scripted mock collaborators (`MockConnector`, `MockRoom`, an
//! in-memory credential store) and recording sinks that all append to one
//! shared [`Journal`], so tests can assert cross-collaborator ordering.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use lounge_client::client::{LoungeClient, LoungeConfig, LoungeDeps};
use lounge_client::credentials::{CredentialStore, ReconnectionCredential};
use lounge_client::error::{AuthError, LoungeError, Result};
use lounge_client::protocol::{
    BracketChange, ChatMessage, ConnectionStatus, Profile, RoomEvent, RoomKind, RoomSummary,
    TournamentBracket, TournamentChange, TournamentPlayer, TournamentSummary,
};
use lounge_client::room::{RoomConnector, RoomHandle, RoomSession};
use lounge_client::services::{AuthProvider, IdentityToken, Navigator, Notifier};
use lounge_client::sink::StateSink;

// ── Journal ─────────────────────────────────────────────────────────

/// Ordered log of everything the mocks observe, shared across them.
///
/// Entries are prefixed by collaborator: `sink:`, `nav:`, `notify:`,
/// `store:`, `leave:`.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<StdMutex<Vec<String>>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Index of the first entry equal to `needle`, if present.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == needle)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.position(needle).is_some()
    }
}

// ── MockRoom ────────────────────────────────────────────────────────

/// A scripted live room connection.
///
/// Holds the only event sender: `push` injects events, `close_from_server`
/// delivers a close code and ends the stream, and a consented `leave` ends
/// the stream without one.
pub struct MockRoom {
    room_id: String,
    kind: RoomKind,
    token: String,
    open: AtomicBool,
    fail_leave: AtomicBool,
    pub leave_calls: AtomicUsize,
    tx: StdMutex<Option<mpsc::Sender<RoomEvent>>>,
    journal: Journal,
}

impl MockRoom {
    /// Build a room plus its live [`RoomSession`].
    pub fn session(
        room_id: &str,
        kind: RoomKind,
        token: &str,
        journal: Journal,
    ) -> (Arc<Self>, RoomSession) {
        let (tx, rx) = mpsc::channel(64);
        let room = Arc::new(Self {
            room_id: room_id.to_string(),
            kind,
            token: token.to_string(),
            open: AtomicBool::new(true),
            fail_leave: AtomicBool::new(false),
            leave_calls: AtomicUsize::new(0),
            tx: StdMutex::new(Some(tx)),
            journal,
        });
        let session = RoomSession {
            handle: Arc::clone(&room) as Arc<dyn RoomHandle>,
            events: rx,
        };
        (room, session)
    }

    /// Make the next `leave` call fail (the connection stays open).
    pub fn fail_leave(&self) {
        self.fail_leave.store(true, Ordering::SeqCst);
    }

    /// Inject one event into the connection's stream.
    pub async fn push(&self, event: RoomEvent) {
        let tx = self.tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            tx.send(event).await.expect("event receiver dropped");
        }
    }

    /// Server-initiated close: deliver the code, then end the stream.
    pub async fn close_from_server(&self, code: u16) {
        self.push(RoomEvent::Closed { code }).await;
        self.open.store(false, Ordering::SeqCst);
        self.tx.lock().unwrap().take();
    }

    pub fn leave_count(&self) -> usize {
        self.leave_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoomHandle for MockRoom {
    fn room_id(&self) -> &str {
        &self.room_id
    }

    fn kind(&self) -> RoomKind {
        self.kind
    }

    fn reconnection_token(&self) -> &str {
        &self.token
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn leave(&self) -> Result<()> {
        self.leave_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_leave.load(Ordering::SeqCst) {
            return Err(LoungeError::Leave("scripted leave failure".into()));
        }
        self.journal.push(format!("leave:{}", self.room_id));
        self.open.store(false, Ordering::SeqCst);
        // Consented leave: the stream ends with no Closed event.
        self.tx.lock().unwrap().take();
        Ok(())
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Scripted [`RoomConnector`]: join/reconnect outcomes are consumed in
/// order; every call is counted and its inputs recorded.
#[derive(Default)]
pub struct MockConnector {
    pub lobby_joins: AtomicUsize,
    pub reconnects: AtomicUsize,
    pub id_joins: StdMutex<Vec<String>>,
    pub presented_credentials: StdMutex<Vec<ReconnectionCredential>>,
    lobby_script: StdMutex<VecDeque<Result<RoomSession>>>,
    reconnect_script: StdMutex<VecDeque<Result<RoomSession>>>,
    by_id_script: StdMutex<VecDeque<Result<RoomSession>>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_lobby_join(&self, outcome: Result<RoomSession>) {
        self.lobby_script.lock().unwrap().push_back(outcome);
    }

    pub fn script_reconnect(&self, outcome: Result<RoomSession>) {
        self.reconnect_script.lock().unwrap().push_back(outcome);
    }

    pub fn script_join_by_id(&self, outcome: Result<RoomSession>) {
        self.by_id_script.lock().unwrap().push_back(outcome);
    }

    pub fn lobby_join_count(&self) -> usize {
        self.lobby_joins.load(Ordering::SeqCst)
    }

    pub fn reconnect_count(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }

    fn next(script: &StdMutex<VecDeque<Result<RoomSession>>>, what: &str) -> Result<RoomSession> {
        script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(LoungeError::Join {
                code: None,
                message: format!("no scripted {what}"),
            })
        })
    }
}

#[async_trait]
impl RoomConnector for MockConnector {
    async fn join_lobby(&self, _token: &IdentityToken) -> Result<RoomSession> {
        self.lobby_joins.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.lobby_script, "lobby join")
    }

    async fn join_by_id(&self, room_id: &str, _token: &IdentityToken) -> Result<RoomSession> {
        self.id_joins.lock().unwrap().push(room_id.to_string());
        Self::next(&self.by_id_script, "join by id")
    }

    async fn reconnect(&self, credential: &ReconnectionCredential) -> Result<RoomSession> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        self.presented_credentials
            .lock()
            .unwrap()
            .push(credential.clone());
        Self::next(&self.reconnect_script, "reconnect")
    }
}

// ── MemoryCredentialStore ───────────────────────────────────────────

/// In-memory credential store. TTL is ignored here — expiry enforcement is
/// the `TokenStore`'s job and what the tests exercise.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: StdMutex<HashMap<String, ReconnectionCredential>>,
    journal: Journal,
}

impl MemoryCredentialStore {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            entries: StdMutex::new(HashMap::new()),
            journal,
        })
    }

    /// Plant a credential directly, bypassing the TokenStore.
    pub fn plant(&self, key: &str, credential: ReconnectionCredential) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), credential);
    }

    pub fn stored(&self, key: &str) -> Option<ReconnectionCredential> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<ReconnectionCredential>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(
        &self,
        key: &str,
        credential: &ReconnectionCredential,
        _ttl: Duration,
    ) -> Result<()> {
        self.journal.push(format!("store:set:{key}"));
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), credential.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.journal.push(format!("store:delete:{key}"));
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// ── StaticAuth ──────────────────────────────────────────────────────

/// Auth provider returning either a fixed token or an error.
pub struct StaticAuth {
    token: Option<String>,
}

impl StaticAuth {
    pub fn token(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: Some(token.to_string()),
        })
    }

    pub fn missing() -> Arc<Self> {
        Arc::new(Self { token: None })
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn identity_token(&self) -> std::result::Result<IdentityToken, AuthError> {
        match &self.token {
            Some(token) => Ok(IdentityToken(token.clone())),
            None => Err(AuthError("no signed-in user".into())),
        }
    }
}

// ── Recording collaborators ─────────────────────────────────────────

/// Sink recording every op into the shared journal with a `sink:` prefix.
pub struct RecordingSink {
    journal: Journal,
}

impl RecordingSink {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self { journal })
    }

    fn push(&self, op: String) {
        self.journal.push(format!("sink:{op}"));
    }
}

impl StateSink for RecordingSink {
    fn set_connection_status(&self, status: ConnectionStatus) {
        self.push(format!("status:{status:?}"));
    }
    fn set_ccu_count(&self, count: u32) {
        self.push(format!("ccu:{count}"));
    }
    fn add_room(&self, room: RoomSummary) {
        self.push(format!("room+:{}", room.room_id));
    }
    fn update_room(&self, room: RoomSummary) {
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
    fn add_tournament(&self, tournament: TournamentSummary) {
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
    fn set_profile(&self, profile: Profile) {
        self.push(format!("profile:{}", profile.user_id));
    }
    fn set_searched_user(&self, profile: Profile) {
        self.push(format!("searched:{}", profile.user_id));
    }
    fn set_pending_game(&self, game_id: String) {
        self.push(format!("pending:{game_id}"));
    }
    fn set_booster_content(&self, _content: serde_json::Value) {
        self.push("booster".into());
    }
    fn set_suggestions(&self, users: Vec<Profile>) {
        self.push(format!("suggestions:{}", users.len()));
    }
    fn reset_lobby(&self) {
        self.push("reset_lobby".into());
    }
    fn reset_preparation(&self) {
        self.push("reset_preparation".into());
    }
}

/// Navigator recording visits into the journal with a `nav:` prefix.
pub struct RecordingNavigator {
    current: StdMutex<String>,
    pub visits: StdMutex<Vec<String>>,
    journal: Journal,
}

impl RecordingNavigator {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            current: StdMutex::new("/".to_string()),
            visits: StdMutex::new(Vec::new()),
            journal,
        })
    }

    /// Place the user on `path` without recording a visit.
    pub fn set_current(&self, path: &str) {
        *self.current.lock().unwrap() = path.to_string();
    }

    pub fn visited(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn go_to(&self, path: &str) {
        self.journal.push(format!("nav:{path}"));
        self.visits.lock().unwrap().push(path.to_string());
        *self.current.lock().unwrap() = path.to_string();
    }

    fn current_path(&self) -> String {
        self.current.lock().unwrap().clone()
    }
}

/// Notifier recording notices into the journal with a `notify:` prefix.
pub struct RecordingNotifier {
    pub notices: StdMutex<Vec<String>>,
    journal: Journal,
}

impl RecordingNotifier {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            notices: StdMutex::new(Vec::new()),
            journal,
        })
    }

    pub fn noticed(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.journal.push(format!("notify:{message}"));
        self.notices.lock().unwrap().push(message.to_string());
    }
}

// ── Harness ─────────────────────────────────────────────────────────

/// One full set of mock collaborators sharing a journal.
pub struct Harness {
    pub journal: Journal,
    pub connector: Arc<MockConnector>,
    pub auth: Arc<StaticAuth>,
    pub store: Arc<MemoryCredentialStore>,
    pub sink: Arc<RecordingSink>,
    pub navigator: Arc<RecordingNavigator>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_auth(StaticAuth::token("identity-token"))
    }

    pub fn with_auth(auth: Arc<StaticAuth>) -> Self {
        let journal = Journal::default();
        Self {
            connector: MockConnector::new(),
            auth,
            store: MemoryCredentialStore::new(journal.clone()),
            sink: RecordingSink::new(journal.clone()),
            navigator: RecordingNavigator::new(journal.clone()),
            notifier: RecordingNotifier::new(journal.clone()),
            journal,
        }
    }

    pub fn deps(&self) -> LoungeDeps {
        LoungeDeps {
            connector: Arc::clone(&self.connector) as Arc<dyn RoomConnector>,
            auth: Arc::clone(&self.auth) as Arc<dyn AuthProvider>,
            credentials: Arc::clone(&self.store) as Arc<dyn CredentialStore>,
            sink: Arc::clone(&self.sink) as Arc<dyn StateSink>,
            navigator: Arc::clone(&self.navigator) as Arc<dyn Navigator>,
            notifier: Arc::clone(&self.notifier) as Arc<dyn Notifier>,
        }
    }

    pub fn client(&self) -> LoungeClient {
        LoungeClient::new(self.deps(), LoungeConfig::default())
    }

    /// Build a scripted room sharing this harness's journal.
    pub fn room(&self, room_id: &str, kind: RoomKind, token: &str) -> (Arc<MockRoom>, RoomSession) {
        MockRoom::session(room_id, kind, token, self.journal.clone())
    }
}

// ── Fixture helpers ─────────────────────────────────────────────────

/// A credential expiring `secs_from_now` seconds from now (may be negative).
pub fn credential_expiring_in(token: &str, room_id: &str, secs_from_now: i64) -> ReconnectionCredential {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    ReconnectionCredential {
        token: token.to_string(),
        room_id: room_id.to_string(),
        expires_at: (now + secs_from_now).max(0) as u64,
    }
}

pub fn profile(user_id: &str) -> Profile {
    Profile {
        user_id: user_id.to_string(),
        display_name: format!("Player {user_id}"),
        elo: 1200,
    }
}

pub fn room_summary(room_id: &str, kind: RoomKind) -> RoomSummary {
    RoomSummary {
        room_id: room_id.to_string(),
        kind,
        client_count: 1,
        max_clients: 2,
    }
}
