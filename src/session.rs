//! Lobby session lifecycle: reconnect-first connect, event pump, and
//! disconnect classification.
//!
//! [`SessionManager`] owns the single live lobby connection. `connect()` is
//! idempotent while a fully-initialized connection exists and single-flight
//! while one is being established — two rapid calls perform exactly one
//! network join. Reconnection with a persisted credential is attempted
//! before any fresh join; a failed reconnect discards the credential (it is
//! assumed consumed) and falls through, never retrying the same token.
//!
//! Once a connection is up, a background pump task feeds its event stream
//! into the [`StateProjector`] and [`MessageRouter`] serially. The session
//! is marked initialized only after projector and router are attached —
//! consumers never observe a handle before that point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::client::{LoungeConfig, LoungeDeps};
use crate::close_codes::CloseCode;
use crate::credentials::{TokenStore, LOBBY_CREDENTIAL_KEY};
use crate::error::Result;
use crate::projector::StateProjector;
use crate::protocol::{ConnectionStatus, RoomEvent};
use crate::room::{RoomConnector, RoomHandle, RoomSession};
use crate::router::MessageRouter;
use crate::services::{AuthProvider, IdentityToken, Navigator, Notifier};
use crate::sink::StateSink;

/// Builds the per-connection message router with all handlers registered.
///
/// Invoked once per established connection, before the session is marked
/// initialized — registration after initialization is a contract violation.
pub type RouterBuilder = Box<dyn Fn() -> MessageRouter + Send + Sync>;

// ── Shared state ────────────────────────────────────────────────────

/// Shared slot holding the single active lobby handle.
///
/// The handle is exclusively owned by the session manager, but the
/// room-transition coordinator releases it through this slot during the
/// lobby → preparation handoff. Clones share the same slot.
#[derive(Clone, Default)]
pub struct LobbySlot {
    inner: Arc<Mutex<Option<Arc<dyn RoomHandle>>>>,
}

impl LobbySlot {
    /// The currently held handle, if any.
    pub async fn current(&self) -> Option<Arc<dyn RoomHandle>> {
        self.inner.lock().await.clone()
    }

    /// Remove and return the held handle.
    pub async fn take(&self) -> Option<Arc<dyn RoomHandle>> {
        self.inner.lock().await.take()
    }

    async fn set(&self, handle: Arc<dyn RoomHandle>) {
        *self.inner.lock().await = Some(handle);
    }

    /// Clear the slot if it still holds `handle` (or is already empty).
    ///
    /// Returns `false` when a different connection has taken the slot — the
    /// caller's teardown is stale and must not touch shared state.
    pub(crate) async fn release_for(&self, handle: &Arc<dyn RoomHandle>) -> bool {
        let mut guard = self.inner.lock().await;
        match guard.as_ref() {
            Some(current) if Arc::ptr_eq(current, handle) => {
                guard.take();
                true
            }
            Some(_) => false,
            None => true,
        }
    }
}

impl std::fmt::Debug for LobbySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbySlot").finish_non_exhaustive()
    }
}

/// Internal state shared between the manager and its pump task.
struct SessionShared {
    status: StdMutex<ConnectionStatus>,
    initialized: AtomicBool,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            status: StdMutex::new(ConnectionStatus::Disconnected),
            initialized: AtomicBool::new(false),
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        if let Ok(mut slot) = self.status.lock() {
            *slot = status;
        }
    }

    fn status(&self) -> ConnectionStatus {
        self.status
            .lock()
            .map(|slot| *slot)
            .unwrap_or(ConnectionStatus::Disconnected)
    }
}

// ── SessionManager ──────────────────────────────────────────────────

/// Owns the connection lifecycle to the lobby room.
pub struct SessionManager {
    connector: Arc<dyn RoomConnector>,
    auth: Arc<dyn AuthProvider>,
    tokens: TokenStore,
    sink: Arc<dyn StateSink>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    config: Arc<LoungeConfig>,
    router_builder: RouterBuilder,
    shared: Arc<SessionShared>,
    lobby: LobbySlot,
    /// Single-flight gate: concurrent `connect()` calls queue here, so a
    /// second caller observes the first caller's result instead of joining
    /// again.
    connect_gate: Mutex<()>,
    pump: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SessionManager {
    pub(crate) fn new(
        deps: &LoungeDeps,
        config: Arc<LoungeConfig>,
        lobby: LobbySlot,
        router_builder: RouterBuilder,
    ) -> Self {
        Self {
            connector: Arc::clone(&deps.connector),
            auth: Arc::clone(&deps.auth),
            tokens: TokenStore::new(Arc::clone(&deps.credentials)),
            sink: Arc::clone(&deps.sink),
            navigator: Arc::clone(&deps.navigator),
            notifier: Arc::clone(&deps.notifier),
            config,
            router_builder,
            shared: Arc::new(SessionShared::new()),
            lobby,
            connect_gate: Mutex::new(()),
            pump: Mutex::new(None),
        }
    }

    /// Establish (or reuse) the lobby connection.
    ///
    /// Safe to call repeatedly from unrelated call sites: while a
    /// fully-initialized open connection exists, the existing handle is
    /// returned with no network activity.
    ///
    /// # Errors
    ///
    /// Surfaces [`AuthError`](crate::error::AuthError) when no identity
    /// exists, and join/storage failures from establishment. Reconnection
    /// failures are recovered internally and never returned.
    pub async fn connect(&self) -> Result<Arc<dyn RoomHandle>> {
        let _gate = self.connect_gate.lock().await;

        if self.shared.initialized.load(Ordering::Acquire) {
            if let Some(handle) = self.lobby.current().await {
                if handle.is_open() {
                    debug!(room_id = %handle.room_id(), "lobby already connected, reusing handle");
                    return Ok(handle);
                }
            }
        }

        self.shared.set_status(ConnectionStatus::Connecting);
        self.sink.set_connection_status(ConnectionStatus::Connecting);

        match self.establish().await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.shared.set_status(ConnectionStatus::Disconnected);
                self.sink.set_connection_status(ConnectionStatus::Disconnected);
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<Arc<dyn RoomHandle>> {
        // The identity token is mandatory even when a reconnection
        // credential exists.
        let token = self.auth.identity_token().await?;

        let session = self.open_lobby(&token).await?;
        let handle = Arc::clone(&session.handle);

        self.tokens
            .save(
                LOBBY_CREDENTIAL_KEY,
                handle.reconnection_token(),
                handle.room_id(),
                self.config.lobby_credential_ttl,
            )
            .await?;

        self.attach(session).await;

        self.shared.set_status(ConnectionStatus::Connected);
        self.sink.set_connection_status(ConnectionStatus::Connected);
        // Initialized strictly last: nothing observes the handle until the
        // projector and router are wired to the connection.
        self.shared.initialized.store(true, Ordering::Release);
        info!(room_id = %handle.room_id(), "lobby session established");
        Ok(handle)
    }

    /// Reconnect with a persisted credential when one is available,
    /// otherwise (or on reconnect failure) perform a fresh join.
    async fn open_lobby(&self, token: &IdentityToken) -> Result<RoomSession> {
        if let Some(credential) = self.tokens.load(LOBBY_CREDENTIAL_KEY).await? {
            debug!(room_id = %credential.room_id, "reconnecting with persisted credential");
            match self.connector.reconnect(&credential).await {
                Ok(session) => return Ok(session),
                Err(e) => {
                    // The token is assumed consumed or invalid; discard it
                    // and fall through. Never retried.
                    warn!("reconnection failed, falling back to fresh join: {e}");
                    self.tokens.discard(LOBBY_CREDENTIAL_KEY).await?;
                }
            }
        }
        self.connector.join_lobby(token).await
    }

    /// Wire the projector and router to the new connection and start the
    /// event pump.
    async fn attach(&self, session: RoomSession) {
        let projector = StateProjector::new(Arc::clone(&self.sink));
        let router = (self.router_builder)();

        self.lobby.set(Arc::clone(&session.handle)).await;

        let ctx = PumpContext {
            handle: Arc::clone(&session.handle),
            shared: Arc::clone(&self.shared),
            lobby: self.lobby.clone(),
            sink: Arc::clone(&self.sink),
            navigator: Arc::clone(&self.navigator),
            notifier: Arc::clone(&self.notifier),
            config: Arc::clone(&self.config),
        };
        let task = tokio::spawn(pump_lobby_events(session.events, projector, router, ctx));

        if let Some(previous) = self.pump.lock().await.replace(task) {
            // A pump from a dead connection drains on its own; only abort if
            // it is still running (its stream must be stale by now).
            if !previous.is_finished() {
                previous.abort();
            }
        }
    }

    /// Leave the lobby room and tear the session down.
    ///
    /// Best-effort: a failed leave is logged, never returned.
    pub async fn disconnect(&self) {
        self.shared.initialized.store(false, Ordering::Release);
        if let Some(handle) = self.lobby.take().await {
            if handle.is_open() {
                if let Err(e) = handle.leave().await {
                    warn!("failed to leave lobby room: {e}");
                }
            }
        }
        self.shared.set_status(ConnectionStatus::Disconnected);
        self.sink.set_connection_status(ConnectionStatus::Disconnected);
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Current connection status of the logical session.
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    /// Whether a fully-initialized connection exists.
    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::Acquire)
    }

    /// The live lobby handle, if connected.
    pub async fn lobby_handle(&self) -> Option<Arc<dyn RoomHandle>> {
        self.lobby.current().await
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("status", &self.status())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

// ── Event pump ──────────────────────────────────────────────────────

/// Everything the pump needs to classify a close after the stream ends.
struct PumpContext {
    /// The connection this pump drives; teardown is skipped if a newer
    /// connection has superseded it (stale-result discard).
    handle: Arc<dyn RoomHandle>,
    shared: Arc<SessionShared>,
    lobby: LobbySlot,
    sink: Arc<dyn StateSink>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    config: Arc<LoungeConfig>,
}

/// Background task that drives one lobby connection's event stream.
///
/// Sync events and messages are delivered serially, in arrival order — no
/// two handlers for the same connection ever run in parallel. Exits when
/// the stream ends (consented leave) or a `Closed` event arrives
/// (server-initiated close, classified below).
async fn pump_lobby_events(
    mut events: mpsc::Receiver<RoomEvent>,
    mut projector: StateProjector,
    router: MessageRouter,
    ctx: PumpContext,
) {
    debug!("lobby event pump started");

    let mut close_code: Option<u16> = None;
    while let Some(event) = events.recv().await {
        match event {
            RoomEvent::Sync(sync) => projector.apply(sync),
            RoomEvent::Message(message) => router.dispatch(message),
            RoomEvent::Error { message } => warn!("lobby connection error: {message}"),
            RoomEvent::Closed { code } => {
                close_code = Some(code);
                break;
            }
        }
    }

    projector.detach();
    if !ctx.lobby.release_for(&ctx.handle).await {
        debug!("stale lobby pump finished after a newer connection took over");
        return;
    }
    ctx.shared.initialized.store(false, Ordering::Release);
    ctx.shared.set_status(ConnectionStatus::Disconnected);

    match close_code {
        Some(code) => classify_disconnect(&ctx, code),
        // Stream ended without a close code: consented leave (transition or
        // explicit disconnect). Nothing to classify.
        None => debug!("lobby event pump finished, connection released"),
    }
}

/// Decide what a server-initiated close means for the user.
///
/// Codes implying the identity is no longer valid force navigation back to
/// the entry page — but only when the user is still on the lobby view. A
/// disconnect received while already elsewhere is not redirected. All other
/// codes are transient: logged, status updated, nothing shown.
fn classify_disconnect(ctx: &PumpContext, code: u16) {
    ctx.sink
        .set_connection_status(ConnectionStatus::Disconnected);

    match CloseCode::from_code(code) {
        Some(close) if close.invalidates_identity() => {
            if ctx.navigator.current_path() == ctx.config.lobby_path {
                warn!(code, "identity rejected by server, returning to entry");
                ctx.notifier.notify(close.user_message());
                ctx.navigator.go_to(&ctx.config.entry_path);
            } else {
                debug!(code, "identity disconnect received off the lobby view, not redirecting");
            }
        }
        _ => warn!(code, "lobby connection closed"),
    }
}
