//! Lobby → preparation room handoff.
//!
//! [`RoomTransitionCoordinator`] reacts to a server `REQUEST_ROOM` message
//! by moving the user from the shared lobby into a per-match preparation
//! room, reconciling two independent connection lifecycles without losing
//! session continuity:
//!
//! 1. obtain an identity token (no token ⇒ silent no-op);
//! 2. join the target room by id;
//! 3. validate the room's declared kind is `preparation` (guards against a
//!    stale room id), leaving the just-joined room best-effort otherwise;
//! 4. persist the preparation reconnection credential *before* any
//!    teardown, so a crash mid-transition resumes into preparation;
//! 5. release every source connection concurrently, best-effort — one
//!    failed leave never blocks the others or the transition;
//! 6. reset lobby-scoped projected state and navigate.
//!
//! Failures carrying a recognized close code are translated for the user;
//! everything else is logged and the transition aborts in place — the user
//! stays wherever the failure left them, with no forced navigation.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use futures_util::future::{join_all, BoxFuture};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, trace, warn};

use crate::client::{LoungeConfig, LoungeDeps};
use crate::credentials::{TokenStore, PREPARATION_CREDENTIAL_KEY};
use crate::error::{LoungeError, Result};
use crate::protocol::{RoomEvent, RoomKind};
use crate::room::{RoomConnector, RoomHandle};
use crate::services::{AuthProvider, Navigator, Notifier};
use crate::session::LobbySlot;
use crate::sink::StateSink;

/// Phases of one lobby → preparation handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionState {
    #[default]
    Idle,
    Authenticating,
    JoiningTarget,
    Validating,
    LeavingSources,
    Resetting,
    /// Terminal: the user was handed off to the preparation view.
    Navigated,
    /// Terminal: the transition aborted.
    Failed,
}

/// How a transition attempt ended, short of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The handoff completed and navigation was triggered.
    Completed,
    /// No identity token was available; the request was ignored.
    Skipped,
}

/// Executes the lobby → preparation handoff.
///
/// Owns the single active preparation handle for the lifetime of that
/// connection; the lobby handle is released through the shared
/// [`LobbySlot`].
pub struct RoomTransitionCoordinator {
    connector: Arc<dyn RoomConnector>,
    auth: Arc<dyn AuthProvider>,
    tokens: TokenStore,
    sink: Arc<dyn StateSink>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    config: Arc<LoungeConfig>,
    lobby: LobbySlot,
    preparation: Arc<Mutex<Option<Arc<dyn RoomHandle>>>>,
    state: StdMutex<TransitionState>,
}

impl RoomTransitionCoordinator {
    pub(crate) fn new(deps: &LoungeDeps, config: Arc<LoungeConfig>, lobby: LobbySlot) -> Self {
        Self {
            connector: Arc::clone(&deps.connector),
            auth: Arc::clone(&deps.auth),
            tokens: TokenStore::new(Arc::clone(&deps.credentials)),
            sink: Arc::clone(&deps.sink),
            navigator: Arc::clone(&deps.navigator),
            notifier: Arc::clone(&deps.notifier),
            config,
            lobby,
            preparation: Arc::new(Mutex::new(None)),
            state: StdMutex::new(TransitionState::Idle),
        }
    }

    /// Entry point for the `REQUEST_ROOM` message.
    ///
    /// Never returns an error: failures are classified here — recognized
    /// close codes become a user-facing message, everything else is logged
    /// only — and the transition aborts in place.
    pub async fn on_room_requested(&self, room_id: &str) {
        match self.run(room_id).await {
            Ok(TransitionOutcome::Completed) => {}
            Ok(TransitionOutcome::Skipped) => {
                debug!(room_id, "room transition skipped, no identity token");
            }
            Err(e) => {
                self.set_state(TransitionState::Failed);
                match e.close_code() {
                    Some(code) => {
                        warn!(room_id, %code, "room transition rejected");
                        self.notifier.notify(code.user_message());
                    }
                    None => error!(room_id, "room transition failed: {e}"),
                }
            }
        }
    }

    /// The handoff itself. Kept separate from
    /// [`on_room_requested`](Self::on_room_requested) so tests can assert
    /// on the raw error.
    pub async fn run(&self, room_id: &str) -> Result<TransitionOutcome> {
        self.set_state(TransitionState::Authenticating);
        let Ok(token) = self.auth.identity_token().await else {
            // Absence of a token is not an error here: no token, no
            // transition, no noise.
            self.set_state(TransitionState::Idle);
            return Ok(TransitionOutcome::Skipped);
        };

        self.set_state(TransitionState::JoiningTarget);
        let session = self.connector.join_by_id(room_id, &token).await?;
        let handle = Arc::clone(&session.handle);

        self.set_state(TransitionState::Validating);
        if handle.kind() != RoomKind::Preparation {
            // The room id went stale between the server's request and our
            // join. Back out of the room we just entered, best-effort.
            if handle.is_open() {
                if let Err(e) = handle.leave().await {
                    warn!(room_id, "failed to back out of mis-kinded room: {e}");
                }
            }
            return Err(LoungeError::UnexpectedRoomKind {
                actual: handle.kind(),
            });
        }

        // Persisted before leave/reset: a crash from here on resumes into
        // the preparation room instead of re-joining the lobby.
        self.tokens
            .save(
                PREPARATION_CREDENTIAL_KEY,
                handle.reconnection_token(),
                handle.room_id(),
                self.config.preparation_credential_ttl,
            )
            .await?;

        self.set_state(TransitionState::LeavingSources);
        let previous = self.preparation.lock().await.replace(Arc::clone(&handle));
        self.release_sources(previous).await;
        self.watch_preparation(Arc::clone(&handle), session.events);

        self.set_state(TransitionState::Resetting);
        self.sink.reset_lobby();

        self.navigator.go_to(&self.config.preparation_path);
        self.set_state(TransitionState::Navigated);
        info!(room_id = %handle.room_id(), "handed off to preparation room");
        Ok(TransitionOutcome::Completed)
    }

    /// Current phase of the most recent transition attempt.
    pub fn state(&self) -> TransitionState {
        self.state
            .lock()
            .map(|slot| *slot)
            .unwrap_or(TransitionState::Idle)
    }

    /// The live preparation handle, if one is active.
    pub async fn preparation_handle(&self) -> Option<Arc<dyn RoomHandle>> {
        self.preparation.lock().await.clone()
    }

    fn set_state(&self, next: TransitionState) {
        if let Ok(mut slot) = self.state.lock() {
            trace!(from = ?*slot, to = ?next, "transition state");
            *slot = next;
        }
    }

    /// Leave every source connection concurrently, best-effort.
    ///
    /// Sources are the lobby connection and any previously-active
    /// preparation connection — never the room just joined. Every leave
    /// attempt settles (success or failure) before this returns; individual
    /// failures are logged and never aggregated into an error.
    async fn release_sources(&self, previous_preparation: Option<Arc<dyn RoomHandle>>) {
        let mut leaves: Vec<BoxFuture<'static, (&'static str, Result<()>)>> = Vec::new();

        if let Some(lobby) = self.lobby.take().await {
            if lobby.is_open() {
                leaves.push(Box::pin(async move { ("lobby", lobby.leave().await) }));
            }
        }
        if let Some(stale) = previous_preparation {
            if stale.is_open() {
                leaves.push(Box::pin(async move { ("preparation", stale.leave().await) }));
            }
        }

        for (room, outcome) in join_all(leaves).await {
            match outcome {
                Ok(()) => debug!(room, "left source room"),
                Err(e) => warn!(room, "best-effort leave failed: {e}"),
            }
        }
    }

    /// Drain the new preparation connection's events until it closes, then
    /// clear the slot. Projection for the preparation room is the next
    /// view's concern, not the lobby core's.
    fn watch_preparation(&self, handle: Arc<dyn RoomHandle>, mut events: mpsc::Receiver<RoomEvent>) {
        let slot = Arc::clone(&self.preparation);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    RoomEvent::Closed { code } => {
                        debug!(code, "preparation room closed");
                        break;
                    }
                    other => trace!(?other, "preparation room event"),
                }
            }
            // Only clear the slot if a newer handoff hasn't replaced it.
            let mut guard = slot.lock().await;
            if guard
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &handle))
            {
                guard.take();
            }
        });
    }
}

impl std::fmt::Debug for RoomTransitionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomTransitionCoordinator")
            .field("state", &self.state())
            .finish()
    }
}
