//! High-level client facade for the Lounge lobby protocol.
//!
//! [`LoungeClient`] wires the session manager, the state projector, the
//! message router, and the room-transition coordinator around one set of
//! external collaborators ([`LoungeDeps`]). It also implements the single
//! top-level error channel for initial connection failures.
//!
//! # Example
//!
//! ```rust,ignore
//! let deps = LoungeDeps {
//!     connector: Arc::new(my_connector),
//!     auth: Arc::new(my_auth),
//!     credentials: Arc::new(my_store),
//!     sink: Arc::new(my_store_front),
//!     navigator: Arc::new(my_router),
//!     notifier: Arc::new(my_toasts),
//! };
//! let client = LoungeClient::new(deps, LoungeConfig::default());
//!
//! let lobby = client.connect().await?;
//! tracing::info!("in lobby room {}", lobby.room_id());
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::credentials::{
    CredentialStore, LOBBY_CREDENTIAL_TTL, PREPARATION_CREDENTIAL_TTL,
};
use crate::error::{LoungeError, Result};
use crate::protocol::{ConnectionStatus, MessageTag, RoomKind, ServerMessage};
use crate::room::{RoomConnector, RoomHandle};
use crate::router::MessageRouter;
use crate::services::{AuthProvider, Navigator, Notifier};
use crate::session::{LobbySlot, RouterBuilder, SessionManager};
use crate::sink::StateSink;
use crate::transition::{RoomTransitionCoordinator, TransitionState};

/// Notice shown when the initial lobby connection fails outright.
const CONNECT_FAILURE_NOTICE: &str = "Could not reach the lounge. Please try again.";

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`LoungeClient`].
///
/// All fields have sensible defaults.
///
/// # Example
///
/// ```
/// use lounge_client::client::LoungeConfig;
/// use std::time::Duration;
///
/// let config = LoungeConfig::default()
///     .with_preparation_path("/match/prepare")
///     .with_lobby_credential_ttl(Duration::from_secs(120));
/// assert_eq!(config.preparation_path, "/match/prepare");
/// assert_eq!(config.entry_path, "/");
/// ```
#[derive(Debug, Clone)]
pub struct LoungeConfig {
    /// Path of the lobby view. Forced-disconnect redirects only fire while
    /// the user is here.
    pub lobby_path: String,
    /// Path of the entry (sign-in) view.
    pub entry_path: String,
    /// Path navigated to after a completed room transition.
    pub preparation_path: String,
    /// TTL of the persisted lobby reconnection credential.
    pub lobby_credential_ttl: Duration,
    /// TTL of the persisted preparation reconnection credential.
    pub preparation_credential_ttl: Duration,
}

impl Default for LoungeConfig {
    fn default() -> Self {
        Self {
            lobby_path: "/lobby".to_string(),
            entry_path: "/".to_string(),
            preparation_path: "/preparation".to_string(),
            lobby_credential_ttl: LOBBY_CREDENTIAL_TTL,
            preparation_credential_ttl: PREPARATION_CREDENTIAL_TTL,
        }
    }
}

impl LoungeConfig {
    /// Set the lobby view path.
    #[must_use]
    pub fn with_lobby_path(mut self, path: impl Into<String>) -> Self {
        self.lobby_path = path.into();
        self
    }

    /// Set the entry view path.
    #[must_use]
    pub fn with_entry_path(mut self, path: impl Into<String>) -> Self {
        self.entry_path = path.into();
        self
    }

    /// Set the preparation view path.
    #[must_use]
    pub fn with_preparation_path(mut self, path: impl Into<String>) -> Self {
        self.preparation_path = path.into();
        self
    }

    /// Set the lobby credential TTL. Defaults to **5 minutes**.
    #[must_use]
    pub fn with_lobby_credential_ttl(mut self, ttl: Duration) -> Self {
        self.lobby_credential_ttl = ttl;
        self
    }

    /// Set the preparation credential TTL. Defaults to **30 seconds**.
    #[must_use]
    pub fn with_preparation_credential_ttl(mut self, ttl: Duration) -> Self {
        self.preparation_credential_ttl = ttl;
        self
    }
}

// ── Collaborators ───────────────────────────────────────────────────

/// The external collaborators a [`LoungeClient`] is built around.
///
/// All are shared trait objects; cloning the bundle clones the `Arc`s.
#[derive(Clone)]
pub struct LoungeDeps {
    /// The underlying realtime-room transport.
    pub connector: Arc<dyn RoomConnector>,
    /// Identity provider.
    pub auth: Arc<dyn AuthProvider>,
    /// Persistent credential storage.
    pub credentials: Arc<dyn CredentialStore>,
    /// The external state store receiving projected updates.
    pub sink: Arc<dyn StateSink>,
    /// Navigation collaborator.
    pub navigator: Arc<dyn Navigator>,
    /// User-facing notice channel.
    pub notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for LoungeDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoungeDeps").finish_non_exhaustive()
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Facade owning the lobby session and the room-transition coordinator.
pub struct LoungeClient {
    session: Arc<SessionManager>,
    transition: Arc<RoomTransitionCoordinator>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    config: Arc<LoungeConfig>,
}

impl LoungeClient {
    /// Wire a client around the given collaborators.
    pub fn new(deps: LoungeDeps, config: LoungeConfig) -> Self {
        let config = Arc::new(config);
        let lobby = LobbySlot::default();

        let transition = Arc::new(RoomTransitionCoordinator::new(
            &deps,
            Arc::clone(&config),
            lobby.clone(),
        ));
        let router_builder = build_router(&deps, Arc::clone(&transition));
        let session = Arc::new(SessionManager::new(
            &deps,
            Arc::clone(&config),
            lobby,
            router_builder,
        ));

        Self {
            session,
            transition,
            navigator: Arc::clone(&deps.navigator),
            notifier: Arc::clone(&deps.notifier),
            config,
        }
    }

    /// Establish (or reuse) the lobby session.
    ///
    /// This is the single top-level failure channel for initial connection:
    /// on error it logs, shows a notice (auth failures bounce to entry
    /// silently — the sign-in view speaks for itself), navigates away from
    /// the lobby, and propagates the error. The persisted lobby credential
    /// is NOT cleared here; only a failed reconnect attempt clears it.
    ///
    /// # Errors
    ///
    /// Propagates the underlying [`LoungeError`] after handling it.
    pub async fn connect(&self) -> Result<Arc<dyn RoomHandle>> {
        match self.session.connect().await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                error!("lobby connect failed: {e}");
                if !matches!(e, LoungeError::Auth(_)) {
                    self.notifier.notify(CONNECT_FAILURE_NOTICE);
                }
                self.navigator.go_to(&self.config.entry_path);
                Err(e)
            }
        }
    }

    /// Leave the lobby and tear the session down, best-effort.
    pub async fn disconnect(&self) {
        self.session.disconnect().await;
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Current connection status of the lobby session.
    pub fn status(&self) -> ConnectionStatus {
        self.session.status()
    }

    /// Phase of the most recent room transition.
    pub fn transition_state(&self) -> TransitionState {
        self.transition.state()
    }

    /// The session manager, for embedders needing direct access.
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// The transition coordinator, for embedders needing direct access.
    pub fn transition(&self) -> &Arc<RoomTransitionCoordinator> {
        &self.transition
    }
}

impl std::fmt::Debug for LoungeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoungeClient")
            .field("status", &self.status())
            .field("transition", &self.transition_state())
            .finish()
    }
}

// ── Router wiring ───────────────────────────────────────────────────

/// One handler per message tag, registered fresh for every connection.
///
/// Handlers translate payloads into sink updates; `REQUEST_ROOM` spawns the
/// transition coordinator so the router never waits on its async work.
fn build_router(deps: &LoungeDeps, transition: Arc<RoomTransitionCoordinator>) -> RouterBuilder {
    let sink = Arc::clone(&deps.sink);
    let notifier = Arc::clone(&deps.notifier);

    Box::new(move || {
        let mut router = MessageRouter::new();

        let target = Arc::clone(&notifier);
        router.register(
            MessageTag::Banned,
            Box::new(move |msg| {
                if let ServerMessage::Banned { reason } = msg {
                    target.notify(&reason);
                }
            }),
        );

        let target = Arc::clone(&sink);
        router.register(
            MessageTag::Rooms,
            Box::new(move |msg| {
                if let ServerMessage::Rooms { rooms } = msg {
                    for room in rooms {
                        target.add_room(room);
                    }
                }
            }),
        );

        let coordinator = Arc::clone(&transition);
        router.register(
            MessageTag::RequestRoom,
            Box::new(move |msg| {
                if let ServerMessage::RequestRoom { room_id } = msg {
                    let coordinator = Arc::clone(&coordinator);
                    tokio::spawn(async move {
                        coordinator.on_room_requested(&room_id).await;
                    });
                }
            }),
        );

        let target = Arc::clone(&sink);
        router.register(
            MessageTag::AddRoom,
            Box::new(move |msg| {
                if let ServerMessage::AddRoom { room } = msg {
                    // Only rooms a player can act on reach the sink. The
                    // server repeats this announcement as counts change, so
                    // it lands as an upsert.
                    if matches!(room.kind, RoomKind::Preparation | RoomKind::Game) {
                        target.update_room(room);
                    } else {
                        debug!(room_id = %room.room_id, kind = ?room.kind, "ignoring room announcement");
                    }
                }
            }),
        );

        let target = Arc::clone(&sink);
        router.register(
            MessageTag::RemoveRoom,
            Box::new(move |msg| {
                if let ServerMessage::RemoveRoom { room_id } = msg {
                    target.remove_room(&room_id);
                }
            }),
        );

        let target = Arc::clone(&sink);
        router.register(
            MessageTag::UserProfile,
            Box::new(move |msg| {
                if let ServerMessage::UserProfile { profile } = msg {
                    target.set_profile(profile);
                }
            }),
        );

        let target = Arc::clone(&sink);
        router.register(
            MessageTag::ReconnectPrompt,
            Box::new(move |msg| {
                if let ServerMessage::ReconnectPrompt { pending_game_id } = msg {
                    target.set_pending_game(pending_game_id);
                }
            }),
        );

        let target = Arc::clone(&sink);
        router.register(
            MessageTag::User,
            Box::new(move |msg| {
                if let ServerMessage::User { profile } = msg {
                    target.set_searched_user(profile);
                }
            }),
        );

        let target = Arc::clone(&sink);
        router.register(
            MessageTag::BoosterContent,
            Box::new(move |msg| {
                if let ServerMessage::BoosterContent { content } = msg {
                    target.set_booster_content(content);
                }
            }),
        );

        let target = Arc::clone(&sink);
        router.register(
            MessageTag::Suggestions,
            Box::new(move |msg| {
                if let ServerMessage::Suggestions { users } = msg {
                    target.set_suggestions(users);
                }
            }),
        );

        router
    })
}
