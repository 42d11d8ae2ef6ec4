//! Room-connection abstraction for the Lounge lobby protocol.
//!
//! The [`RoomConnector`] trait is the seam to the underlying realtime-room
//! transport. The wire encoding of the synchronization protocol is not this
//! crate's concern — the connector delivers already-decoded
//! [`RoomEvent`]s over a channel and exposes each live connection as a
//! [`RoomHandle`].
//!
//! # Connection Setup
//!
//! Endpoint configuration (URLs, TLS, auth headers) is intentionally NOT
//! part of these traits — construct a connector around your transport
//! externally and hand it to the client.
//!
//! # Implementing a Connector
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use lounge_client::credentials::ReconnectionCredential;
//! use lounge_client::error::Result;
//! use lounge_client::room::{RoomConnector, RoomSession};
//! use lounge_client::services::IdentityToken;
//!
//! struct MyConnector { /* ... */ }
//!
//! #[async_trait]
//! impl RoomConnector for MyConnector {
//!     async fn join_lobby(&self, token: &IdentityToken) -> Result<RoomSession> {
//!         // Open a connection to the shared lobby room
//!         todo!()
//!     }
//!
//!     async fn join_by_id(&self, room_id: &str, token: &IdentityToken) -> Result<RoomSession> {
//!         // Join a specific room (preparation handoff target)
//!         todo!()
//!     }
//!
//!     async fn reconnect(&self, credential: &ReconnectionCredential) -> Result<RoomSession> {
//!         // Resume a prior connection with its reconnection token
//!         todo!()
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::credentials::ReconnectionCredential;
use crate::error::Result;
use crate::protocol::{RoomEvent, RoomKind};
use crate::services::IdentityToken;

/// One live logical room connection.
///
/// A handle is exclusively owned by the coordinator that opened it
/// (SessionManager for the lobby, RoomTransitionCoordinator for the
/// preparation room) and is never shared between them. All methods other
/// than [`leave`](RoomHandle::leave) are cheap metadata reads.
///
/// # Object Safety
///
/// This trait is object-safe; connections travel as `Arc<dyn RoomHandle>`.
#[async_trait]
pub trait RoomHandle: Send + Sync + 'static {
    /// The server-assigned room id.
    fn room_id(&self) -> &str;

    /// The kind the room declared when the connection was established.
    fn kind(&self) -> RoomKind;

    /// The reconnection token issued for this connection.
    fn reconnection_token(&self) -> &str;

    /// Whether the connection is still open.
    fn is_open(&self) -> bool;

    /// Leave the room gracefully.
    ///
    /// A consented leave ends the connection's event stream without a
    /// `Closed` event. Leaving an already-closed connection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LoungeError::Leave`](crate::error::LoungeError::Leave) if
    /// the leave could not be delivered. Callers treat this as best-effort.
    async fn leave(&self) -> Result<()>;
}

impl std::fmt::Debug for dyn RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle")
            .field("room_id", &self.room_id())
            .field("kind", &self.kind())
            .field("is_open", &self.is_open())
            .finish()
    }
}

/// A freshly established room connection: its handle plus its event stream.
///
/// The events receiver yields [`RoomEvent`]s strictly in server order until
/// the connection ends. It is consumed by exactly one event pump; the handle
/// may be cloned (via `Arc`) and retained for metadata and `leave`.
pub struct RoomSession {
    /// Control handle for the connection.
    pub handle: Arc<dyn RoomHandle>,
    /// Ordered event stream for the connection's lifetime.
    pub events: mpsc::Receiver<RoomEvent>,
}

impl std::fmt::Debug for RoomSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSession")
            .field("room_id", &self.handle.room_id())
            .field("kind", &self.handle.kind())
            .field("is_open", &self.handle.is_open())
            .finish()
    }
}

/// The underlying realtime-room transport.
///
/// Implementations open room connections against the Lounge server. Every
/// method resolves once the server has acknowledged the join (or rejected
/// it) — the returned [`RoomSession`] is live.
///
/// # Cancel Safety
///
/// The event receiver inside [`RoomSession`] must be cancel-safe to poll
/// (`tokio::sync::mpsc` is); the join methods themselves are only awaited
/// from dedicated flows and need no special guarantees.
#[async_trait]
pub trait RoomConnector: Send + Sync + 'static {
    /// Join the shared lobby room with a fresh identity token.
    ///
    /// # Errors
    ///
    /// Returns [`LoungeError::Join`](crate::error::LoungeError::Join) when
    /// the server rejects the join; the error carries the close code when
    /// one accompanied the rejection.
    async fn join_lobby(&self, token: &IdentityToken) -> Result<RoomSession>;

    /// Join a specific room by id, presenting the identity token.
    ///
    /// Used for the lobby → preparation handoff.
    ///
    /// # Errors
    ///
    /// Returns [`LoungeError::Join`](crate::error::LoungeError::Join) when
    /// the server rejects the join.
    async fn join_by_id(&self, room_id: &str, token: &IdentityToken) -> Result<RoomSession>;

    /// Resume a prior connection using a persisted reconnection credential.
    ///
    /// Callers must only present unexpired credentials — the
    /// [`TokenStore`](crate::credentials::TokenStore) enforces expiry before
    /// a credential ever reaches this method.
    ///
    /// # Errors
    ///
    /// Returns [`LoungeError::Reconnection`](crate::error::LoungeError::Reconnection)
    /// when the server refuses the token (consumed, revoked, room gone).
    async fn reconnect(&self, credential: &ReconnectionCredential) -> Result<RoomSession>;
}
