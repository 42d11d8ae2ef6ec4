//! # Lounge Client
//!
//! Transport-agnostic Rust client for the Lounge realtime lobby protocol.
//!
//! This crate maintains a persistent logical session against a stateful
//! room server, reconstructs a tree of server-authoritative entities from
//! incremental synchronization events, and coordinates the lobby →
//! preparation room handoff without losing session continuity across
//! network interruptions.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement the [`RoomConnector`] trait for any
//!   realtime-room backend; the wire encoding never touches this crate
//! - **Reconnection-first** — persisted, TTL-bounded reconnection
//!   credentials are tried before any fresh join
//! - **Consistent projection** — duplicate, stale, and out-of-order
//!   mutation events never corrupt the local mirror or the external store
//! - **Crash-safe handoff** — the preparation credential is persisted
//!   before the lobby is released, so a mid-transition crash resumes into
//!   the match
//!
//! ## Quick Start
//!
//! ```text
//! // Wire a LoungeClient around your collaborators, then connect():
//! // see the `client` module documentation for a full example.
//! ```

pub mod client;
pub mod close_codes;
pub mod credentials;
pub mod error;
pub mod projector;
pub mod protocol;
pub mod room;
pub mod router;
pub mod services;
pub mod session;
pub mod sink;
pub mod transition;

// Re-export primary types for ergonomic imports.
pub use client::{LoungeClient, LoungeConfig, LoungeDeps};
pub use close_codes::CloseCode;
pub use credentials::{CredentialStore, ReconnectionCredential, TokenStore};
pub use error::{AuthError, LoungeError, Result};
pub use projector::StateProjector;
pub use protocol::{MessageTag, RoomEvent, ServerMessage, SyncEvent};
pub use room::{RoomConnector, RoomHandle, RoomSession};
pub use router::MessageRouter;
pub use services::{AuthProvider, IdentityToken, Navigator, Notifier};
pub use session::SessionManager;
pub use sink::StateSink;
pub use transition::{RoomTransitionCoordinator, TransitionState};
