//! Dispatch of tagged point-to-point server messages.
//!
//! [`MessageRouter`] maps each [`MessageTag`] to exactly one handler.
//! Registration happens while the connection is being set up, before it is
//! considered initialized; dispatch happens once per inbound message,
//! strictly in arrival order, never concurrently for the same connection.
//!
//! Handlers are synchronous closures. A handler that needs asynchronous
//! work (the room-transition trigger) spawns it — the router never waits
//! for a handler's async work before delivering the next message, so
//! delivery order is preserved while completion order is not.

use std::collections::HashMap;

use tracing::debug;

use crate::protocol::{MessageTag, ServerMessage};

/// A registered message handler.
pub type MessageHandler = Box<dyn Fn(ServerMessage) + Send + Sync>;

/// Tag → handler registry with single-threaded, in-order delivery.
#[derive(Default)]
pub struct MessageRouter {
    handlers: HashMap<MessageTag, MessageHandler>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `tag`.
    ///
    /// # Panics
    ///
    /// Registering a second handler for the same tag is a programming
    /// error, not a runtime condition to recover from — it asserts.
    pub fn register(&mut self, tag: MessageTag, handler: MessageHandler) {
        let previous = self.handlers.insert(tag, handler);
        assert!(
            previous.is_none(),
            "duplicate message handler registered for {tag:?}"
        );
    }

    /// Deliver one inbound message to its handler.
    ///
    /// Tags with no registered handler are silently ignored — the server
    /// may ship messages this client version does not know how to handle.
    pub fn dispatch(&self, message: ServerMessage) {
        let tag = message.tag();
        match self.handlers.get(&tag) {
            Some(handler) => handler(message),
            None => debug!(?tag, "no handler registered for message tag, ignoring"),
        }
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("handlers", &self.handlers.len())
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};

    #[test]
    fn dispatch_routes_to_the_registered_handler() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let mut router = MessageRouter::new();

        let sink = Arc::clone(&seen);
        router.register(
            MessageTag::RequestRoom,
            Box::new(move |msg| {
                if let ServerMessage::RequestRoom { room_id } = msg {
                    sink.lock().unwrap().push(room_id);
                }
            }),
        );

        router.dispatch(ServerMessage::RequestRoom {
            room_id: "prep42".into(),
        });

        assert_eq!(seen.lock().unwrap().as_slice(), ["prep42"]);
    }

    #[test]
    fn unregistered_tags_are_silently_ignored() {
        let router = MessageRouter::new();
        // Must not panic or error.
        router.dispatch(ServerMessage::RemoveRoom {
            room_id: "gone".into(),
        });
    }

    #[test]
    fn delivery_preserves_arrival_order() {
        let order = Arc::new(StdMutex::new(Vec::new()));
        let mut router = MessageRouter::new();

        let sink = Arc::clone(&order);
        router.register(
            MessageTag::RemoveRoom,
            Box::new(move |msg| {
                if let ServerMessage::RemoveRoom { room_id } = msg {
                    sink.lock().unwrap().push(room_id);
                }
            }),
        );

        for n in 0..5 {
            router.dispatch(ServerMessage::RemoveRoom {
                room_id: format!("r{n}"),
            });
        }

        assert_eq!(
            order.lock().unwrap().as_slice(),
            ["r0", "r1", "r2", "r3", "r4"]
        );
    }

    #[test]
    #[should_panic(expected = "duplicate message handler")]
    fn duplicate_registration_panics() {
        let mut router = MessageRouter::new();
        router.register(MessageTag::Banned, Box::new(|_| {}));
        router.register(MessageTag::Banned, Box::new(|_| {}));
    }

    #[test]
    fn handler_count_tracks_registrations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut router = MessageRouter::new();
        assert_eq!(router.handler_count(), 0);

        let counter = Arc::clone(&calls);
        router.register(
            MessageTag::Rooms,
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(router.handler_count(), 1);

        router.dispatch(ServerMessage::Rooms { rooms: vec![] });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
