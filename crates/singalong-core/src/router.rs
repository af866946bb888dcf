//! Event name to handler dispatch.
//!
//! Application code registers an [`EventHandler`] per event name before the
//! hub is built. When a client sends an event, the router looks up the
//! handler and invokes it with the sending [`Connection`] and the payload.
//! Handlers decide for themselves whether to broadcast, using the [`Hub`]
//! they are handed.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use singalong_types::{Connection, EventData};
use tracing::{debug, warn};

use crate::hub::Hub;

/// Application callback invoked for a sent event.
///
/// Any `Fn(&Hub, &Connection, &EventData) + Send + Sync` closure is a
/// handler:
///
/// ```rust,ignore
/// let hub = Hub::builder()
///     .on("chat", |hub: &Hub, conn: &Connection, data: &EventData| {
///         hub.broadcast("chat", data.clone());
///     })
///     .build();
/// ```
pub trait EventHandler: Send + Sync {
    /// Handle one event sent by `connection`.
    ///
    /// `data` has already had its top-level keys normalized to
    /// `snake_case`.
    fn handle(&self, hub: &Hub, connection: &Connection, data: &EventData);
}

impl<F> EventHandler for F
where
    F: Fn(&Hub, &Connection, &EventData) + Send + Sync,
{
    fn handle(&self, hub: &Hub, connection: &Connection, data: &EventData) {
        self(hub, connection, data);
    }
}

/// Result of routing a sent event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler was found and ran.
    Handled,
    /// No handler is registered for the event. Nothing happened.
    NoHandler,
}

/// Table of event handlers keyed by event name.
#[derive(Clone, Default)]
pub struct EventRouter {
    handlers: BTreeMap<String, Arc<dyn EventHandler>>,
}

impl EventRouter {
    /// Create a router with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`, replacing any previous handler.
    pub fn register(&mut self, event: impl Into<String>, handler: impl EventHandler + 'static) {
        let event = event.into();
        if self.handlers.insert(event.clone(), Arc::new(handler)).is_some() {
            warn!(event = %event, "Replacing existing event handler");
        }
    }

    /// Registered event names in sorted order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Invoke the handler for `event`, if one is registered.
    ///
    /// The handler runs synchronously on the calling task.
    pub fn dispatch(
        &self,
        hub: &Hub,
        event: &str,
        connection: &Connection,
        data: &EventData,
    ) -> DispatchOutcome {
        let Some(handler) = self.handlers.get(event) else {
            debug!(event, connection_id = %connection.id, "No handler for event");
            return DispatchOutcome::NoHandler;
        };

        let normalized = data.normalized_keys();
        handler.handle(hub, connection, &normalized);
        debug!(event, connection_id = %connection.id, "Event handled");
        DispatchOutcome::Handled
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
