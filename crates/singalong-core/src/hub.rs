//! The hub service object.
//!
//! [`Hub`] owns the connection registry, message log and pending-poll
//! queue behind a single mutex, plus the immutable [`EventRouter`]. It is
//! built once at startup and shared as `Arc<Hub>` with every request task.
//!
//! # Locking
//!
//! Tokio schedules tasks across worker threads, so every operation takes the
//! state lock for its whole duration and never awaits while holding it.
//! Two sequences must stay atomic:
//!
//! - a poll's "nothing new" check and its enqueue, so a broadcast cannot
//!   land between them and be missed;
//! - a broadcast's append and its drain of the pending queue, so message
//!   ids and deliveries share one total order.
//!
//! The lock is *not* held while an event handler runs, since handlers call
//! back into [`Hub::broadcast`].

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use singalong_types::{Connection, ConnectionId, EventData, Message, MessageId};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::log::MessageLog;
use crate::pending::PendingPollRegistry;
use crate::registry::ConnectionRegistry;
use crate::router::{DispatchOutcome, EventHandler, EventRouter};

/// Default time a poll may stay suspended before the sweeper releases it.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(20);

/// Result of a poll request.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Messages to deliver. Empty when the poll timed out.
    Messages(Vec<Message>),
    /// The connection id is not registered.
    UnknownConnection,
}

impl PollOutcome {
    /// The delivered messages, or an empty list for an unknown connection.
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Self::Messages(messages) => messages,
            Self::UnknownConnection => Vec::new(),
        }
    }
}

/// Result of a send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The event's handler ran.
    Dispatched,
    /// No handler is registered for the event.
    NoHandler,
    /// The connection id is not registered.
    UnknownConnection,
}

/// Point-in-time counters for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    /// Live connections.
    pub connections: usize,
    /// Messages in the log.
    pub messages: usize,
    /// Polls currently suspended.
    pub pending_polls: usize,
    /// Id of the newest message, if any.
    pub last_message_id: Option<MessageId>,
    /// Configured poll timeout in milliseconds.
    pub poll_timeout_ms: u64,
}

#[derive(Debug, Default)]
struct HubState {
    connections: ConnectionRegistry,
    log: MessageLog,
    pending: PendingPollRegistry,
}

/// Process-wide publish/subscribe hub for long-polling clients.
#[derive(Debug)]
pub struct Hub {
    state: Mutex<HubState>,
    router: EventRouter,
    poll_timeout: Duration,
}

impl Hub {
    /// Start building a hub.
    pub fn builder() -> HubBuilder {
        HubBuilder::new()
    }

    /// Every critical section leaves the state consistent, so a poisoned
    /// lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new connection.
    pub fn connect(&self) -> Connection {
        let connection = self.lock().connections.add();
        info!(connection_id = %connection.id, "Client connected");
        connection
    }

    /// Look up a live connection.
    pub fn connection(&self, id: ConnectionId) -> Option<Connection> {
        self.lock().connections.get(id)
    }

    /// Close a connection. Returns whether it existed.
    ///
    /// A poll the connection already has parked stays queued until the next
    /// broadcast or sweep releases it.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.lock().connections.remove(id).is_some();
        if removed {
            info!(connection_id = %id, "Client disconnected");
        } else {
            debug!(connection_id = %id, "Disconnect for unknown connection ignored");
        }
        removed
    }

    /// Fetch messages newer than `last_message_id`, waiting if there are none.
    ///
    /// When the log has nothing newer the calling task is suspended until a
    /// broadcast delivers the next message or the sweeper times the poll
    /// out with an empty list. A `None` baseline always waits.
    pub async fn poll(
        &self,
        connection_id: ConnectionId,
        last_message_id: Option<MessageId>,
    ) -> PollOutcome {
        let waiting = {
            let mut state = self.lock();
            if !state.connections.contains(connection_id) {
                debug!(connection_id = %connection_id, "Poll for unknown connection ignored");
                return PollOutcome::UnknownConnection;
            }

            let messages = state.log.since(last_message_id);
            if !messages.is_empty() {
                debug!(
                    connection_id = %connection_id,
                    count = messages.len(),
                    "Poll answered from log"
                );
                return PollOutcome::Messages(messages);
            }

            state.pending.enqueue(Instant::now())
        };

        debug!(connection_id = %connection_id, "Poll suspended");
        // A dropped sender means the hub went away; answer with nothing.
        let messages = waiting.await.unwrap_or_default();
        debug!(
            connection_id = %connection_id,
            count = messages.len(),
            "Poll resumed"
        );
        PollOutcome::Messages(messages)
    }

    /// Route a client-sent event to its handler.
    pub fn send(&self, connection_id: ConnectionId, event: &str, data: &EventData) -> SendOutcome {
        let Some(connection) = self.connection(connection_id) else {
            debug!(connection_id = %connection_id, event, "Send from unknown connection ignored");
            return SendOutcome::UnknownConnection;
        };

        match self.router.dispatch(self, event, &connection, data) {
            DispatchOutcome::Handled => SendOutcome::Dispatched,
            DispatchOutcome::NoHandler => SendOutcome::NoHandler,
        }
    }

    /// Record a message and deliver it to every suspended poll.
    ///
    /// Parked polls are resumed in the order they were enqueued, each with a
    /// one-element list holding the new message.
    pub fn broadcast(&self, event: impl Into<String>, data: EventData) -> Message {
        let mut state = self.lock();
        let message = state.log.append(event, data);

        let waiting = state.pending.drain();
        let resumed = waiting.len();
        let mut delivered: usize = 0;
        for poll in waiting {
            if poll.resume(vec![message.clone()]) {
                delivered = delivered.saturating_add(1);
            }
        }
        drop(state);

        debug!(
            message_id = %message.id,
            event = %message.event,
            resumed,
            delivered,
            "Message broadcast"
        );
        message
    }

    /// Release every poll that has waited longer than the poll timeout.
    ///
    /// Returns how many polls were released with an empty result.
    pub fn sweep(&self, now: Instant) -> usize {
        let expired = self.lock().pending.expire(now, self.poll_timeout);
        let count = expired.len();
        for poll in expired {
            poll.resume(Vec::new());
        }
        if count > 0 {
            debug!(count, "Timed out pending polls");
        }
        count
    }

    /// Current counters.
    pub fn stats(&self) -> HubStats {
        let state = self.lock();
        HubStats {
            connections: state.connections.len(),
            messages: state.log.len(),
            pending_polls: state.pending.len(),
            last_message_id: state.log.last_id(),
            poll_timeout_ms: u64::try_from(self.poll_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Startup-time configuration for a [`Hub`].
///
/// Handlers can only be registered here, so the handler table is read-only
/// once requests are being served.
#[derive(Debug)]
pub struct HubBuilder {
    router: EventRouter,
    poll_timeout: Duration,
}

impl HubBuilder {
    /// A builder with no handlers and the default poll timeout.
    pub fn new() -> Self {
        Self {
            router: EventRouter::new(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Register `handler` for `event`, replacing any earlier registration.
    #[must_use]
    pub fn on(mut self, event: impl Into<String>, handler: impl EventHandler + 'static) -> Self {
        self.router.register(event, handler);
        self
    }

    /// Set how long a poll may stay suspended.
    #[must_use]
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Finish construction.
    pub fn build(self) -> Hub {
        info!(
            events = ?self.router.events().collect::<Vec<_>>(),
            poll_timeout = ?self.poll_timeout,
            "Hub built"
        );
        Hub {
            state: Mutex::new(HubState::default()),
            router: self.router,
            poll_timeout: self.poll_timeout,
        }
    }
}

impl Default for HubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::task::JoinHandle;

    use super::*;

    fn payload(value: serde_json::Value) -> EventData {
        serde_json::from_value(value).unwrap()
    }

    /// A hub whose "say" handler rebroadcasts the payload as "said".
    fn echo_hub() -> Arc<Hub> {
        Arc::new(
            Hub::builder()
                .on("say", |hub: &Hub, _: &Connection, data: &EventData| {
                    hub.broadcast("said", data.clone());
                })
                .build(),
        )
    }

    fn spawn_poll(
        hub: &Arc<Hub>,
        id: ConnectionId,
        last: Option<MessageId>,
    ) -> JoinHandle<PollOutcome> {
        let hub = Arc::clone(hub);
        tokio::spawn(async move { hub.poll(id, last).await })
    }

    async fn wait_for_pending(hub: &Hub, count: usize) {
        while hub.stats().pending_polls < count {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn broadcast_ids_increase_by_one() {
        let hub = Hub::builder().build();
        let ids: Vec<u64> = (0..5)
            .map(|_| hub.broadcast("tick", EventData::new()).id.into_inner())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn poll_returns_backlog_immediately() {
        let hub = Hub::builder().build();
        let conn = hub.connect();
        hub.broadcast("a", EventData::new());
        hub.broadcast("b", EventData::new());

        let outcome = hub.poll(conn.id, Some(MessageId(0))).await;
        let events: Vec<String> = outcome.into_messages().into_iter().map(|m| m.event).collect();
        assert_eq!(events, vec!["a", "b"]);
        assert_eq!(hub.stats().pending_polls, 0);
    }

    #[tokio::test]
    async fn poll_at_head_suspends_until_broadcast() {
        let hub = echo_hub();
        let conn = hub.connect();
        let head = hub.broadcast("warmup", EventData::new()).id;

        let poll = spawn_poll(&hub, conn.id, Some(head));
        wait_for_pending(&hub, 1).await;
        assert!(!poll.is_finished());

        let sent = hub.broadcast("news", payload(json!({ "n": 1 })));

        let messages = poll.await.unwrap().into_messages();
        assert_eq!(messages, vec![sent]);
        assert_eq!(hub.stats().pending_polls, 0);
    }

    #[tokio::test]
    async fn fresh_connection_without_baseline_suspends() {
        let hub = echo_hub();
        let conn = hub.connect();

        let poll = spawn_poll(&hub, conn.id, None);
        wait_for_pending(&hub, 1).await;

        hub.broadcast("hello", EventData::new());
        let messages = poll.await.unwrap().into_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].event, "hello");
    }

    #[tokio::test]
    async fn every_pending_poll_receives_the_broadcast_once() {
        let hub = echo_hub();
        let conns: Vec<Connection> = (0..3).map(|_| hub.connect()).collect();

        let mut polls = Vec::new();
        for (n, conn) in (1..).zip(&conns) {
            polls.push(spawn_poll(&hub, conn.id, None));
            wait_for_pending(&hub, n).await;
        }

        let sent = hub.broadcast("e", payload(json!({ "d": true })));
        assert_eq!(hub.stats().pending_polls, 0);

        let results = futures::future::join_all(polls).await;
        for result in results {
            let messages = result.unwrap().into_messages();
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0], sent);
        }

        // A second broadcast reaches nobody: every poll was consumed.
        hub.broadcast("e", EventData::new());
        assert_eq!(hub.stats().messages, 2);
    }

    #[tokio::test]
    async fn send_runs_handler_which_broadcasts_to_pollers() {
        let hub = echo_hub();
        let sender = hub.connect();
        let listener = hub.connect();

        let poll = spawn_poll(&hub, listener.id, None);
        wait_for_pending(&hub, 1).await;

        let outcome = hub.send(sender.id, "say", &payload(json!({ "lyricLine": "la" })));
        assert_eq!(outcome, SendOutcome::Dispatched);

        let messages = poll.await.unwrap().into_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].event, "said");
        assert_eq!(messages[0].data.get("lyric_line"), Some(&json!("la")));
    }

    #[test]
    fn send_with_unknown_event_leaves_log_alone() {
        let hub = echo_hub();
        let conn = hub.connect();
        let outcome = hub.send(conn.id, "nonexistent-event", &EventData::new());
        assert_eq!(outcome, SendOutcome::NoHandler);
        assert_eq!(hub.stats().messages, 0);
    }

    #[test]
    fn send_from_unknown_connection_is_ignored() {
        let hub = echo_hub();
        let outcome = hub.send(ConnectionId(9), "say", &EventData::new());
        assert_eq!(outcome, SendOutcome::UnknownConnection);
        assert_eq!(hub.stats().messages, 0);
    }

    #[tokio::test]
    async fn poll_after_disconnect_is_a_no_op() {
        let hub = echo_hub();
        let conn = hub.connect();
        assert!(hub.disconnect(conn.id));
        assert!(!hub.disconnect(conn.id));

        let outcome = hub.poll(conn.id, None).await;
        assert_eq!(outcome, PollOutcome::UnknownConnection);
        assert_eq!(hub.stats().pending_polls, 0);
    }

    #[tokio::test]
    async fn abandoned_poll_is_collected_by_broadcast() {
        let hub = echo_hub();
        let conn = hub.connect();

        let poll = spawn_poll(&hub, conn.id, None);
        wait_for_pending(&hub, 1).await;
        poll.abort();
        let _ = poll.await;

        hub.broadcast("late", EventData::new());
        assert_eq!(hub.stats().pending_polls, 0);
    }

    #[tokio::test]
    async fn repoll_sees_only_unacknowledged_messages() {
        let hub = echo_hub();
        let conn = hub.connect();

        let poll = spawn_poll(&hub, conn.id, None);
        wait_for_pending(&hub, 1).await;
        let first = hub.broadcast("one", EventData::new());
        let delivered = poll.await.unwrap().into_messages();
        assert_eq!(delivered, vec![first.clone()]);

        let second = hub.broadcast("two", EventData::new());
        let outcome = hub.poll(conn.id, Some(first.id)).await;
        assert_eq!(outcome.into_messages(), vec![second]);
    }

    #[test]
    fn stats_report_configured_poll_timeout() {
        let hub = Hub::builder().poll_timeout(Duration::from_secs(45)).build();
        let stats = hub.stats();
        assert_eq!(stats.poll_timeout_ms, 45_000);
        assert_eq!(stats.connections, 0);
        assert_eq!(stats.last_message_id, None);

        let default_hub = Hub::builder().build();
        assert_eq!(default_hub.stats().poll_timeout_ms, 20_000);
    }
}
