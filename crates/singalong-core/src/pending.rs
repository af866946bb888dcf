//! Suspended poll requests awaiting new data.
//!
//! A poll that finds nothing new registers a [`PendingPoll`] here and then
//! awaits the [`oneshot::Receiver`] returned by
//! [`PendingPollRegistry::enqueue`]. The task is parked without holding any
//! lock. It wakes when either the broadcast path drains the queue or the
//! sweeper expires the entry.
//!
//! [`PendingPoll::resume`] takes `self` by value and entries are only
//! reachable after being removed from the queue, so a poll can never be
//! resumed twice.

use std::collections::VecDeque;
use std::time::Duration;

use singalong_types::Message;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// One suspended poll.
#[derive(Debug)]
pub struct PendingPoll {
    enqueued_at: Instant,
    resume: oneshot::Sender<Vec<Message>>,
}

impl PendingPoll {
    /// When the poll was parked.
    pub const fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    /// How long the poll has been waiting as of `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.enqueued_at)
    }

    /// Wake the suspended task with `messages`.
    ///
    /// Returns `false` if the waiting side has already gone away (the HTTP
    /// client disconnected). That is not an error.
    pub fn resume(self, messages: Vec<Message>) -> bool {
        self.resume.send(messages).is_ok()
    }
}

/// FIFO queue of suspended polls, oldest first.
#[derive(Debug, Default)]
pub struct PendingPollRegistry {
    queue: VecDeque<PendingPoll>,
}

impl PendingPollRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Park a new poll at the back of the queue.
    ///
    /// The caller awaits the returned receiver to suspend.
    pub fn enqueue(&mut self, now: Instant) -> oneshot::Receiver<Vec<Message>> {
        let (tx, rx) = oneshot::channel();
        self.queue.push_back(PendingPoll {
            enqueued_at: now,
            resume: tx,
        });
        rx
    }

    /// Remove every parked poll, in enqueue order.
    pub fn drain(&mut self) -> Vec<PendingPoll> {
        self.queue.drain(..).collect()
    }

    /// Remove polls from the front whose age exceeds `timeout`.
    ///
    /// Stops at the first poll still within the threshold. Entries are
    /// enqueued in time order, so nothing behind it can be older.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<PendingPoll> {
        let mut expired = Vec::new();
        while self.queue.front().is_some_and(|poll| poll.age(now) > timeout) {
            if let Some(poll) = self.queue.pop_front() {
                expired.push(poll);
            }
        }
        expired
    }

    /// Number of parked polls.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no polls are parked.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
