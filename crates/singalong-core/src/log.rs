//! Append-only log of broadcast messages.

use chrono::Utc;
use singalong_types::{EventData, Message, MessageId};

/// Ordered record of every broadcast message.
///
/// The log is never pruned, so memory grows with the number of broadcasts
/// for the lifetime of the process.
#[derive(Debug)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_id: MessageId,
}

impl MessageLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: MessageId::FIRST,
        }
    }

    /// Record a new message and return a copy of it.
    pub fn append(&mut self, event: impl Into<String>, data: EventData) -> Message {
        let message = Message {
            id: self.next_id,
            event: event.into(),
            data,
            timestamp: Utc::now(),
        };
        self.next_id = self.next_id.next();
        self.messages.push(message.clone());
        message
    }

    /// Messages with an id strictly greater than `last_id`, oldest first.
    ///
    /// A client that has no baseline yet (`None`) gets nothing back and
    /// waits for the next broadcast.
    pub fn since(&self, last_id: Option<MessageId>) -> Vec<Message> {
        let Some(last_id) = last_id else {
            return Vec::new();
        };
        // Ids are strictly increasing, so the log is sorted by id.
        let start = self.messages.partition_point(|m| m.id <= last_id);
        self.messages.get(start..).map(<[Message]>::to_vec).unwrap_or_default()
    }

    /// Id of the most recent message, if any.
    pub fn last_id(&self) -> Option<MessageId> {
        self.messages.last().map(|m| m.id)
    }

    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been broadcast yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with(count: u64) -> MessageLog {
        let mut log = MessageLog::new();
        for _ in 0..count {
            log.append("tick", EventData::new());
        }
        log
    }

    fn ids(messages: &[Message]) -> Vec<u64> {
        messages.iter().map(|m| m.id.into_inner()).collect()
    }

    #[test]
    fn append_assigns_consecutive_ids() {
        let mut log = MessageLog::new();
        let first = log.append("a", EventData::new());
        let second = log.append("b", EventData::new());
        assert_eq!(first.id, MessageId(1));
        assert_eq!(second.id, MessageId(2));
        assert_eq!(log.last_id(), Some(MessageId(2)));
    }

    #[test]
    fn since_none_is_empty() {
        let log = log_with(3);
        assert!(log.since(None).is_empty());
    }

    #[test]
    fn since_returns_strictly_newer_in_order() {
        let log = log_with(5);
        for k in 0..=6 {
            let expected: Vec<u64> = (1..=5).filter(|id| *id > k).collect();
            assert_eq!(ids(&log.since(Some(MessageId(k)))), expected, "since({k})");
        }
    }

    #[test]
    fn since_on_empty_log() {
        let log = MessageLog::new();
        assert!(log.since(Some(MessageId(0))).is_empty());
        assert!(log.is_empty());
        assert_eq!(log.last_id(), None);
    }
}
