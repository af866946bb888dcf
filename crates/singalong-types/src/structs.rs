//! Core value types: connections, messages and event payloads.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{ConnectionId, MessageId};

/// A live client connection.
///
/// Owned by the connection registry. Everything else refers to a
/// connection by its [`ConnectionId`] and receives a copy on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Sequential identifier, never reused within a process.
    pub id: ConnectionId,
    /// Wall-clock time the connection was opened.
    pub created_at: DateTime<Utc>,
}

/// A broadcast event recorded in the message log.
///
/// Messages are immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the global message order (1-based).
    pub id: MessageId,
    /// Event name the message was broadcast under.
    pub event: String,
    /// Event payload.
    pub data: EventData,
    /// Wall-clock time the message was appended.
    pub timestamp: DateTime<Utc>,
}

/// JSON object payload carried by sent events and broadcast messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventData(Map<String, Value>);

impl EventData {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert a top-level field, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserialize the payload into a typed handler struct.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the fields do not match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(Value::Object(self.0.clone()))
    }

    /// Return a copy with every top-level key converted to `snake_case`.
    ///
    /// Browser clients tend to send `camelCase` or `kebab-case` keys while
    /// handlers deserialize into `snake_case` Rust fields. When two keys
    /// collapse onto the same name, the one already written in `snake_case`
    /// wins. Nested objects are left untouched.
    #[must_use]
    pub fn normalized_keys(&self) -> Self {
        let mut out = Map::new();
        for (key, value) in &self.0 {
            if to_snake_case(key) == *key {
                out.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in &self.0 {
            out.entry(to_snake_case(key)).or_insert_with(|| value.clone());
        }
        Self(out)
    }
}

/// Convert a `camelCase`, `PascalCase` or `kebab-case` key to `snake_case`.
fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len().saturating_add(4));
    let mut prev: Option<char> = None;
    let mut chars = key.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '-' || c == ' ' {
            out.push('_');
        } else if c.is_uppercase() {
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // End of an acronym: "HTTPServer" -> "http_server".
                Some(p) if p.is_uppercase() => chars.peek().is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn data(value: Value) -> EventData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("messageText"), "message_text");
        assert_eq!(to_snake_case("MessageText"), "message_text");
        assert_eq!(to_snake_case("message-text"), "message_text");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("userId2Name"), "user_id2_name");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case(""), "");
    }

    #[test]
    fn normalized_keys_rewrites_top_level_only() {
        let payload = data(json!({
            "messageText": "hi",
            "nestedObject": { "innerKey": 1 }
        }));

        let normalized = payload.normalized_keys();

        assert_eq!(normalized.get("message_text"), Some(&json!("hi")));
        assert_eq!(
            normalized.get("nested_object"),
            Some(&json!({ "innerKey": 1 }))
        );
        assert!(normalized.get("messageText").is_none());
    }

    #[test]
    fn snake_case_key_wins_on_collision() {
        let payload = data(json!({ "user_name": "kept", "userName": "dropped" }));
        let normalized = payload.normalized_keys();
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized.get("user_name"), Some(&json!("kept")));
    }

    #[test]
    fn deserialize_into_typed_struct() {
        #[derive(Deserialize)]
        struct Chat {
            message_text: String,
        }

        let chat: Chat = data(json!({ "messageText": "hello" }))
            .normalized_keys()
            .deserialize()
            .unwrap();
        assert_eq!(chat.message_text, "hello");
    }

    #[test]
    fn message_serializes_with_flat_payload() {
        let message = Message {
            id: MessageId(3),
            event: "chat".to_owned(),
            data: data(json!({ "text": "yo" })),
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["event"], "chat");
        assert_eq!(value["data"]["text"], "yo");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn event_data_rejects_non_objects() {
        let parsed: Result<EventData, _> = serde_json::from_value(json!([1, 2]));
        assert!(parsed.is_err());
    }
}
