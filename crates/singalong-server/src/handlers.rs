//! Demo event handlers registered by the server binary.
//!
//! | Event | Payload | Broadcast |
//! |-------|---------|-----------|
//! | `chat` | `{ text }` | `chat` with `{ text, connection_id }` |
//! | `join` | `{ displayName? }` | `joined` with `{ name, connection_id }` |
//! | `leave` | none | `left` with `{ connection_id }` |

use serde::Deserialize;
use serde_json::json;
use singalong_core::{Hub, HubBuilder};
use singalong_types::{Connection, EventData};
use tracing::warn;

/// Payload of a `chat` event.
#[derive(Debug, Deserialize)]
struct ChatLine {
    text: String,
}

/// Payload of a `join` event.
#[derive(Debug, Default, Deserialize)]
struct Join {
    #[serde(default)]
    display_name: Option<String>,
}

/// Register the demo handlers on `builder`.
pub fn register(builder: HubBuilder) -> HubBuilder {
    builder
        .on("chat", chat)
        .on("join", join)
        .on("leave", leave)
}

fn chat(hub: &Hub, connection: &Connection, data: &EventData) {
    let line: ChatLine = match data.deserialize() {
        Ok(line) => line,
        Err(e) => {
            warn!(connection_id = %connection.id, error = %e, "Dropping malformed chat line");
            return;
        }
    };

    let mut out = EventData::new();
    out.insert("text", json!(line.text));
    out.insert("connection_id", json!(connection.id));
    hub.broadcast("chat", out);
}

fn join(hub: &Hub, connection: &Connection, data: &EventData) {
    let join: Join = data.deserialize().unwrap_or_default();
    let name = join
        .display_name
        .unwrap_or_else(|| format!("singer-{}", connection.id));

    let mut out = EventData::new();
    out.insert("name", json!(name));
    out.insert("connection_id", json!(connection.id));
    hub.broadcast("joined", out);
}

fn leave(hub: &Hub, connection: &Connection, _data: &EventData) {
    let mut out = EventData::new();
    out.insert("connection_id", json!(connection.id));
    hub.broadcast("left", out);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::Value;
    use singalong_core::SendOutcome;
    use singalong_types::MessageId;

    use super::*;

    fn payload(value: Value) -> EventData {
        serde_json::from_value(value).unwrap()
    }

    fn demo_hub() -> Hub {
        register(Hub::builder()).build()
    }

    #[tokio::test]
    async fn chat_broadcasts_text_with_sender() {
        let hub = demo_hub();
        let conn = hub.connect();

        let outcome = hub.send(conn.id, "chat", &payload(json!({ "text": "hello" })));
        assert_eq!(outcome, SendOutcome::Dispatched);

        let messages = hub.poll(conn.id, Some(MessageId(0))).await.into_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].event, "chat");
        assert_eq!(messages[0].data.get("text"), Some(&json!("hello")));
        assert_eq!(messages[0].data.get("connection_id"), Some(&json!(1)));
    }

    #[test]
    fn malformed_chat_is_dropped() {
        let hub = demo_hub();
        let conn = hub.connect();
        hub.send(conn.id, "chat", &payload(json!({ "body": 1 })));
        assert_eq!(hub.stats().messages, 0);
    }

    #[tokio::test]
    async fn join_uses_camel_case_display_name() {
        let hub = demo_hub();
        let conn = hub.connect();
        hub.send(conn.id, "join", &payload(json!({ "displayName": "Ada" })));
        hub.send(conn.id, "join", &EventData::new());

        let messages = hub.poll(conn.id, Some(MessageId(0))).await.into_messages();
        assert_eq!(messages[0].data.get("name"), Some(&json!("Ada")));
        assert_eq!(messages[1].data.get("name"), Some(&json!("singer-1")));
    }

    #[test]
    fn leave_broadcasts_left() {
        let hub = demo_hub();
        let conn = hub.connect();
        hub.send(conn.id, "leave", &EventData::new());
        assert_eq!(hub.stats().messages, 1);
    }
}
