//! Long-polling endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `{base}/connect` | Open a connection |
//! | `POST` | `{base}/poll` | Wait for messages after `lastMessageId` |
//! | `POST` | `{base}/send` | Route an event to its handler |
//! | `POST` | `{base}/disconnect` | Close a connection |
//! | `GET` | `{base}/status` | Hub counters |
//!
//! Requests naming an unknown connection or an unhandled event succeed with
//! an empty result so that expired clients never see server errors.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;
use singalong_core::{PollOutcome, SendOutcome};
use singalong_types::{ConnectionId, EventData, Message, MessageId};
use tracing::debug;

use crate::error::HttpError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Response body for `POST {base}/connect`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    /// The new connection's id.
    pub connection_id: ConnectionId,
}

/// Request body for `POST {base}/poll`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRequest {
    /// The polling connection.
    pub connection_id: ConnectionId,
    /// Id of the newest message the client has seen, if any.
    #[serde(default)]
    pub last_message_id: Option<MessageId>,
    /// Opaque client value echoed back in the response.
    #[serde(default)]
    pub context: Option<Value>,
}

/// Response body for `POST {base}/poll`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PollResponse {
    /// The request's `context`, if it had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// New messages, oldest first. Empty on timeout.
    pub messages: Vec<Message>,
}

/// Request body for `POST {base}/send`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// The sending connection.
    pub connection_id: ConnectionId,
    /// Event name to dispatch on.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub data: EventData,
    /// Opaque client value echoed back in the response.
    #[serde(default)]
    pub context: Option<Value>,
}

/// Response body for `POST {base}/send`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SendResponse {
    /// The request's `context`, if it had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Request body for `POST {base}/disconnect`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    /// The connection to close. A missing id is a no-op.
    #[serde(default)]
    pub connection_id: Option<ConnectionId>,
}

// ---------------------------------------------------------------------------
// POST {base}/connect
// ---------------------------------------------------------------------------

/// Open a new connection and return its id.
pub async fn connect(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let connection = state.hub.connect();
    Json(ConnectResponse {
        connection_id: connection.id,
    })
}

// ---------------------------------------------------------------------------
// POST {base}/poll
// ---------------------------------------------------------------------------

/// Long poll for messages after `lastMessageId`.
///
/// Responds immediately when the log already holds newer messages.
/// Otherwise the request stays open until the next broadcast or until the
/// poll times out, in which case `messages` is empty.
pub async fn poll(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PollRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(request) = body?;

    let messages = match state
        .hub
        .poll(request.connection_id, request.last_message_id)
        .await
    {
        PollOutcome::Messages(messages) => messages,
        PollOutcome::UnknownConnection => Vec::new(),
    };

    debug!(
        connection_id = %request.connection_id,
        count = messages.len(),
        "Sending poll response"
    );

    Ok(Json(PollResponse {
        context: request.context,
        messages,
    }))
}

// ---------------------------------------------------------------------------
// POST {base}/send
// ---------------------------------------------------------------------------

/// Dispatch an event to its registered handler.
///
/// The response is the same whether or not a handler ran.
pub async fn send(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(request) = body?;

    let outcome = state
        .hub
        .send(request.connection_id, &request.event, &request.data);
    if outcome != SendOutcome::Dispatched {
        debug!(
            connection_id = %request.connection_id,
            event = %request.event,
            ?outcome,
            "Send ignored"
        );
    }

    Ok(Json(SendResponse {
        context: request.context,
    }))
}

// ---------------------------------------------------------------------------
// POST {base}/disconnect
// ---------------------------------------------------------------------------

/// Close a connection. Unknown or missing ids are ignored.
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DisconnectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(request) = body?;

    if let Some(id) = request.connection_id {
        state.hub.disconnect(id);
    }

    Ok(Json(serde_json::json!({})))
}

// ---------------------------------------------------------------------------
// GET {base}/status
// ---------------------------------------------------------------------------

/// Report connection, message and pending-poll counts.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.hub.stats())
}
