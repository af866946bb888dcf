//! Error types for the HTTP layer.
//!
//! [`HttpError`] converts into a JSON error response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The hub
//! itself never fails a request; these errors come from body decoding.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request body was not the expected JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// The body was not sent as `application/json`.
    #[error("unsupported content type: {0}")]
    UnsupportedMediaType(String),
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(e) => Self::UnsupportedMediaType(e.body_text()),
            other => Self::InvalidBody(other.body_text()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidBody(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::UnsupportedMediaType(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
