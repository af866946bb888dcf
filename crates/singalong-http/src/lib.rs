//! HTTP long-polling transport for the Sing-Along hub.
//!
//! This crate mounts a [`Hub`] behind an Axum router:
//!
//! - **`POST {base}/connect`** -- open a connection
//! - **`POST {base}/poll`** -- long poll for messages after an id
//! - **`POST {base}/send`** -- send an event to its handler
//! - **`POST {base}/disconnect`** -- close a connection
//! - **`GET {base}/status`** -- hub counters
//!
//! All bodies are JSON with `camelCase` field names. The base path
//! defaults to `/sing-along/xhr`.
//!
//! # Architecture
//!
//! Handlers are thin: they decode the body, call the hub, and encode the
//! result. A poll handler simply awaits [`Hub::poll`], so while it is
//! suspended the Tokio worker is free to serve other requests. If the client
//! hangs up, Axum drops the handler future and the parked poll is collected
//! by the next broadcast or sweep.
//!
//! [`Hub`]: singalong_core::Hub
//! [`Hub::poll`]: singalong_core::Hub::poll

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use state::AppState;
