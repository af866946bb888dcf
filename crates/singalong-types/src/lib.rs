//! Shared type definitions for the Sing-Along long-polling hub.
//!
//! This crate holds the value types that cross every layer of the
//! workspace: the hub core produces them, the HTTP layer serializes them.
//!
//! # Modules
//!
//! - [`ids`] -- Sequential integer identifiers for connections and messages
//! - [`structs`] -- [`Connection`], [`Message`] and the [`EventData`] payload

pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use ids::{ConnectionId, MessageId};
pub use structs::{Connection, EventData, Message};
