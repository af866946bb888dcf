//! Long-polling publish/subscribe core for the Sing-Along hub.
//!
//! A client connects to obtain an identity, polls for messages newer than
//! the last one it saw, and sends events that application handlers turn
//! into broadcasts. A poll that finds nothing new is parked until the next
//! broadcast or until the sweeper times it out.
//!
//! # Modules
//!
//! - [`registry`] -- Live connections keyed by [`ConnectionId`].
//! - [`log`] -- Append-only message log with `since` lookups.
//! - [`pending`] -- FIFO queue of suspended polls and their one-shot resumers.
//! - [`router`] -- Event name to [`EventHandler`] dispatch.
//! - [`hub`] -- The [`Hub`] service object tying it all together, including
//!   the broadcast path.
//! - [`sweeper`] -- Background task that times out stale polls.
//! - [`config`] -- Configuration loading from `singalong-config.yaml`.
//!
//! [`ConnectionId`]: singalong_types::ConnectionId
//! [`EventHandler`]: router::EventHandler
//! [`Hub`]: hub::Hub

pub mod config;
pub mod hub;
pub mod log;
pub mod pending;
pub mod registry;
pub mod router;
pub mod sweeper;

pub use hub::{Hub, HubBuilder, HubStats, PollOutcome, SendOutcome};
pub use router::{DispatchOutcome, EventHandler, EventRouter};
pub use sweeper::spawn_sweeper;
