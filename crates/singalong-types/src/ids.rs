//! Type-safe identifier wrappers around `u64`.
//!
//! Connections and messages are numbered from two independent counters,
//! each starting at 1 and never reusing a value. The newtypes keep the two
//! sequences from being mixed up at compile time while serializing as plain
//! JSON integers.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around a sequential `u64` identifier.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// The first identifier handed out by a fresh counter.
            pub const FIRST: Self = Self(1);

            /// Return the identifier that follows this one.
            ///
            /// Saturates at `u64::MAX`, which no realistic process reaches.
            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }

            /// Return the inner `u64` value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a client connection, assigned on connect.
    ConnectionId
}

define_id! {
    /// Identifier of a broadcast message, shared across all event names.
    MessageId
}
