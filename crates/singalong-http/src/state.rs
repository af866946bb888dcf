//! Shared application state for the HTTP layer.

use std::sync::Arc;

use singalong_core::Hub;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The hub every request operates on.
    pub hub: Arc<Hub>,
}

impl AppState {
    /// Wrap an existing hub.
    pub const fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}
