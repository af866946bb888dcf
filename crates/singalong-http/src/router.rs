//! Axum router construction for the long-polling API.
//!
//! Mounts the long-poll routes under a base path with CORS enabled for
//! browser clients served from other origins.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes, relative to `base_path`:
/// - `POST /connect`
/// - `POST /poll`
/// - `POST /send`
/// - `POST /disconnect`
/// - `GET /status`
///
/// A `base_path` of `/` (or empty) mounts the routes at the root.
pub fn build_router(state: Arc<AppState>, base_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        .route("/connect", post(handlers::connect))
        .route("/poll", post(handlers::poll))
        .route("/send", post(handlers::send))
        .route("/disconnect", post(handlers::disconnect))
        .route("/status", get(handlers::status));

    // Axum refuses to nest at the root.
    let base_path = base_path.trim_end_matches('/');
    let app = if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(base_path, routes)
    };

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
