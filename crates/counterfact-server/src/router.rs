//! Axum router construction for the session API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the session server.
///
/// See [`handlers`] for the REST routes. `GET /ws/forks` streams committed
/// forks.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/ws/forks", get(ws::ws_forks))
        // REST API
        .route("/api/health", get(handlers::health))
        .route("/api/sessions", post(handlers::create_session))
        .route("/api/sessions/{id}/branches", get(handlers::list_branches))
        .route(
            "/api/sessions/{id}/timeline/{branch}",
            get(handlers::get_timeline),
        )
        .route("/api/sessions/{id}/nodes/{node}", get(handlers::get_node))
        .route(
            "/api/sessions/{id}/nodes/{node}/forks",
            get(handlers::get_forks),
        )
        .route(
            "/api/sessions/{id}/nodes/{node}/diff/{other}",
            get(handlers::get_diff),
        )
        .route(
            "/api/sessions/{id}/render-packs/{node}",
            get(handlers::get_render_pack),
        )
        .route("/api/sessions/{id}/fork", post(handlers::fork))
        .route("/api/sessions/{id}/voice", post(handlers::voice))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
