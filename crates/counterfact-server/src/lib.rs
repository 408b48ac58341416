//! Session API server for Counterfact.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **REST endpoints** for creating sessions, reading branches,
//!   timelines, nodes, diffs and render packs, executing forks, and
//!   interpreting voice commands
//! - **`WebSocket` endpoint** (`/ws/forks`) announcing committed forks via
//!   [`tokio::sync::broadcast`]
//!
//! All state lives in memory in [`AppState`]: the session store, the
//! resilient collaborator, and the pre-generated content cache.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::{AppState, ForkBroadcast, ServerCollaborator};
