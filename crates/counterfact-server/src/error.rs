//! Error types for the session API server.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use counterfact_core::error::{ForkError, GraphError, SeedError};
use tracing::error;

/// Errors that can occur in the session API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested session, node, branch, or render pack was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body or path failed validation.
    #[error("invalid request: {0}")]
    Validation(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ForkError> for ApiError {
    fn from(err: ForkError) -> Self {
        match err {
            ForkError::SessionNotFound(_) | ForkError::NodeNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            ForkError::InvalidRequest(msg) => Self::Validation(msg),
            ForkError::Graph(GraphError::NodeNotFound(id)) => {
                Self::NotFound(format!("node {id} not found"))
            }
            ForkError::Unrecoverable(_) | ForkError::Graph(_) | ForkError::TimestampOverflow => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::NodeNotFound(_) | GraphError::BranchNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            _ => Self::Internal(err.to_string()),
        }
    }
}

impl From<SeedError> for ApiError {
    fn from(err: SeedError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => {
                error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
