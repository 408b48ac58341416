//! REST API endpoint handlers for the session server.
//!
//! Handlers are thin: they parse the request, lock at most one session, and
//! delegate to the story graph, the fork pipeline, or the collaborator.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/health` | Liveness and collaborator mode |
//! | `POST` | `/api/sessions` | Create a session, optionally for a topic |
//! | `GET` | `/api/sessions/{id}/branches` | List branches |
//! | `GET` | `/api/sessions/{id}/timeline/{branch}` | Timeline of a branch |
//! | `GET` | `/api/sessions/{id}/nodes/{node}` | Full node with render pack |
//! | `GET` | `/api/sessions/{id}/nodes/{node}/forks` | Branches diverging at a node |
//! | `GET` | `/api/sessions/{id}/nodes/{node}/diff/{other}` | World-state diff |
//! | `GET` | `/api/sessions/{id}/render-packs/{node}` | Render pack of a node |
//! | `POST` | `/api/sessions/{id}/fork` | Execute a fork |
//! | `POST` | `/api/sessions/{id}/voice` | Interpret a voice command |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use counterfact_core::content::ContentCache;
use counterfact_core::session::{Session, SessionHandle};
use counterfact_types::{BranchId, NodeId, SessionId};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, ForkBroadcast};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/sessions`. The body may be omitted entirely.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Topic to generate a scenario for. The configured scenario is used
    /// when absent or blank.
    #[serde(default)]
    pub topic: Option<String>,
}

/// Body of `POST /api/sessions/{id}/fork`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkBody {
    /// The node to diverge from.
    pub parent_node_id: NodeId,
    /// Free-text description of the change.
    pub description: String,
}

/// Body of `POST /api/sessions/{id}/voice`.
#[derive(Debug, serde::Deserialize)]
pub struct VoiceBody {
    /// Transcribed speech.
    pub transcript: String,
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Liveness check reporting whether an LLM collaborator is configured.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let llm = state.collaborator.has_primary();
    Json(json!({
        "status": "ok",
        "collaborator": if llm { "llm" } else { "deterministic" },
        "llmConfigured": llm,
        "sessions": state.store.len().await,
    }))
}

// ---------------------------------------------------------------------------
// POST /api/sessions
// ---------------------------------------------------------------------------

/// Create a session. With a topic, the scenario comes from the
/// collaborator; otherwise the configured scenario is used.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: CreateSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        parse_body(&body)?
    };
    let topic = request
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let (session, fallback_used) = match topic {
        Some(topic) => session_for_topic(&state, topic).await?,
        None => {
            let scenario = state.collaborator.fallback().scenario_for("");
            (Session::from_scenario(&scenario, &state.content)?, false)
        }
    };

    let title = session.metadata.title.clone();
    let description = session.metadata.description.clone();
    let mainline = session
        .graph
        .get_timeline(&BranchId::main())
        .unwrap_or_default();
    let id = state.store.create(session).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "sessionId": id,
            "title": title,
            "description": description,
            "mainline": mainline,
            "fallbackUsed": fallback_used,
        })),
    ))
}

/// Build a session from a generated scenario. A generated scenario whose
/// mainline cannot be built is replaced by the fallback scenario.
async fn session_for_topic(state: &AppState, topic: &str) -> Result<(Session, bool), ApiError> {
    let assisted = state
        .collaborator
        .generate_scenario(topic)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    if assisted.fallback_used {
        return Ok((Session::from_scenario(&assisted.value, &state.content)?, true));
    }

    // Cached media belongs to the configured scenario's events.
    match Session::from_scenario(&assisted.value, &ContentCache::new()) {
        Ok(session) => Ok((session, false)),
        Err(e) => {
            warn!(topic, error = %e, "generated scenario rejected, using fallback scenario");
            let scenario = state.collaborator.fallback().scenario_for(topic);
            Ok((Session::from_scenario(&scenario, &state.content)?, true))
        }
    }
}

// ---------------------------------------------------------------------------
// Graph queries
// ---------------------------------------------------------------------------

/// List every branch of a session.
pub async fn list_branches(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, &id).await?;
    let session = session.read().await;
    Ok(Json(json!({
        "sessionId": session.id,
        "branches": session.graph.get_branch_list(),
    })))
}

/// The timeline of one branch, shared history first.
pub async fn get_timeline(
    State(state): State<Arc<AppState>>,
    Path((id, branch)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, &id).await?;
    let session = session.read().await;
    let branch_id = BranchId::new(branch);
    let timeline = session
        .graph
        .get_timeline(&branch_id)
        .ok_or_else(|| ApiError::NotFound(format!("branch {branch_id} not found")))?;
    Ok(Json(json!({
        "branchId": branch_id,
        "timeline": timeline,
    })))
}

/// A node with its world snapshot and render pack.
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    Path((id, node)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, &id).await?;
    let session = session.read().await;
    let node_id = NodeId::new(node);
    let node = session
        .graph
        .get_node(&node_id)
        .ok_or_else(|| ApiError::NotFound(format!("node {node_id} not found")))?;
    Ok(Json(json!({
        "node": node,
        "renderPack": session.render_packs.get(&node_id),
    })))
}

/// Branches diverging at a node.
pub async fn get_forks(
    State(state): State<Arc<AppState>>,
    Path((id, node)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, &id).await?;
    let session = session.read().await;
    let node_id = NodeId::new(node);
    if session.graph.get_node(&node_id).is_none() {
        return Err(ApiError::NotFound(format!("node {node_id} not found")));
    }
    let fork_ids = session.graph.get_forks_at(&node_id);
    let branches: Vec<_> = session
        .graph
        .get_branch_list()
        .into_iter()
        .filter(|b| fork_ids.contains(&b.id))
        .collect();
    Ok(Json(json!({
        "nodeId": node_id,
        "forks": branches,
    })))
}

/// Changes between the world snapshots of two nodes.
pub async fn get_diff(
    State(state): State<Arc<AppState>>,
    Path((id, from, to)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, &id).await?;
    let session = session.read().await;
    let from = NodeId::new(from);
    let to = NodeId::new(to);
    let changes = session.graph.diff(&from, &to)?;
    Ok(Json(json!({
        "from": from,
        "to": to,
        "changes": changes,
    })))
}

/// The render pack of a node.
pub async fn get_render_pack(
    State(state): State<Arc<AppState>>,
    Path((id, node)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = find_session(&state, &id).await?;
    let session = session.read().await;
    let node_id = NodeId::new(node);
    let pack = session
        .render_packs
        .get(&node_id)
        .ok_or_else(|| ApiError::NotFound(format!("render pack for node {node_id} not found")))?;
    Ok(Json(pack.clone()))
}

// ---------------------------------------------------------------------------
// POST /api/sessions/{id}/fork
// ---------------------------------------------------------------------------

/// Execute a fork and announce it to `WebSocket` subscribers.
pub async fn fork(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = parse_session_id(&id)?;
    let request: ForkBody = parse_body(&body)?;

    let outcome = state
        .fork_pipeline()
        .execute(session_id, &request.parent_node_id, &request.description)
        .await?;

    let notice = ForkBroadcast::from_outcome(session_id, request.parent_node_id, &outcome);
    let receivers = state.broadcast(&notice);
    info!(
        session_id = %session_id,
        branch_id = %outcome.branch_id,
        receivers,
        "fork broadcast"
    );

    Ok((StatusCode::CREATED, Json(outcome)))
}

// ---------------------------------------------------------------------------
// POST /api/sessions/{id}/voice
// ---------------------------------------------------------------------------

/// Interpret a transcribed voice command.
pub async fn voice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    find_session(&state, &id).await?;
    let request: VoiceBody = parse_body(&body)?;
    let transcript = request.transcript.trim();
    if transcript.is_empty() {
        return Err(ApiError::Validation(String::from(
            "transcript must not be blank",
        )));
    }

    let assisted = state
        .collaborator
        .parse_voice_command(transcript)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut body = serde_json::to_value(&assisted.value)
        .map_err(|e| ApiError::Internal(format!("JSON error: {e}")))?;
    if let Some(object) = body.as_object_mut() {
        object.insert(String::from("fallbackUsed"), json!(assisted.fallback_used));
    }
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_session_id(s: &str) -> Result<SessionId, ApiError> {
    s.parse::<Uuid>()
        .map(SessionId::from)
        .map_err(|e| ApiError::Validation(format!("invalid session id {s}: {e}")))
}

async fn find_session(state: &AppState, id: &str) -> Result<SessionHandle, ApiError> {
    let session_id = parse_session_id(id)?;
    state
        .store
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("session {session_id} not found")))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("invalid request body: {e}")))
}
