//! Shared application state for the session API server.
//!
//! [`AppState`] owns the process-wide session store, the resilient
//! collaborator, the pre-generated content cache, and the broadcast channel
//! that announces committed forks to `WebSocket` clients.

use chrono::{DateTime, Utc};
use counterfact_core::collaborator::Resilient;
use counterfact_core::content::ContentCache;
use counterfact_core::fallback::DeterministicCollaborator;
use counterfact_core::fork::{ForkOutcome, ForkPipeline};
use counterfact_core::session::SessionStore;
use counterfact_runner::LlmCollaborator;
use counterfact_types::{BranchId, NodeId, SessionId};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel for fork notifications.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// The collaborator the server runs with: the LLM when configured, the
/// deterministic collaborator always.
pub type ServerCollaborator = Resilient<LlmCollaborator, DeterministicCollaborator>;

/// JSON-serializable notice of a committed fork, pushed over the `WebSocket`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkBroadcast {
    /// Session the fork was committed in.
    pub session_id: SessionId,
    /// The new branch.
    pub branch_id: BranchId,
    /// The node the branch diverges from.
    pub parent_id: NodeId,
    /// The user fork node.
    pub fork_node_id: NodeId,
    /// Title of the fork event.
    pub title: String,
    /// Number of ripple nodes.
    pub ripple_count: usize,
    /// Whether the deterministic fallback answered any step.
    pub fallback_used: bool,
    /// When the fork was committed.
    pub committed_at: DateTime<Utc>,
}

impl ForkBroadcast {
    /// Summarise a committed fork.
    pub fn from_outcome(session_id: SessionId, parent_id: NodeId, outcome: &ForkOutcome) -> Self {
        Self {
            session_id,
            branch_id: outcome.branch_id.clone(),
            parent_id,
            fork_node_id: outcome.fork_node.id.clone(),
            title: outcome.fork_node.event_spec.title.clone(),
            ripple_count: outcome.ripple_nodes.len(),
            fallback_used: outcome.fallback_used,
            committed_at: Utc::now(),
        }
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. Sessions lock individually inside the store, so the state
/// itself needs no lock.
#[derive(Debug)]
pub struct AppState {
    /// Broadcast sender for fork notifications.
    pub tx: broadcast::Sender<ForkBroadcast>,
    /// Live sessions.
    pub store: SessionStore,
    /// Primary-with-fallback collaborator.
    pub collaborator: ServerCollaborator,
    /// Pre-generated narration and media.
    pub content: ContentCache,
}

impl AppState {
    /// Create application state with an empty session store.
    pub fn new(collaborator: ServerCollaborator, content: ContentCache) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            store: SessionStore::new(),
            collaborator,
            content,
        }
    }

    /// Application state backed by the deterministic collaborator alone.
    pub fn deterministic(fallback: DeterministicCollaborator, content: ContentCache) -> Self {
        Self::new(Resilient::fallback_only(fallback), content)
    }

    /// A fork pipeline over this state.
    pub const fn fork_pipeline(
        &self,
    ) -> ForkPipeline<'_, LlmCollaborator, DeterministicCollaborator> {
        ForkPipeline::new(&self.store, &self.collaborator, &self.content)
    }

    /// Subscribe to the fork broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<ForkBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a fork notification to all connected clients.
    ///
    /// Returns the number of receivers that received the message, 0 when no
    /// clients are connected.
    pub fn broadcast(&self, notice: &ForkBroadcast) -> usize {
        self.tx.send(notice.clone()).unwrap_or(0)
    }
}
