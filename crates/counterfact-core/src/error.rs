//! Error types for the story graph, collaborators, sessions, and the fork
//! pipeline.
//!
//! The taxonomy has four classes. Not-found conditions and validation
//! failures surface to the caller. Collaborator failures are absorbed by
//! [`Resilient`](crate::collaborator::Resilient). An unrecoverable error
//! means the deterministic fallback itself failed.

use counterfact_types::{BranchId, NodeId, SessionId};

/// Errors raised by [`StoryGraph`](crate::graph::StoryGraph) mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A referenced node does not exist.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// A referenced branch does not exist.
    #[error("branch {0} not found")]
    BranchNotFound(BranchId),

    /// A node with the same id is already registered.
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    /// A branch with the same id is already registered.
    #[error("branch {0} already exists")]
    BranchExists(BranchId),

    /// The parent already has a child on the same branch.
    #[error("node {parent} already has a child on branch {branch}")]
    BranchAlreadyExtended {
        /// The parent node.
        parent: NodeId,
        /// The branch that would gain a second child.
        branch: BranchId,
    },

    /// The mainline already has a root node.
    #[error("mainline already has root {0}")]
    MainlineRootExists(NodeId),

    /// Fork and ripple nodes do not form a strict chain on the new branch.
    #[error("node {0} does not continue the fork chain")]
    BrokenChain(NodeId),
}

/// Failures of a single collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The backend errored (transport, HTTP status, timeout).
    #[error("collaborator backend error: {0}")]
    Backend(String),

    /// The backend answered, but the answer did not satisfy the contract.
    #[error("malformed collaborator output: {0}")]
    Malformed(String),

    /// The capability is not available from this collaborator.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by [`SessionStore`](crate::session::SessionStore)
/// operations that address a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No session with this id.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The session's graph rejected the change.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors surfaced by the fork pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ForkError {
    /// No session with this id.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The parent node does not exist in the session's graph.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// The request was rejected before reaching the pipeline.
    #[error("invalid fork request: {0}")]
    InvalidRequest(String),

    /// The deterministic fallback failed.
    #[error("fork could not be executed: {0}")]
    Unrecoverable(CollaboratorError),

    /// The graph rejected the commit.
    #[error("fork commit rejected: {0}")]
    Graph(#[from] GraphError),

    /// A synthesized ripple timestamp fell outside the calendar.
    #[error("ripple timestamp out of range")]
    TimestampOverflow,
}

impl From<StoreError> for ForkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound(id) => Self::SessionNotFound(id),
            StoreError::Graph(e) => Self::Graph(e),
        }
    }
}

/// Errors loading a scenario seed.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// The scenario file could not be read.
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    /// The scenario is not valid YAML or does not match the schema.
    #[error("failed to parse scenario YAML: {0}")]
    Yaml(#[from] serde_yml::Error),

    /// The scenario has no mainline events.
    #[error("scenario has no events")]
    Empty,

    /// The mainline could not be assembled into a graph.
    #[error("scenario graph is invalid: {0}")]
    Graph(#[from] GraphError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_fork_errors() {
        let id = SessionId::new();
        assert!(matches!(
            ForkError::from(StoreError::SessionNotFound(id)),
            ForkError::SessionNotFound(got) if got == id
        ));
        let graph = GraphError::NodeNotFound(NodeId::new("main-9"));
        assert!(matches!(
            ForkError::from(StoreError::Graph(graph)),
            ForkError::Graph(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn messages_name_the_subject() {
        let err = GraphError::BranchAlreadyExtended {
            parent: NodeId::new("main-2"),
            branch: BranchId::main(),
        };
        assert_eq!(
            err.to_string(),
            "node main-2 already has a child on branch main"
        );
    }
}
