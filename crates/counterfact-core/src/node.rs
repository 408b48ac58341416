//! Event nodes: one point in time on one branch.

use chrono::NaiveDate;
use counterfact_types::{
    BranchId, BranchScores, Delta, EventSpec, NodeId, RenderPackId, TimelineEntry,
};
use counterfact_world::WorldState;
use serde::{Deserialize, Serialize};

/// One point on one branch, owning the world snapshot at that point.
///
/// The serialized form is the full projection served for node inspection;
/// [`EventNode::to_timeline_entry`] is the lightweight one used in timelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNode {
    /// Node id.
    pub id: NodeId,
    /// Parent node, `None` for the mainline root.
    pub parent_id: Option<NodeId>,
    /// Branch this node belongs to.
    pub branch_id: BranchId,
    /// In-world date.
    pub timestamp: NaiveDate,
    /// The event at this point.
    pub event_spec: EventSpec,
    /// The delta that produced `world_state` from the parent's snapshot.
    pub deltas: Option<Delta>,
    /// World snapshot after the event.
    pub world_state: WorldState,
    /// Quality scores, carried on user fork nodes.
    pub branch_priors: Option<BranchScores>,
    /// Back-reference to the node's render pack.
    pub render_pack_id: Option<RenderPackId>,
    /// Ids of nodes whose parent is this node, in insertion order.
    pub children: Vec<NodeId>,
    /// Whether the node was created directly by a user fork.
    pub is_user_fork: bool,
    /// The free-text description the user forked with.
    pub fork_description: Option<String>,
}

impl EventNode {
    /// A mainline node. `parent_id` is `None` for the root.
    pub fn mainline(
        id: NodeId,
        parent_id: Option<NodeId>,
        timestamp: NaiveDate,
        event_spec: EventSpec,
        deltas: Option<Delta>,
        world_state: WorldState,
    ) -> Self {
        Self {
            id,
            parent_id,
            branch_id: BranchId::main(),
            timestamp,
            event_spec,
            deltas,
            world_state,
            branch_priors: None,
            render_pack_id: None,
            children: Vec::new(),
            is_user_fork: false,
            fork_description: None,
        }
    }

    /// Whether this node begins its branch (no parent).
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Lightweight projection for timeline listings.
    pub fn to_timeline_entry(&self) -> TimelineEntry {
        TimelineEntry {
            id: self.id.clone(),
            title: self.event_spec.title.clone(),
            description: self.event_spec.description.clone(),
            timestamp: self.timestamp,
            category: self.event_spec.category.clone(),
            is_user_fork: self.is_user_fork,
            branch_id: self.branch_id.clone(),
        }
    }
}
