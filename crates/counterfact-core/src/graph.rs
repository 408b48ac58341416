//! The story graph: every event node and every branch of one session.
//!
//! Nodes are stored in an arena keyed by id and linked through
//! `parent_id` / `children`. A branch is reconstructed by starting at its
//! first node and repeatedly following the one child on the same branch.
//! Write-time checks guarantee there is never more than one such child, so
//! the walk is unambiguous and, because every node has exactly one parent
//! that was inserted before it, finite.
//!
//! [`StoryGraph::fork`] is the only way to create a branch other than the
//! mainline, and it validates the whole chain before touching the graph.

use std::collections::{BTreeMap, BTreeSet};

use counterfact_types::{
    BranchId, BranchSummary, NodeId, RenderPackId, StateChange, TimelineEntry,
};
use serde::Serialize;
use tracing::debug;

use crate::error::GraphError;
use crate::node::EventNode;

/// Display name of the mainline branch.
pub const MAINLINE_NAME: &str = "Mainline";

/// A branch record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Display name.
    pub name: String,
    /// Most recently added node on the branch.
    pub head_node_id: Option<NodeId>,
    /// Node the branch diverges from; `None` for the mainline.
    pub fork_point_id: Option<NodeId>,
}

/// Registry of all nodes and branches of a session.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    nodes: BTreeMap<NodeId, EventNode>,
    branches: BTreeMap<BranchId, Branch>,
}

impl StoryGraph {
    /// An empty graph holding only the (empty) mainline branch record.
    pub fn new() -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(
            BranchId::main(),
            Branch {
                name: String::from(MAINLINE_NAME),
                head_node_id: None,
                fork_point_id: None,
            },
        );
        Self {
            nodes: BTreeMap::new(),
            branches,
        }
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of registered branches, the mainline included.
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Register a node.
    ///
    /// The node is linked under its parent (idempotently) when the parent is
    /// present; otherwise it is registered without linkage. The owning
    /// branch's head advances to the node when the branch is known.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] if the id is taken,
    /// [`GraphError::MainlineRootExists`] for a second root on the mainline,
    /// and [`GraphError::BranchAlreadyExtended`] if the parent already has a
    /// child on the node's branch.
    pub fn add_node(&mut self, node: EventNode) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }

        if node.branch_id.is_main()
            && node.is_root()
            && let Some(root) = self.mainline_root()
        {
            return Err(GraphError::MainlineRootExists(root.id.clone()));
        }

        if let Some(parent_id) = &node.parent_id {
            if let Some(parent) = self.nodes.get(parent_id) {
                if self.next_on_branch(parent, &node.branch_id).is_some() {
                    return Err(GraphError::BranchAlreadyExtended {
                        parent: parent_id.clone(),
                        branch: node.branch_id.clone(),
                    });
                }
            } else {
                debug!(
                    node_id = %node.id,
                    parent_id = %parent_id,
                    "parent not present, registering node without linkage"
                );
            }
        }

        if let Some(parent_id) = &node.parent_id
            && let Some(parent) = self.nodes.get_mut(parent_id)
            && !parent.children.contains(&node.id)
        {
            parent.children.push(node.id.clone());
        }

        match self.branches.get_mut(&node.branch_id) {
            Some(branch) => branch.head_node_id = Some(node.id.clone()),
            None => debug!(
                node_id = %node.id,
                branch_id = %node.branch_id,
                "node registered on a branch with no record"
            ),
        }

        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Look up a node.
    pub fn get_node(&self, id: &NodeId) -> Option<&EventNode> {
        self.nodes.get(id)
    }

    /// Look up a branch record.
    pub fn get_branch_record(&self, id: &BranchId) -> Option<&Branch> {
        self.branches.get(id)
    }

    /// The mainline, root first. Empty when no mainline root exists.
    pub fn get_mainline(&self) -> Vec<&EventNode> {
        self.mainline_root()
            .map_or_else(Vec::new, |root| self.walk(root, &BranchId::main()))
    }

    /// The unique parentless node on the mainline.
    fn mainline_root(&self) -> Option<&EventNode> {
        self.nodes
            .values()
            .find(|node| node.branch_id.is_main() && node.is_root())
    }

    /// The nodes of one branch in order.
    ///
    /// For the mainline this is [`get_mainline`](Self::get_mainline). For any
    /// other branch the walk starts at the fork point's child on that branch.
    /// Empty when the branch or its fork point is unknown.
    pub fn get_branch(&self, id: &BranchId) -> Vec<&EventNode> {
        if id.is_main() {
            return self.get_mainline();
        }
        self.branches
            .get(id)
            .and_then(|branch| branch.fork_point_id.as_ref())
            .and_then(|fork_point| self.nodes.get(fork_point))
            .and_then(|fork_point| self.next_on_branch(fork_point, id))
            .map_or_else(Vec::new, |first| self.walk(first, id))
    }

    /// The timeline a user sees for a branch: the shared history up to and
    /// including the fork point, followed by the branch itself.
    ///
    /// Returns `None` when the branch is unknown.
    pub fn get_timeline(&self, id: &BranchId) -> Option<Vec<TimelineEntry>> {
        let branch = self.branches.get(id)?;
        let mut nodes = match &branch.fork_point_id {
            None => Vec::new(),
            Some(fork_point) => self.ancestry(fork_point),
        };
        nodes.extend(self.get_branch(id));
        Some(nodes.into_iter().map(EventNode::to_timeline_entry).collect())
    }

    /// The node and all its ancestors, root first.
    pub fn ancestry(&self, id: &NodeId) -> Vec<&EventNode> {
        let mut chain = Vec::new();
        let mut cursor = self.nodes.get(id);
        while let Some(node) = cursor {
            chain.push(node);
            cursor = node.parent_id.as_ref().and_then(|p| self.nodes.get(p));
        }
        chain.reverse();
        chain
    }

    /// Ids of branches diverging from the given node.
    pub fn get_forks_at(&self, id: &NodeId) -> Vec<BranchId> {
        self.branches
            .iter()
            .filter(|(_, branch)| branch.fork_point_id.as_ref() == Some(id))
            .map(|(branch_id, _)| branch_id.clone())
            .collect()
    }

    /// Create a branch diverging at `parent_id` and add its nodes.
    ///
    /// `fork_node` must be a child of `parent_id` on `branch_id`, and each
    /// ripple node must be a child of the node before it on the same branch.
    /// Everything is validated before the graph changes, so a rejected fork
    /// leaves the graph untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] for an unknown parent,
    /// [`GraphError::BranchExists`] if the branch id is taken,
    /// [`GraphError::DuplicateNode`] if any node id is taken or repeated, and
    /// [`GraphError::BrokenChain`] if the nodes do not form a strict chain.
    pub fn fork(
        &mut self,
        parent_id: &NodeId,
        branch_id: BranchId,
        fork_node: EventNode,
        ripple_nodes: Vec<EventNode>,
    ) -> Result<(), GraphError> {
        if !self.nodes.contains_key(parent_id) {
            return Err(GraphError::NodeNotFound(parent_id.clone()));
        }
        if self.branches.contains_key(&branch_id) {
            return Err(GraphError::BranchExists(branch_id));
        }

        let chain: Vec<EventNode> = std::iter::once(fork_node).chain(ripple_nodes).collect();
        let mut seen = BTreeSet::new();
        let mut expected_parent = parent_id;
        for node in &chain {
            if self.nodes.contains_key(&node.id) || !seen.insert(&node.id) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
            if node.branch_id != branch_id || node.parent_id.as_ref() != Some(expected_parent) {
                return Err(GraphError::BrokenChain(node.id.clone()));
            }
            expected_parent = &node.id;
        }

        let name = chain
            .first()
            .map_or_else(|| branch_id.to_string(), |n| n.event_spec.title.clone());
        self.branches.insert(
            branch_id,
            Branch {
                name,
                head_node_id: None,
                fork_point_id: Some(parent_id.clone()),
            },
        );
        for node in chain {
            self.add_node(node)?;
        }
        Ok(())
    }

    /// Summaries of every branch.
    pub fn get_branch_list(&self) -> Vec<BranchSummary> {
        self.branches
            .iter()
            .map(|(id, branch)| BranchSummary {
                id: id.clone(),
                name: branch.name.clone(),
                head_node_id: branch.head_node_id.clone(),
                fork_point_id: branch.fork_point_id.clone(),
            })
            .collect()
    }

    /// Record the render pack of a node.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn attach_render_pack(
        &mut self,
        id: &NodeId,
        pack_id: RenderPackId,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        node.render_pack_id = Some(pack_id);
        Ok(())
    }

    /// Differences between the world snapshots of two nodes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if either node does not exist.
    pub fn diff(&self, from: &NodeId, to: &NodeId) -> Result<Vec<StateChange>, GraphError> {
        let before = self
            .nodes
            .get(from)
            .ok_or_else(|| GraphError::NodeNotFound(from.clone()))?;
        let after = self
            .nodes
            .get(to)
            .ok_or_else(|| GraphError::NodeNotFound(to.clone()))?;
        Ok(before.world_state.diff(&after.world_state))
    }

    fn next_on_branch(&self, node: &EventNode, branch: &BranchId) -> Option<&EventNode> {
        node.children
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .find(|child| &child.branch_id == branch)
    }

    fn walk<'a>(&'a self, start: &'a EventNode, branch: &BranchId) -> Vec<&'a EventNode> {
        let mut nodes = vec![start];
        let mut cursor = start;
        while let Some(next) = self.next_on_branch(cursor, branch) {
            nodes.push(next);
            cursor = next;
        }
        nodes
    }
}

impl Default for StoryGraph {
    fn default() -> Self {
        Self::new()
    }
}
