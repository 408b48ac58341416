//! The fork pipeline: turn (session, parent node, description) into a
//! committed branch.
//!
//! The pipeline is a straight sequence of awaited steps:
//!
//! 1. Resolve the session and the parent node.
//! 2. Collect up to two mainline events after the parent as context.
//! 3. Ask the collaborator for a fork proposal.
//! 4. Generate a fresh branch id.
//! 5. Apply the fork delta to the parent's world state.
//! 6. Fold the continuation deltas into a chain of ripple nodes.
//! 7. Produce a render pack per new node.
//! 8. Commit the nodes through [`StoryGraph::fork`](crate::graph::StoryGraph::fork)
//!    and store their packs under the same lock.
//!
//! Nothing is visible to readers until step 8, and a failure in any earlier
//! step leaves the session untouched. The session lock is never held across
//! a collaborator call.

use chrono::{Days, NaiveDate};
use counterfact_types::{
    BranchId, BranchScores, ContinuationEvent, EventSpec, NodeId, RenderPack, RenderPackId,
    SessionId, continuation_content_key,
};
use counterfact_world::WorldState;
use serde::Serialize;
use tracing::{debug, info};

use crate::collaborator::{Collaborator, ForkRequest, NarrationRequest, Resilient};
use crate::content::ContentCache;
use crate::error::ForkError;
use crate::node::EventNode;
use crate::session::SessionStore;

/// Days between synthesized ripple timestamps.
pub const RIPPLE_SPACING_DAYS: u64 = 90;

/// Mainline events passed to the collaborator as context.
const UPCOMING_CONTEXT: usize = 2;

/// Everything a committed fork produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkOutcome {
    /// The new branch.
    pub branch_id: BranchId,
    /// The user fork node.
    pub fork_node: EventNode,
    /// Ripple nodes, in order.
    pub ripple_nodes: Vec<EventNode>,
    /// One render pack per new node, fork node first.
    pub render_packs: Vec<RenderPack>,
    /// Scores the collaborator gave the branch.
    pub branch_scores: BranchScores,
    /// Whether any step was answered by the deterministic fallback.
    pub fallback_used: bool,
}

/// What the pipeline needs from the parent node, copied out of the session
/// so no lock is held while the collaborator works.
struct ForkContext {
    parent: EventNode,
    upcoming_events: Vec<EventSpec>,
    event_index: Option<usize>,
}

/// Executes forks against a session store.
#[derive(Debug)]
pub struct ForkPipeline<'a, P, F> {
    store: &'a SessionStore,
    collaborator: &'a Resilient<P, F>,
    content: &'a ContentCache,
}

impl<'a, P: Collaborator, F: Collaborator> ForkPipeline<'a, P, F> {
    /// A pipeline over the given store, collaborator, and content cache.
    pub const fn new(
        store: &'a SessionStore,
        collaborator: &'a Resilient<P, F>,
        content: &'a ContentCache,
    ) -> Self {
        Self {
            store,
            collaborator,
            content,
        }
    }

    /// Fork `parent_id` in session `session_id` with a free-text description.
    ///
    /// # Errors
    ///
    /// - [`ForkError::InvalidRequest`] for a blank description.
    /// - [`ForkError::SessionNotFound`] / [`ForkError::NodeNotFound`] when
    ///   the session or parent is missing.
    /// - [`ForkError::Unrecoverable`] if the fallback collaborator fails.
    /// - [`ForkError::TimestampOverflow`] if a ripple date cannot be
    ///   synthesized.
    /// - [`ForkError::Graph`] if the commit is rejected.
    pub async fn execute(
        &self,
        session_id: SessionId,
        parent_id: &NodeId,
        description: &str,
    ) -> Result<ForkOutcome, ForkError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ForkError::InvalidRequest(String::from(
                "fork description must not be blank",
            )));
        }

        let context = self.resolve(session_id, parent_id).await?;
        let request = ForkRequest {
            world_state: context.parent.world_state.clone(),
            description: description.to_owned(),
            upcoming_events: context.upcoming_events,
            event_index: context.event_index,
        };
        let assisted = self
            .collaborator
            .execute_fork(&request)
            .await
            .map_err(ForkError::Unrecoverable)?;
        let mut fallback_used = assisted.fallback_used;
        let proposal = assisted.value;

        let branch_id = BranchId::generate();
        let parent = context.parent;
        let mut fork_node = EventNode {
            id: NodeId::generate(),
            parent_id: Some(parent.id.clone()),
            branch_id: branch_id.clone(),
            timestamp: parent.timestamp,
            event_spec: proposal.delta.event_spec,
            world_state: parent
                .world_state
                .apply_delta(Some(&proposal.delta.changes))
                .into_owned(),
            deltas: Some(proposal.delta.changes),
            branch_priors: Some(proposal.branch_scores),
            render_pack_id: None,
            children: Vec::new(),
            is_user_fork: true,
            fork_description: Some(description.to_owned()),
        };
        let mut ripple_nodes = fold_ripples(
            &fork_node,
            parent.timestamp,
            proposal.continuation_events,
        )?;

        let mut render_packs = Vec::with_capacity(ripple_nodes.len().saturating_add(1));
        let new_nodes = std::iter::once(&mut fork_node).chain(ripple_nodes.iter_mut());
        for (position, node) in new_nodes.enumerate() {
            let content_key = proposal.content_key.as_deref().map(|key| {
                position
                    .checked_sub(1)
                    .map_or_else(|| key.to_owned(), |i| continuation_content_key(key, i))
            });
            let (pack, pack_fallback) = self.render_pack(node, content_key).await?;
            fallback_used |= pack_fallback;
            node.render_pack_id = Some(pack.id);
            render_packs.push(pack);
        }

        {
            let handle = self
                .store
                .get(session_id)
                .await
                .ok_or(ForkError::SessionNotFound(session_id))?;
            let mut session = handle.write().await;
            session.graph.fork(
                &parent.id,
                branch_id.clone(),
                fork_node.clone(),
                ripple_nodes.clone(),
            )?;
            for pack in &render_packs {
                session
                    .render_packs
                    .insert(pack.event_node_id.clone(), pack.clone());
            }
        }
        info!(
            session_id = %session_id,
            parent_id = %parent.id,
            branch_id = %branch_id,
            ripples = ripple_nodes.len(),
            fallback_used,
            "fork committed"
        );

        Ok(ForkOutcome {
            branch_id,
            fork_node,
            ripple_nodes,
            render_packs,
            branch_scores: proposal.branch_scores,
            fallback_used,
        })
    }

    /// Step 1 and 2: copy the parent and its mainline context out of the
    /// session.
    async fn resolve(
        &self,
        session_id: SessionId,
        parent_id: &NodeId,
    ) -> Result<ForkContext, ForkError> {
        let handle = self
            .store
            .get(session_id)
            .await
            .ok_or(ForkError::SessionNotFound(session_id))?;
        let session = handle.read().await;
        let parent = session
            .graph
            .get_node(parent_id)
            .ok_or_else(|| ForkError::NodeNotFound(parent_id.clone()))?
            .clone();

        let mainline = session.graph.get_mainline();
        let event_index = mainline.iter().position(|n| n.id == *parent_id);
        let upcoming_events = mainline
            .iter()
            .skip_while(|n| n.id != *parent_id)
            .skip(1)
            .take(UPCOMING_CONTEXT)
            .map(|n| n.event_spec.clone())
            .collect();

        Ok(ForkContext {
            parent,
            upcoming_events,
            event_index,
        })
    }

    /// Step 7 for one node: pre-generated content when the key has it,
    /// collaborator-written narration and prompts otherwise.
    async fn render_pack(
        &self,
        node: &EventNode,
        content_key: Option<String>,
    ) -> Result<(RenderPack, bool), ForkError> {
        let cached = content_key
            .as_deref()
            .and_then(|key| self.content.get(key))
            .cloned()
            .unwrap_or_default();
        let request = NarrationRequest {
            event_spec: node.event_spec.clone(),
            is_branch: true,
            timestamp: node.timestamp,
            world_state: node.world_state.clone(),
        };
        let mut fallback_used = false;

        let narration_text = match cached.narration_text {
            Some(text) => text,
            None => {
                let assisted = self
                    .collaborator
                    .generate_narration(&request)
                    .await
                    .map_err(ForkError::Unrecoverable)?;
                fallback_used |= assisted.fallback_used;
                assisted.value
            }
        };

        let image_prompt = if cached.anchor_image_url.is_some() {
            None
        } else {
            let assisted = self
                .collaborator
                .generate_image_prompt(&request)
                .await
                .map_err(ForkError::Unrecoverable)?;
            fallback_used |= assisted.fallback_used;
            Some(assisted.value)
        };

        let video_prompt = if node.is_user_fork {
            let assisted = self
                .collaborator
                .generate_video_prompt(&request)
                .await
                .map_err(ForkError::Unrecoverable)?;
            fallback_used |= assisted.fallback_used;
            Some(assisted.value)
        } else {
            None
        };

        debug!(node_id = %node.id, content_key = ?content_key, "render pack produced");
        Ok((
            RenderPack {
                id: RenderPackId::new(),
                event_node_id: node.id.clone(),
                content_key,
                narration_text: Some(narration_text),
                audio_url: cached.audio_url,
                anchor_image_url: cached.anchor_image_url,
                image_prompt,
                video_prompt,
            },
            fallback_used,
        ))
    }
}

/// Step 6: each continuation delta applies to the previous node's state.
fn fold_ripples(
    fork_node: &EventNode,
    fork_point_date: NaiveDate,
    continuations: Vec<ContinuationEvent>,
) -> Result<Vec<EventNode>, ForkError> {
    let mut ripples: Vec<EventNode> = Vec::with_capacity(continuations.len());
    for (index, continuation) in continuations.into_iter().enumerate() {
        let previous = ripples.last().unwrap_or(fork_node);
        let timestamp = match continuation.timestamp {
            Some(date) => date,
            None => ripple_date(fork_point_date, index)?,
        };
        let world_state: WorldState = previous
            .world_state
            .apply_delta(Some(&continuation.deltas))
            .into_owned();
        let node = EventNode {
            id: NodeId::generate(),
            parent_id: Some(previous.id.clone()),
            branch_id: previous.branch_id.clone(),
            timestamp,
            event_spec: continuation.event_spec,
            deltas: Some(continuation.deltas),
            world_state,
            branch_priors: None,
            render_pack_id: None,
            children: Vec::new(),
            is_user_fork: false,
            fork_description: None,
        };
        ripples.push(node);
    }
    Ok(ripples)
}

/// Fork-point date plus `90 × (index + 1)` days.
fn ripple_date(fork_point_date: NaiveDate, index: usize) -> Result<NaiveDate, ForkError> {
    u64::try_from(index)
        .ok()
        .and_then(|i| i.checked_add(1))
        .and_then(|n| n.checked_mul(RIPPLE_SPACING_DAYS))
        .and_then(|days| fork_point_date.checked_add_days(Days::new(days)))
        .ok_or(ForkError::TimestampOverflow)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use counterfact_types::{CausalVarChange, Delta};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fork_node() -> EventNode {
        EventNode {
            branch_id: BranchId::new("b"),
            is_user_fork: true,
            ..EventNode::mainline(
                NodeId::new("fork"),
                Some(NodeId::new("main-0")),
                date(1940, 1, 1),
                EventSpec::default(),
                None,
                WorldState::empty(),
            )
        }
    }

    fn continuation(var: &str, delta: i64, timestamp: Option<NaiveDate>) -> ContinuationEvent {
        ContinuationEvent {
            event_spec: EventSpec::default(),
            deltas: Delta {
                causal_var_changes: vec![CausalVarChange {
                    var_name: var.to_owned(),
                    delta,
                }],
                ..Delta::default()
            },
            timestamp,
        }
    }

    #[test]
    fn ripples_form_a_causal_chain() {
        let fork = fork_node();
        let ripples = fold_ripples(
            &fork,
            date(1940, 1, 1),
            vec![
                continuation("morale", 10, None),
                continuation("morale", 5, Some(date(1945, 5, 8))),
            ],
        )
        .unwrap();

        let first = ripples.first().unwrap();
        let second = ripples.get(1).unwrap();
        assert_eq!(first.parent_id.as_ref(), Some(&fork.id));
        assert_eq!(second.parent_id.as_ref(), Some(&first.id));
        assert_eq!(first.branch_id, fork.branch_id);
        assert_eq!(
            first.world_state.causal_var(counterfact_types::CausalVar::Morale),
            60
        );
        assert_eq!(
            second.world_state.causal_var(counterfact_types::CausalVar::Morale),
            65
        );
        assert_eq!(first.timestamp, date(1940, 3, 31));
        assert_eq!(second.timestamp, date(1945, 5, 8));
        assert!(!first.is_user_fork);
        assert!(first.fork_description.is_none());
    }

    #[test]
    fn ripple_dates_are_spaced_from_fork_point() {
        let start = date(1941, 6, 22);
        assert_eq!(ripple_date(start, 0).unwrap(), date(1941, 9, 20));
        assert_eq!(ripple_date(start, 1).unwrap(), date(1941, 12, 19));
        assert!(matches!(
            ripple_date(NaiveDate::MAX, 0),
            Err(ForkError::TimestampOverflow)
        ));
    }
}
