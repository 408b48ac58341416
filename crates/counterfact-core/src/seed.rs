//! Scenario seeds: loading and assembling the mainline graph.

use std::path::Path;

use counterfact_types::{BranchId, Scenario};
use counterfact_world::WorldState;
use tracing::debug;

use crate::error::SeedError;
use crate::graph::StoryGraph;
use crate::node::EventNode;

/// The built-in scenario document (the Second World War).
pub const BUILTIN_SCENARIO: &str = include_str!("../data/ww2.yaml");

/// Parse the built-in scenario.
///
/// # Errors
///
/// Returns [`SeedError`] if the embedded document is invalid.
pub fn builtin_scenario() -> Result<Scenario, SeedError> {
    parse_scenario(BUILTIN_SCENARIO)
}

/// Parse a scenario from YAML.
///
/// # Errors
///
/// Returns [`SeedError::Yaml`] if the document does not parse and
/// [`SeedError::Empty`] if it has no events.
pub fn parse_scenario(yaml: &str) -> Result<Scenario, SeedError> {
    let scenario: Scenario = serde_yml::from_str(yaml)?;
    if scenario.events.is_empty() {
        return Err(SeedError::Empty);
    }
    Ok(scenario)
}

/// Load a scenario file.
///
/// # Errors
///
/// Returns [`SeedError::Io`] if the file cannot be read, otherwise as
/// [`parse_scenario`].
pub fn load_scenario(path: &Path) -> Result<Scenario, SeedError> {
    let contents = std::fs::read_to_string(path)?;
    parse_scenario(&contents)
}

/// Build the mainline graph of a scenario.
///
/// The first event is the root: its delta is applied to the initial state
/// and stored only when non-empty. Every further event is chained on the
/// mainline, its world state derived from its predecessor's.
///
/// # Errors
///
/// Returns [`SeedError::Empty`] if there are no events and
/// [`SeedError::Graph`] if event ids repeat.
pub fn build_graph(scenario: &Scenario) -> Result<StoryGraph, SeedError> {
    if scenario.events.is_empty() {
        return Err(SeedError::Empty);
    }

    let mut graph = StoryGraph::new();
    let mut state = WorldState::from(scenario.initial_state.clone());
    let mut parent = None;

    for event in &scenario.events {
        state = state.apply_delta(Some(&event.delta)).into_owned();
        let deltas = if parent.is_none() && event.delta.is_empty() {
            None
        } else {
            Some(event.delta.clone())
        };
        graph.add_node(EventNode::mainline(
            event.id.clone(),
            parent.replace(event.id.clone()),
            event.timestamp,
            event.event_spec.clone(),
            deltas,
            state.clone(),
        ))?;
    }

    debug!(
        title = %scenario.title,
        nodes = graph.node_count(),
        head = ?graph.get_branch_record(&BranchId::main()).and_then(|b| b.head_node_id.clone()),
        "scenario mainline built"
    );
    Ok(graph)
}
