//! Scenario seed documents.
//!
//! A scenario describes the mainline of a simulation (initial world state
//! plus an ordered list of historical events) and a catalog of
//! pre-generated branches the deterministic collaborator can serve without
//! a reasoning backend.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::delta::{ContinuationEvent, Delta, ForkDelta};
use crate::enums::CausalVar;
use crate::ids::NodeId;
use crate::structs::{BranchScores, Entity, EventSpec, Fact};

/// Plain (unvalidated) world snapshot contents.
///
/// Causal variables may be partial or out of range here; constructing a
/// world state from a seed fills defaults and clamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct WorldSeed {
    /// Entities by id.
    #[serde(default)]
    pub entities: BTreeMap<String, Entity>,
    /// Facts by id.
    #[serde(default)]
    pub facts: BTreeMap<String, Fact>,
    /// Causal variable values.
    #[serde(default)]
    pub causal_vars: BTreeMap<CausalVar, i64>,
}

/// One mainline event in a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SeedEvent {
    /// Node id for the event (conventionally `main-<index>`).
    pub id: NodeId,
    /// In-world date.
    pub timestamp: NaiveDate,
    /// The event.
    pub event_spec: EventSpec,
    /// Changes relative to the previous mainline event.
    #[serde(default)]
    pub delta: Delta,
}

/// A pre-generated alternate branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CatalogBranch {
    /// Keywords matched case-insensitively against a fork description.
    pub keywords: Vec<String>,
    /// The fork event and its changes.
    pub delta: ForkDelta,
    /// The ripple events.
    #[serde(default)]
    pub continuation_events: Vec<ContinuationEvent>,
    /// Quality scores for the branch.
    #[serde(default)]
    pub branch_scores: BranchScores,
}

/// Pre-generated branches available at one mainline event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CatalogEntry {
    /// Mainline index of the fork point.
    pub event_index: usize,
    /// Branches, in catalog order.
    pub branches: Vec<CatalogBranch>,
}

/// A complete scenario seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Scenario {
    /// Scenario title.
    pub title: String,
    /// Scenario summary.
    #[serde(default)]
    pub description: String,
    /// World state before the first event's delta.
    #[serde(default)]
    pub initial_state: WorldSeed,
    /// Mainline events, in chronological order.
    pub events: Vec<SeedEvent>,
    /// Pre-generated branches.
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

/// Content key of a mainline node's pre-generated artifacts.
pub fn mainline_content_key(event_index: usize) -> String {
    format!("main-{event_index}")
}

/// Content key of a catalog branch's fork node.
pub fn branch_content_key(event_index: usize, branch_index: usize) -> String {
    format!("branch-{event_index}-{branch_index}")
}

/// Content key of a ripple node, derived from its branch's content key.
pub fn continuation_content_key(branch_key: &str, continuation_index: usize) -> String {
    format!("{branch_key}-cont-{continuation_index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_keys_follow_naming_scheme() {
        assert_eq!(mainline_content_key(4), "main-4");
        let key = branch_content_key(2, 1);
        assert_eq!(key, "branch-2-1");
        assert_eq!(continuation_content_key(&key, 0), "branch-2-1-cont-0");
    }

    #[test]
    fn world_seed_reads_camel_case() {
        let seed: Result<WorldSeed, _> = serde_json::from_value(serde_json::json!({
            "entities": {"germany": {"status": "aggressive"}},
            "causalVars": {"escalation": 60, "techLevel": 40}
        }));
        let seed = seed.unwrap_or_default();
        assert_eq!(seed.causal_vars.get(&CausalVar::Escalation), Some(&60));
        assert_eq!(seed.causal_vars.get(&CausalVar::TechLevel), Some(&40));
        assert!(seed.entities.contains_key("germany"));
    }
}
