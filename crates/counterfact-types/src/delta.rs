//! Structured change descriptions and the fork proposal payload.
//!
//! A [`Delta`] is a plain description of change, never a state. The
//! delta-producing collaborator answers a fork request with a
//! [`ForkProposal`]: one delta for the fork event itself, one delta per
//! continuation ("ripple") event, and quality scores for the branch.
//!
//! Field names follow the collaborator wire contract (`entityChanges`,
//! `newValue`, `varName`, ...), hence the camelCase renames.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::structs::{BranchScores, EventSpec};

/// A change to one entity field.
///
/// `field` addresses a top-level attribute (`status`, `name`, `type`), the
/// whole `properties` map (merged shallowly), or a single `properties.<key>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EntityChange {
    /// Target entity. Unknown ids are synthesized with placeholder values.
    pub entity_id: String,
    /// Field path to set.
    pub field: String,
    /// Previous value, informational only.
    #[serde(default)]
    pub old_value: Value,
    /// New value.
    #[serde(default)]
    pub new_value: Value,
}

/// A change to one fact.
///
/// `newValue` semantics: `null` deletes the fact, a string replaces only the
/// statement (or creates a soft fact), an object replaces the fact wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FactChange {
    /// Target fact.
    pub fact_id: String,
    /// Previous value, informational only.
    #[serde(default)]
    pub old_value: Value,
    /// New value.
    #[serde(default)]
    pub new_value: Value,
}

/// A relative change to one causal variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CausalVarChange {
    /// Variable name. Unrecognized names are ignored when applied.
    pub var_name: String,
    /// Signed amount to add before clamping to 0-100.
    pub delta: i64,
}

/// A structured description of changes to apply to a world snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Delta {
    /// Entity changes, applied first.
    #[serde(default)]
    pub entity_changes: Vec<EntityChange>,
    /// Fact changes, applied second.
    #[serde(default)]
    pub fact_changes: Vec<FactChange>,
    /// Causal variable changes, applied last.
    #[serde(default)]
    pub causal_var_changes: Vec<CausalVarChange>,
}

impl Delta {
    /// Whether the delta changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.entity_changes.is_empty()
            && self.fact_changes.is_empty()
            && self.causal_var_changes.is_empty()
    }
}

/// The delta for a fork event together with the event it describes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ForkDelta {
    /// The state changes.
    #[serde(flatten)]
    pub changes: Delta,
    /// The fork event.
    pub event_spec: EventSpec,
}

/// A ripple event that follows the fork on the new branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ContinuationEvent {
    /// The ripple event.
    pub event_spec: EventSpec,
    /// Changes relative to the previous node on the branch.
    #[serde(default)]
    pub deltas: Delta,
    /// In-world date. Synthesized from the fork point when absent.
    #[serde(default)]
    pub timestamp: Option<NaiveDate>,
}

/// Everything the delta-producing collaborator returns for one fork request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ForkProposal {
    /// The fork event and its changes.
    pub delta: ForkDelta,
    /// Ripple events, in causal order.
    #[serde(default)]
    pub continuation_events: Vec<ContinuationEvent>,
    /// Quality scores for the branch.
    #[serde(default)]
    pub branch_scores: BranchScores,
    /// Key of pre-generated narration/image content, if the proposal came
    /// from a precomputed branch.
    #[serde(default)]
    pub content_key: Option<String>,
}

/// Number of continuation events a fork proposal carries.
pub const CONTINUATION_COUNT: usize = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_delta_reads_flat_wire_shape() {
        let json = serde_json::json!({
            "entityChanges": [
                {"entityId": "germany", "field": "status", "oldValue": "aggressive", "newValue": "surrendered"}
            ],
            "causalVarChanges": [{"varName": "escalation", "delta": -15}],
            "eventSpec": {"title": "Germany surrenders", "description": "", "category": "political"}
        });
        let parsed: Result<ForkDelta, _> = serde_json::from_value(json);
        assert!(parsed.is_ok());
        let parsed = parsed.unwrap_or_default();
        assert_eq!(parsed.changes.entity_changes.len(), 1);
        assert!(parsed.changes.fact_changes.is_empty());
        assert_eq!(parsed.changes.causal_var_changes.first().map(|c| c.delta), Some(-15));
        assert_eq!(parsed.event_spec.title, "Germany surrenders");
    }

    #[test]
    fn missing_new_value_is_null() {
        let change: Result<FactChange, _> =
            serde_json::from_value(serde_json::json!({"factId": "f1"}));
        assert_eq!(change.ok().map(|c| c.new_value), Some(Value::Null));
    }

    #[test]
    fn empty_delta_is_empty() {
        assert!(Delta::default().is_empty());
    }
}
