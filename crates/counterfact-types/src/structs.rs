//! Core entity structs for the Counterfact simulation.
//!
//! Covers the contents of a world snapshot (`Entity`, `Fact`), event
//! descriptions, branch quality scores, render packs, and the lightweight
//! projections served to timeline views.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::enums::{ChangeKind, FactKind, VoiceIntentKind};
use crate::ids::{BranchId, NodeId, RenderPackId};

// ---------------------------------------------------------------------------
// World contents
// ---------------------------------------------------------------------------

/// An actor or object tracked by a world snapshot (a nation, a leader, a
/// fleet, a weapons programme).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Entity {
    /// Broad classification (e.g. `nation`, `person`).
    #[serde(rename = "type", default)]
    pub entity_type: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Current status (e.g. `aggressive`, `surrendered`).
    #[serde(default)]
    pub status: String,
    /// Free-form nested attributes.
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl Entity {
    /// Placeholder type given to entities synthesized by a delta.
    pub const PLACEHOLDER_TYPE: &'static str = "unknown";

    /// Placeholder status given to entities synthesized by a delta.
    pub const PLACEHOLDER_STATUS: &'static str = "active";

    /// Build the placeholder entity used when a delta addresses an unknown id.
    pub fn placeholder(entity_id: &str) -> Self {
        Self {
            entity_type: String::from(Self::PLACEHOLDER_TYPE),
            name: entity_id.to_owned(),
            status: String::from(Self::PLACEHOLDER_STATUS),
            properties: BTreeMap::new(),
        }
    }
}

/// A statement about the world with a confidence level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Fact {
    /// Hard (settled) or soft (revisable).
    #[serde(rename = "type", default)]
    pub kind: FactKind,
    /// The statement itself.
    #[serde(default)]
    pub statement: String,
    /// Confidence from 0 to 100. Out-of-range input is clamped.
    #[serde(default = "default_confidence", deserialize_with = "clamped_confidence")]
    pub confidence: u8,
}

/// Confidence assigned to facts created from a bare statement.
pub const DEFAULT_FACT_CONFIDENCE: u8 = 50;

const fn default_confidence() -> u8 {
    DEFAULT_FACT_CONFIDENCE
}

fn clamped_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(u8::try_from(raw.clamp(0, 100)).unwrap_or(DEFAULT_FACT_CONFIDENCE))
}

impl Fact {
    /// Create a soft fact with the default confidence.
    pub fn soft(statement: impl Into<String>) -> Self {
        Self {
            kind: FactKind::Soft,
            statement: statement.into(),
            confidence: DEFAULT_FACT_CONFIDENCE,
        }
    }

    /// Create a hard fact with the given confidence (capped at 100).
    pub fn hard(statement: impl Into<String>, confidence: u8) -> Self {
        Self {
            kind: FactKind::Hard,
            statement: statement.into(),
            confidence: confidence.min(100),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Human-readable description of a historical event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EventSpec {
    /// Short headline.
    pub title: String,
    /// One or two sentences describing the event.
    #[serde(default)]
    pub description: String,
    /// Coarse category (`military`, `political`, `technology`, ...).
    #[serde(default)]
    pub category: String,
}

/// Quality scores attached to a branch by the delta-producing collaborator.
///
/// Carried verbatim; the simulation never judges plausibility itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct BranchScores {
    /// How believable the divergence is (0-100).
    pub plausibility: u8,
    /// How well the ripple events follow from the fork (0-100).
    pub coherence: u8,
    /// How far the branch departs from the mainline (0-100).
    pub novelty: u8,
}

impl BranchScores {
    /// Whether every score lies within 0-100.
    pub const fn in_range(&self) -> bool {
        self.plausibility <= 100 && self.coherence <= 100 && self.novelty <= 100
    }
}

// ---------------------------------------------------------------------------
// Render packs
// ---------------------------------------------------------------------------

/// Pre-generated narration and media looked up by content key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PregeneratedContent {
    /// Narration prose.
    #[serde(default)]
    pub narration_text: Option<String>,
    /// URL of a narrated audio file.
    #[serde(default)]
    pub audio_url: Option<String>,
    /// URL of the anchor image for the event.
    #[serde(default)]
    pub anchor_image_url: Option<String>,
}

/// Bundle of narration and media artifacts associated 1:1 with an event node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct RenderPack {
    /// Pack identifier (referenced by the node's `renderPackId`).
    pub id: RenderPackId,
    /// The node this pack renders.
    pub event_node_id: NodeId,
    /// Content key used to look up pre-generated artifacts, if any.
    pub content_key: Option<String>,
    /// Narration prose.
    pub narration_text: Option<String>,
    /// URL of a narrated audio file.
    pub audio_url: Option<String>,
    /// URL of the anchor image.
    pub anchor_image_url: Option<String>,
    /// Prompt for an image generator, when no image exists yet.
    pub image_prompt: Option<String>,
    /// Prompt for a video generator.
    pub video_prompt: Option<String>,
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// Lightweight projection of an event node used in timeline listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TimelineEntry {
    /// Node id.
    pub id: NodeId,
    /// Event headline.
    pub title: String,
    /// Event description.
    pub description: String,
    /// In-world date of the event.
    pub timestamp: NaiveDate,
    /// Event category.
    pub category: String,
    /// Whether the node was created directly by a user fork.
    pub is_user_fork: bool,
    /// Branch the node belongs to.
    pub branch_id: BranchId,
}

/// Summary of a branch as listed by the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct BranchSummary {
    /// Branch id.
    pub id: BranchId,
    /// Display name.
    pub name: String,
    /// Latest node on the branch.
    pub head_node_id: Option<NodeId>,
    /// Node the branch diverges from (`None` for the mainline).
    pub fork_point_id: Option<NodeId>,
}

/// One difference between two world snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StateChange {
    /// What kind of difference this is.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Entity id, fact id, or causal variable name.
    pub key: String,
    /// The entity field that differs (`status`, `properties.<key>`, ...).
    pub field: Option<String>,
    /// Value in the older snapshot (`null` when added).
    pub from: Value,
    /// Value in the newer snapshot (`null` when removed).
    pub to: Value,
}

/// Interpretation of a spoken command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct VoiceIntent {
    /// What the command asks for.
    pub intent: VoiceIntentKind,
    /// Change description (fork) or destination description (navigate).
    #[serde(default)]
    pub description: String,
    /// Explicit target node, when the transcript names one.
    #[serde(default)]
    pub target_node_id: Option<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_accepts_partial_json() {
        let entity: Entity =
            serde_json::from_value(serde_json::json!({"status": "aggressive"}))
                .unwrap_or_default();
        assert_eq!(entity.status, "aggressive");
        assert!(entity.entity_type.is_empty());
        assert!(entity.properties.is_empty());
    }

    #[test]
    fn fact_defaults_when_fields_missing() {
        let fact: Result<Fact, _> =
            serde_json::from_value(serde_json::json!({"statement": "Paris holds"}));
        let fact = fact.ok();
        assert_eq!(fact.as_ref().map(|f| f.kind), Some(FactKind::Soft));
        assert_eq!(fact.map(|f| f.confidence), Some(DEFAULT_FACT_CONFIDENCE));
    }

    #[test]
    fn placeholder_entity_uses_id_as_name() {
        let entity = Entity::placeholder("x");
        assert_eq!(entity.name, "x");
        assert_eq!(entity.entity_type, Entity::PLACEHOLDER_TYPE);
    }

    #[test]
    fn scores_range_check() {
        let ok = BranchScores { plausibility: 100, coherence: 0, novelty: 55 };
        let bad = BranchScores { plausibility: 101, coherence: 0, novelty: 55 };
        assert!(ok.in_range());
        assert!(!bad.in_range());
    }
}
