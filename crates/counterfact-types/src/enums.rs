//! Enumeration types for the Counterfact simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Causal variables
// ---------------------------------------------------------------------------

/// A bounded (0-100) scalar summarizing aggregate world pressure.
///
/// The set is closed: a world state always carries exactly these five
/// variables, and deltas naming any other variable are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum CausalVar {
    /// Intensity of open conflict.
    Escalation,
    /// Supply and transport capacity.
    Logistics,
    /// Quality of information available to decision-makers.
    Intelligence,
    /// Collective will of the populations involved.
    Morale,
    /// Technological sophistication.
    TechLevel,
}

impl CausalVar {
    /// Every causal variable, in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Escalation,
        Self::Logistics,
        Self::Intelligence,
        Self::Morale,
        Self::TechLevel,
    ];

    /// Value assigned to a variable the caller did not set.
    pub const DEFAULT_VALUE: u8 = 50;

    /// Upper bound of every causal variable.
    pub const MAX_VALUE: u8 = 100;

    /// The wire name of the variable.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Escalation => "escalation",
            Self::Logistics => "logistics",
            Self::Intelligence => "intelligence",
            Self::Morale => "morale",
            Self::TechLevel => "techLevel",
        }
    }

    /// Look a variable up by its wire name. Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|var| var.as_str() == name)
    }
}

impl core::fmt::Display for CausalVar {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

/// Whether a fact is settled history or a contestable assertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum FactKind {
    /// Established, load-bearing fact.
    Hard,
    /// Soft, revisable fact.
    #[default]
    Soft,
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// The kind of difference reported by a world-state diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ChangeKind {
    /// An entity present only in the newer state.
    EntityAdded,
    /// An entity present only in the older state.
    EntityRemoved,
    /// A field of an entity (or a `properties.*` key) differs.
    EntityChanged,
    /// A fact present only in the newer state.
    FactAdded,
    /// A fact present only in the older state.
    FactRemoved,
    /// A fact whose content differs.
    FactChanged,
    /// A causal variable whose value differs.
    CausalVarChanged,
}

// ---------------------------------------------------------------------------
// Voice intents
// ---------------------------------------------------------------------------

/// What a spoken command asks the simulation to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum VoiceIntentKind {
    /// Create a new branch from a change description.
    Fork,
    /// Move the viewer to another node.
    Navigate,
    /// The transcript could not be interpreted.
    #[default]
    Unknown,
}
