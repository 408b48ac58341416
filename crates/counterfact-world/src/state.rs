//! The immutable world snapshot.
//!
//! A [`WorldState`] holds three maps: entities, facts, and the five causal
//! variables. Once constructed it is never mutated; [`WorldState::apply_delta`]
//! returns a new instance (or the same one, borrowed, when there is no delta).
//! Fields are private so the only way to obtain a changed state is through
//! the delta algebra, which keeps every causal variable clamped to 0-100.

use std::borrow::Cow;
use std::collections::BTreeMap;

use counterfact_types::{CausalVar, Delta, Entity, Fact, StateChange, WorldSeed};
use serde::{Deserialize, Serialize};

use crate::{apply, diff};

/// Immutable snapshot of entities, facts, and bounded causal variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WorldSeed")]
pub struct WorldState {
    entities: BTreeMap<String, Entity>,
    facts: BTreeMap<String, Fact>,
    causal_vars: BTreeMap<CausalVar, u8>,
}

impl WorldState {
    /// Construct a snapshot from its parts.
    ///
    /// Causal variables missing from `causal_vars` default to
    /// [`CausalVar::DEFAULT_VALUE`]; supplied values are clamped to 0-100.
    /// Construction never fails.
    pub fn new(
        entities: BTreeMap<String, Entity>,
        facts: BTreeMap<String, Fact>,
        causal_vars: &BTreeMap<CausalVar, i64>,
    ) -> Self {
        let causal_vars = CausalVar::ALL
            .into_iter()
            .map(|var| {
                let value = causal_vars
                    .get(&var)
                    .map_or(CausalVar::DEFAULT_VALUE, |v| clamp_var(*v));
                (var, value)
            })
            .collect();

        Self {
            entities,
            facts,
            causal_vars,
        }
    }

    /// An empty snapshot with every causal variable at its default.
    pub fn empty() -> Self {
        Self::new(BTreeMap::new(), BTreeMap::new(), &BTreeMap::new())
    }

    /// All entities by id.
    pub const fn entities(&self) -> &BTreeMap<String, Entity> {
        &self.entities
    }

    /// All facts by id.
    pub const fn facts(&self) -> &BTreeMap<String, Fact> {
        &self.facts
    }

    /// All causal variables.
    pub const fn causal_vars(&self) -> &BTreeMap<CausalVar, u8> {
        &self.causal_vars
    }

    /// Look up a single entity.
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Look up a single fact.
    pub fn fact(&self, id: &str) -> Option<&Fact> {
        self.facts.get(id)
    }

    /// Current value of a causal variable.
    pub fn causal_var(&self, var: CausalVar) -> u8 {
        self.causal_vars
            .get(&var)
            .copied()
            .unwrap_or(CausalVar::DEFAULT_VALUE)
    }

    /// Apply a delta, producing the resulting snapshot.
    ///
    /// Returns `self` (borrowed, the identical instance) when `delta` is
    /// `None`. Otherwise copies the three maps, applies entity changes, then
    /// fact changes, then causal variable changes, and returns the new
    /// snapshot. Deterministic and free of side effects.
    pub fn apply_delta(&self, delta: Option<&Delta>) -> Cow<'_, Self> {
        let Some(delta) = delta else {
            return Cow::Borrowed(self);
        };

        let mut entities = self.entities.clone();
        let mut facts = self.facts.clone();
        let mut causal_vars = self.causal_vars.clone();

        for change in &delta.entity_changes {
            apply::entity_change(&mut entities, change);
        }
        for change in &delta.fact_changes {
            apply::fact_change(&mut facts, change);
        }
        for change in &delta.causal_var_changes {
            apply::causal_var_change(&mut causal_vars, change);
        }

        Cow::Owned(Self {
            entities,
            facts,
            causal_vars,
        })
    }

    /// Every addition, removal, and field-level change from `self` to `other`.
    ///
    /// Entities are compared field by field, including each
    /// `properties.<key>`; facts are compared whole; causal variables by value.
    pub fn diff(&self, other: &Self) -> Vec<StateChange> {
        let mut changes = diff::entities(&self.entities, &other.entities);
        changes.extend(diff::facts(&self.facts, &other.facts));
        changes.extend(diff::causal_vars(&self.causal_vars, &other.causal_vars));
        changes
    }

    /// Plain copy of the snapshot, as handed to collaborators.
    pub fn to_seed(&self) -> WorldSeed {
        WorldSeed {
            entities: self.entities.clone(),
            facts: self.facts.clone(),
            causal_vars: self
                .causal_vars
                .iter()
                .map(|(var, value)| (*var, i64::from(*value)))
                .collect(),
        }
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<WorldSeed> for WorldState {
    fn from(seed: WorldSeed) -> Self {
        Self::new(seed.entities, seed.facts, &seed.causal_vars)
    }
}

/// Clamp an arbitrary integer into the causal variable range.
pub(crate) fn clamp_var(value: i64) -> u8 {
    let clamped = value.clamp(0, i64::from(CausalVar::MAX_VALUE));
    u8::try_from(clamped).unwrap_or(CausalVar::MAX_VALUE)
}
