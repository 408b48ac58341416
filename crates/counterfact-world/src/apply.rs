//! Application of individual delta changes to the copied snapshot maps.
//!
//! These functions operate on the private working copies built inside
//! [`WorldState::apply_delta`](crate::WorldState::apply_delta); they are
//! never exposed on a live snapshot.

use std::collections::BTreeMap;

use counterfact_types::{CausalVar, CausalVarChange, Entity, EntityChange, Fact, FactChange};
use serde_json::Value;
use tracing::debug;

use crate::state::clamp_var;

/// Prefix addressing a single key inside an entity's `properties` map.
const PROPERTIES_PREFIX: &str = "properties.";

/// Apply one entity change, synthesizing a placeholder entity for unknown ids.
pub(crate) fn entity_change(entities: &mut BTreeMap<String, Entity>, change: &EntityChange) {
    let entity = entities
        .entry(change.entity_id.clone())
        .or_insert_with(|| Entity::placeholder(&change.entity_id));

    match change.field.as_str() {
        "type" => entity.entity_type = value_as_text(&change.new_value),
        "name" => entity.name = value_as_text(&change.new_value),
        "status" => entity.status = value_as_text(&change.new_value),
        "properties" => {
            if let Value::Object(map) = &change.new_value {
                for (key, value) in map {
                    entity.properties.insert(key.clone(), value.clone());
                }
            } else {
                debug!(
                    entity_id = change.entity_id,
                    "ignoring non-object value for properties merge"
                );
            }
        }
        field => {
            // Anything else lands in `properties`: either an explicit
            // `properties.<key>` path or an ad-hoc top-level attribute.
            let key = field.strip_prefix(PROPERTIES_PREFIX).unwrap_or(field);
            entity
                .properties
                .insert(key.to_owned(), change.new_value.clone());
        }
    }
}

/// Apply one fact change.
pub(crate) fn fact_change(facts: &mut BTreeMap<String, Fact>, change: &FactChange) {
    match &change.new_value {
        Value::Null => {
            facts.remove(&change.fact_id);
        }
        Value::Object(_) => match serde_json::from_value::<Fact>(change.new_value.clone()) {
            Ok(fact) => {
                facts.insert(change.fact_id.clone(), fact);
            }
            Err(e) => {
                debug!(
                    fact_id = change.fact_id,
                    error = %e,
                    "ignoring malformed fact object"
                );
            }
        },
        other => {
            let statement = value_as_text(other);
            match facts.get_mut(&change.fact_id) {
                Some(fact) => fact.statement = statement,
                None => {
                    facts.insert(change.fact_id.clone(), Fact::soft(statement));
                }
            }
        }
    }
}

/// Apply one causal variable change. Unknown variable names are ignored.
pub(crate) fn causal_var_change(vars: &mut BTreeMap<CausalVar, u8>, change: &CausalVarChange) {
    let Some(var) = CausalVar::from_name(&change.var_name) else {
        debug!(var_name = change.var_name, "ignoring unknown causal variable");
        return;
    };
    if let Some(value) = vars.get_mut(&var) {
        *value = clamp_var(i64::from(*value).saturating_add(change.delta));
    }
}

/// Render a JSON value as plain text: strings unquoted, `null` empty.
fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
