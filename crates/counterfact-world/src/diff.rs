//! Structural diff between two world snapshots.

use std::collections::{BTreeMap, BTreeSet};

use counterfact_types::{CausalVar, ChangeKind, Entity, Fact, StateChange};
use serde_json::Value;

/// Diff two entity maps, reporting nested `properties.*` keys individually.
pub(crate) fn entities(
    before: &BTreeMap<String, Entity>,
    after: &BTreeMap<String, Entity>,
) -> Vec<StateChange> {
    let mut changes = Vec::new();
    let ids: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    for id in ids {
        match (before.get(id), after.get(id)) {
            (Some(old), None) => {
                changes.push(change(ChangeKind::EntityRemoved, id, None, to_json(old), Value::Null));
            }
            (None, Some(new)) => {
                changes.push(change(ChangeKind::EntityAdded, id, None, Value::Null, to_json(new)));
            }
            (Some(old), Some(new)) => entity_fields(id, old, new, &mut changes),
            (None, None) => {}
        }
    }
    changes
}

/// Field-level comparison of one entity present in both snapshots.
fn entity_fields(id: &str, old: &Entity, new: &Entity, changes: &mut Vec<StateChange>) {
    let top_level = [
        ("type", &old.entity_type, &new.entity_type),
        ("name", &old.name, &new.name),
        ("status", &old.status, &new.status),
    ];
    for (field, from, to) in top_level {
        if from != to {
            changes.push(change(
                ChangeKind::EntityChanged,
                id,
                Some(field.to_owned()),
                Value::String(from.clone()),
                Value::String(to.clone()),
            ));
        }
    }

    let keys: BTreeSet<&String> = old.properties.keys().chain(new.properties.keys()).collect();
    for key in keys {
        let from = old.properties.get(key);
        let to = new.properties.get(key);
        if from != to {
            changes.push(change(
                ChangeKind::EntityChanged,
                id,
                Some(format!("properties.{key}")),
                from.cloned().unwrap_or(Value::Null),
                to.cloned().unwrap_or(Value::Null),
            ));
        }
    }
}

/// Diff two fact maps; changed facts are reported whole.
pub(crate) fn facts(
    before: &BTreeMap<String, Fact>,
    after: &BTreeMap<String, Fact>,
) -> Vec<StateChange> {
    let ids: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    ids.into_iter()
        .filter_map(|id| match (before.get(id), after.get(id)) {
            (Some(old), None) => Some(change(
                ChangeKind::FactRemoved,
                id,
                None,
                to_json(old),
                Value::Null,
            )),
            (None, Some(new)) => Some(change(
                ChangeKind::FactAdded,
                id,
                None,
                Value::Null,
                to_json(new),
            )),
            (Some(old), Some(new)) if old != new => Some(change(
                ChangeKind::FactChanged,
                id,
                None,
                to_json(old),
                to_json(new),
            )),
            _ => None,
        })
        .collect()
}

/// Diff two causal variable maps.
pub(crate) fn causal_vars(
    before: &BTreeMap<CausalVar, u8>,
    after: &BTreeMap<CausalVar, u8>,
) -> Vec<StateChange> {
    CausalVar::ALL
        .into_iter()
        .filter_map(|var| {
            let from = before.get(&var).copied();
            let to = after.get(&var).copied();
            (from != to).then(|| {
                change(
                    ChangeKind::CausalVarChanged,
                    var.as_str(),
                    None,
                    from.map_or(Value::Null, Value::from),
                    to.map_or(Value::Null, Value::from),
                )
            })
        })
        .collect()
}

fn change(kind: ChangeKind, key: &str, field: Option<String>, from: Value, to: Value) -> StateChange {
    StateChange {
        kind,
        key: key.to_owned(),
        field,
        from,
        to,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use counterfact_types::{CausalVarChange, Delta, EntityChange, FactChange};
    use serde_json::json;

    use crate::WorldState;

    use super::*;

    fn base() -> WorldState {
        let entities = BTreeMap::from([(
            String::from("france"),
            Entity {
                entity_type: String::from("nation"),
                name: String::from("France"),
                status: String::from("neutral"),
                properties: BTreeMap::from([(String::from("army"), json!("large"))]),
            },
        )]);
        let facts = BTreeMap::from([(String::from("f1"), Fact::soft("Maginot line holds"))]);
        WorldState::new(entities, facts, &BTreeMap::new())
    }

    #[test]
    fn identical_states_have_empty_diff() {
        let state = base();
        assert!(state.diff(&state.clone()).is_empty());
    }

    #[test]
    fn diff_reports_every_kind_of_change() {
        let state = base();
        let delta = Delta {
            entity_changes: vec![
                EntityChange {
                    entity_id: String::from("france"),
                    field: String::from("status"),
                    old_value: json!("neutral"),
                    new_value: json!("occupied"),
                },
                EntityChange {
                    entity_id: String::from("france"),
                    field: String::from("properties.army"),
                    old_value: json!("large"),
                    new_value: json!("routed"),
                },
                EntityChange {
                    entity_id: String::from("vichy"),
                    field: String::from("status"),
                    old_value: Value::Null,
                    new_value: json!("collaborating"),
                },
            ],
            fact_changes: vec![
                FactChange {
                    fact_id: String::from("f1"),
                    old_value: Value::Null,
                    new_value: Value::Null,
                },
                FactChange {
                    fact_id: String::from("f2"),
                    old_value: Value::Null,
                    new_value: json!("Paris falls"),
                },
            ],
            causal_var_changes: vec![CausalVarChange {
                var_name: String::from("morale"),
                delta: -20,
            }],
        };
        let next = state.apply_delta(Some(&delta));
        let changes = state.diff(&next);

        let kinds: Vec<ChangeKind> = changes.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ChangeKind::EntityAdded));
        assert!(kinds.contains(&ChangeKind::FactRemoved));
        assert!(kinds.contains(&ChangeKind::FactAdded));

        let status = changes
            .iter()
            .find(|c| c.field.as_deref() == Some("status"))
            .unwrap();
        assert_eq!(status.key, "france");
        assert_eq!(status.to, json!("occupied"));

        let army = changes
            .iter()
            .find(|c| c.field.as_deref() == Some("properties.army"))
            .unwrap();
        assert_eq!(army.from, json!("large"));

        let morale = changes
            .iter()
            .find(|c| c.kind == ChangeKind::CausalVarChanged)
            .unwrap();
        assert_eq!(morale.key, "morale");
        assert_eq!(morale.from, json!(50));
        assert_eq!(morale.to, json!(30));
    }

    #[test]
    fn removed_entity_is_reported() {
        let before = base();
        let after = WorldState::empty();
        let changes = before.diff(&after);
        assert!(
            changes
                .iter()
                .any(|c| c.kind == ChangeKind::EntityRemoved && c.key == "france")
        );
    }
}
