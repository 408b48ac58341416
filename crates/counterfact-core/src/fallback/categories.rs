//! Keyword-driven change categories for descriptions the catalog does not
//! cover.
//!
//! Each category maps to a fixed pattern: a status change on the entity the
//! description names, a hard fact recording the divergence, and calibrated
//! causal-variable deltas. Descriptions matching no category produce a soft
//! fact and small nudges.

use counterfact_types::{
    BranchScores, CONTINUATION_COUNT, CausalVar, CausalVarChange, ContinuationEvent, Delta,
    Entity, EntityChange, EventSpec, FactChange, ForkDelta, ForkProposal,
};
use counterfact_world::WorldState;
use serde_json::{Value, json};

use crate::collaborator::ForkRequest;

/// Confidence of the fact recorded for a categorized fork.
const CATEGORY_FACT_CONFIDENCE: u8 = 80;

/// Confidence of the fact recorded for an uncategorized fork.
const GENERIC_FACT_CONFIDENCE: u8 = 40;

/// Causal nudges for uncategorized forks.
const GENERIC_NUDGES: &[(CausalVar, i64)] = &[(CausalVar::Escalation, 3), (CausalVar::Morale, -2)];

/// Scores for uncategorized forks.
const GENERIC_SCORES: BranchScores = BranchScores {
    plausibility: 50,
    coherence: 60,
    novelty: 50,
};

/// How much of the fork's causal pressure each ripple event carries, as a
/// divisor of the fork's own deltas.
const RIPPLE_DIVISORS: [i64; CONTINUATION_COUNT] = [2, 4];

/// Titles used for ripple events when no mainline events remain.
const AFTERMATH_TITLES: [&str; CONTINUATION_COUNT] = ["Immediate aftermath", "A new equilibrium"];

/// A recognised kind of historical change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCategory {
    /// A party capitulates.
    Surrender,
    /// A person dies.
    Death,
    /// Parties ally.
    Alliance,
    /// A technology arrives.
    Invention,
    /// Forces pull back.
    Retreat,
    /// Forces attack.
    Invasion,
}

impl ChangeCategory {
    /// Detection order; the first matching category wins.
    pub const ORDER: [Self; 6] = [
        Self::Surrender,
        Self::Death,
        Self::Alliance,
        Self::Invention,
        Self::Retreat,
        Self::Invasion,
    ];

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Surrender => "surrender",
            Self::Death => "death",
            Self::Alliance => "alliance",
            Self::Invention => "invention",
            Self::Retreat => "retreat",
            Self::Invasion => "invasion",
        }
    }

    /// Substrings that signal the category in a lowercase description.
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Surrender => &[
                "surrender",
                "capitulat",
                "armistice",
                "sues for peace",
                "gives up",
            ],
            Self::Death => &["dies", "died", "death", "killed", "assassinat", "dead"],
            Self::Alliance => &[
                "alliance", "allies with", "allied", "pact", "treaty", "joins", "sides with",
            ],
            Self::Invention => &[
                "invent",
                "develops",
                "developed",
                "discover",
                "breakthrough",
                "first to build",
            ],
            Self::Retreat => &["retreat", "withdraw", "pulls back", "pull back", "evacuat"],
            Self::Invasion => &[
                "invade",
                "invasion",
                "attack",
                "offensive",
                "declares war",
                "launches",
            ],
        }
    }

    /// The first category, in [`ORDER`](Self::ORDER), whose keywords occur
    /// in the description.
    pub fn detect(description: &str) -> Option<Self> {
        let text = description.to_lowercase();
        Self::ORDER
            .into_iter()
            .find(|category| category.keywords().iter().any(|k| text.contains(k)))
    }

    /// Status given to the named entity. `None` for inventions, which record
    /// a property instead.
    const fn status(self) -> Option<&'static str> {
        match self {
            Self::Surrender => Some("surrendered"),
            Self::Death => Some("dead"),
            Self::Alliance => Some("allied"),
            Self::Invention => None,
            Self::Retreat => Some("retreating"),
            Self::Invasion => Some("invading"),
        }
    }

    /// Causal-variable deltas for the fork event.
    const fn var_deltas(self) -> &'static [(CausalVar, i64)] {
        match self {
            Self::Surrender => &[(CausalVar::Escalation, -15), (CausalVar::Morale, -10)],
            Self::Death => &[(CausalVar::Morale, -15), (CausalVar::Escalation, 5)],
            Self::Alliance => &[
                (CausalVar::Escalation, 10),
                (CausalVar::Logistics, 10),
                (CausalVar::Morale, 5),
            ],
            Self::Invention => &[(CausalVar::TechLevel, 20), (CausalVar::Intelligence, 5)],
            Self::Retreat => &[
                (CausalVar::Escalation, -5),
                (CausalVar::Morale, -10),
                (CausalVar::Logistics, -5),
            ],
            Self::Invasion => &[
                (CausalVar::Escalation, 20),
                (CausalVar::Logistics, -10),
                (CausalVar::Morale, 5),
            ],
        }
    }

    const fn scores(self) -> BranchScores {
        let (plausibility, coherence, novelty) = match self {
            Self::Surrender => (55, 75, 80),
            Self::Death => (50, 70, 85),
            Self::Alliance => (60, 75, 70),
            Self::Invention => (45, 70, 75),
            Self::Retreat => (65, 80, 55),
            Self::Invasion => (60, 75, 65),
        };
        BranchScores {
            plausibility,
            coherence,
            novelty,
        }
    }

    const fn event_category(self) -> &'static str {
        match self {
            Self::Surrender | Self::Alliance => "political",
            Self::Death => "personal",
            Self::Invention => "technology",
            Self::Retreat | Self::Invasion => "military",
        }
    }

    const fn summary(self) -> &'static str {
        match self {
            Self::Surrender => "Hostilities wind down as arms are laid down.",
            Self::Death => "A central figure is gone, and the chain of command shifts.",
            Self::Alliance => "New partners pool their armies and their industry.",
            Self::Invention => "A new capability arrives years ahead of its time.",
            Self::Retreat => "Ground once held is given up.",
            Self::Invasion => "A new front opens.",
        }
    }
}

/// The fork proposal for a description the catalog does not cover.
pub(crate) fn propose(request: &ForkRequest) -> ForkProposal {
    let description = request.description.trim();
    let category = ChangeCategory::detect(description);
    let target = find_target(&request.world_state, description);
    let title = headline(description);

    let mut changes = Delta::default();
    let (nudges, scores, event_spec) = match category {
        Some(category) => {
            if let Some((entity_id, entity)) = target {
                changes
                    .entity_changes
                    .push(category_entity_change(category, entity_id, entity, description));
            }
            let fact_id = format!(
                "fork-{}-{}",
                category.as_str(),
                target.map_or("world", |(id, _)| id)
            );
            changes.fact_changes.push(FactChange {
                fact_id,
                old_value: Value::Null,
                new_value: json!({
                    "type": "hard",
                    "statement": description,
                    "confidence": CATEGORY_FACT_CONFIDENCE,
                }),
            });
            let spec = EventSpec {
                description: format!("{title}. {}", category.summary()),
                title,
                category: category.event_category().to_owned(),
            };
            (category.var_deltas(), category.scores(), spec)
        }
        None => {
            changes.fact_changes.push(FactChange {
                fact_id: String::from("fork-divergence"),
                old_value: Value::Null,
                new_value: json!({
                    "type": "soft",
                    "statement": description,
                    "confidence": GENERIC_FACT_CONFIDENCE,
                }),
            });
            let spec = EventSpec {
                description: format!("{title}. History begins to bend."),
                title,
                category: String::from("counterfactual"),
            };
            (GENERIC_NUDGES, GENERIC_SCORES, spec)
        }
    };
    changes.causal_var_changes = var_changes(nudges, 1);

    ForkProposal {
        continuation_events: continuations(request, &event_spec, nudges),
        delta: ForkDelta {
            changes,
            event_spec,
        },
        branch_scores: scores,
        content_key: None,
    }
}

fn category_entity_change(
    category: ChangeCategory,
    entity_id: &str,
    entity: &Entity,
    description: &str,
) -> EntityChange {
    match category.status() {
        Some(status) => EntityChange {
            entity_id: entity_id.to_owned(),
            field: String::from("status"),
            old_value: json!(entity.status),
            new_value: json!(status),
        },
        None => EntityChange {
            entity_id: entity_id.to_owned(),
            field: String::from("properties.breakthrough"),
            old_value: entity
                .properties
                .get("breakthrough")
                .cloned()
                .unwrap_or(Value::Null),
            new_value: json!(description),
        },
    }
}

/// The entity whose id or name appears earliest in the description.
fn find_target<'a>(state: &'a WorldState, description: &str) -> Option<(&'a str, &'a Entity)> {
    let text = description.to_lowercase();
    let mut best: Option<(usize, &str, &Entity)> = None;

    for (id, entity) in state.entities() {
        let position = [id.replace('_', " "), entity.name.to_lowercase()]
            .iter()
            .filter(|needle| !needle.is_empty())
            .filter_map(|needle| find_word(&text, &needle.to_lowercase()))
            .min();
        if let Some(position) = position
            && best.is_none_or(|(top, _, _)| position < top)
        {
            best = Some((position, id.as_str(), entity));
        }
    }
    best.map(|(_, id, entity)| (id, entity))
}

/// Byte offset of the first occurrence of `needle` as whole words: the
/// characters on either side must not be alphanumeric.
fn find_word(text: &str, needle: &str) -> Option<usize> {
    text.match_indices(needle)
        .find(|&(start, matched)| {
            let before = text.get(..start).and_then(|head| head.chars().next_back());
            let after = text
                .get(start.saturating_add(matched.len())..)
                .and_then(|tail| tail.chars().next());
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
        .map(|(start, _)| start)
}

/// Sentence-cased, at most 80 characters, without a trailing period.
fn headline(description: &str) -> String {
    let trimmed = description.trim().trim_end_matches('.');
    let mut chars = trimmed.chars();
    let mut title: String = chars
        .next()
        .map(|first| first.to_uppercase().chain(chars.take(79)).collect())
        .unwrap_or_default();
    if title.is_empty() {
        title = String::from("An alternate turn");
    }
    title
}

fn var_changes(deltas: &[(CausalVar, i64)], divisor: i64) -> Vec<CausalVarChange> {
    deltas
        .iter()
        .map(|(var, delta)| (var, delta.saturating_div(divisor)))
        .filter(|(_, delta)| *delta != 0)
        .map(|(var, delta)| CausalVarChange {
            var_name: var.as_str().to_owned(),
            delta,
        })
        .collect()
}

/// Two ripple events, echoing the fork's causal pressure with diminishing
/// strength and retelling the next mainline events where they exist.
fn continuations(
    request: &ForkRequest,
    fork: &EventSpec,
    nudges: &[(CausalVar, i64)],
) -> Vec<ContinuationEvent> {
    RIPPLE_DIVISORS
        .into_iter()
        .zip(AFTERMATH_TITLES)
        .enumerate()
        .map(|(i, (divisor, aftermath))| {
            let event_spec = match request.upcoming_events.get(i) {
                Some(next) => EventSpec {
                    title: format!("{} (altered)", next.title),
                    description: format!(
                        "In the wake of \"{}\", {} plays out differently than history recorded.",
                        fork.title, next.title
                    ),
                    category: next.category.clone(),
                },
                None => EventSpec {
                    title: aftermath.to_owned(),
                    description: format!("The consequences of \"{}\" keep spreading.", fork.title),
                    category: fork.category.clone(),
                },
            };
            ContinuationEvent {
                event_spec,
                deltas: Delta {
                    causal_var_changes: var_changes(nudges, divisor),
                    ..Delta::default()
                },
                timestamp: None,
            }
        })
        .collect()
}
