//! Template prose: narration and media prompts.

use counterfact_types::CausalVar;
use counterfact_world::WorldState;

use crate::collaborator::NarrationRequest;

/// Distance from the default below which no causal variable dominates.
const CALM_BAND: u8 = 10;

/// Escalation at or above which scenes read as violent.
const HIGH_ESCALATION: u8 = 70;

/// Escalation at or below which scenes read as calm.
const LOW_ESCALATION: u8 = 30;

pub(crate) fn narration(request: &NarrationRequest) -> String {
    let date = request.timestamp.format("%B %-d, %Y");
    let title = request.event_spec.title.trim().trim_end_matches('.');
    let mut sentences = vec![if request.is_branch {
        format!("In this altered history, {date}: {title}.")
    } else {
        format!("{date}: {title}.")
    }];

    let description = request.event_spec.description.trim();
    if !description.is_empty() {
        sentences.push(with_period(description));
    }
    sentences.push(mood(&request.world_state).to_owned());
    sentences.join(" ")
}

pub(crate) fn image_prompt(request: &NarrationRequest) -> String {
    let escalation = request.world_state.causal_var(CausalVar::Escalation);
    let atmosphere = if escalation >= HIGH_ESCALATION {
        "smoke-darkened sky, harsh contrast"
    } else if escalation <= LOW_ESCALATION {
        "still air, soft diffuse light"
    } else {
        "overcast sky, documentary realism"
    };
    format!(
        "Archival black-and-white photograph, {}: {}. {} {atmosphere}.{}",
        request.timestamp.format("%Y"),
        request.event_spec.title.trim().trim_end_matches('.'),
        with_period(request.event_spec.description.trim()),
        branch_hint(request.is_branch),
    )
}

pub(crate) fn video_prompt(request: &NarrationRequest) -> String {
    let escalation = request.world_state.causal_var(CausalVar::Escalation);
    let camera = if escalation >= HIGH_ESCALATION {
        "Handheld camera pushing through chaos"
    } else if escalation <= LOW_ESCALATION {
        "Slow aerial drift over a quiet landscape"
    } else {
        "Slow push-in on the scene"
    };
    format!(
        "Six-second cinematic shot, period film grain, {}: {}. {camera}.{}",
        request.timestamp.format("%Y"),
        request.event_spec.title.trim().trim_end_matches('.'),
        branch_hint(request.is_branch),
    )
}

const fn branch_hint(is_branch: bool) -> &'static str {
    if is_branch {
        " Subtle anachronistic details hint at an alternate history."
    } else {
        ""
    }
}

fn with_period(text: &str) -> String {
    if text.is_empty() || text.ends_with(['.', '!', '?']) {
        text.to_owned()
    } else {
        format!("{text}.")
    }
}

/// A sentence describing the causal variable furthest from its default.
fn mood(state: &WorldState) -> &'static str {
    let Some((var, value)) = CausalVar::ALL
        .into_iter()
        .map(|var| (var, state.causal_var(var)))
        .max_by_key(|(_, value)| value.abs_diff(CausalVar::DEFAULT_VALUE))
    else {
        return "The balance of the world holds, for now.";
    };
    if value.abs_diff(CausalVar::DEFAULT_VALUE) < CALM_BAND {
        return "The balance of the world holds, for now.";
    }
    let high = value > CausalVar::DEFAULT_VALUE;
    match (var, high) {
        (CausalVar::Escalation, true) => "Tensions climb toward open catastrophe.",
        (CausalVar::Escalation, false) => "The guns grow quieter along the fronts.",
        (CausalVar::Logistics, true) => "Supply lines run full and fast.",
        (CausalVar::Logistics, false) => "Supply lines strain to breaking.",
        (CausalVar::Intelligence, true) => "Few secrets survive; each side reads the other's hand.",
        (CausalVar::Intelligence, false) => "Commanders grope through a fog of rumour.",
        (CausalVar::Morale, true) => "Spirits run high among soldiers and civilians alike.",
        (CausalVar::Morale, false) => "Exhaustion and doubt spread through the ranks.",
        (CausalVar::TechLevel, true) => "New machines reshape what war can do.",
        (CausalVar::TechLevel, false) => "The war is fought with the tools of yesterday.",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use counterfact_types::EventSpec;

    use super::*;

    fn request(escalation: i64, is_branch: bool) -> NarrationRequest {
        let vars = BTreeMap::from([(CausalVar::Escalation, escalation)]);
        NarrationRequest {
            event_spec: EventSpec {
                title: String::from("Fall of France"),
                description: String::from("Paris is occupied"),
                category: String::from("military"),
            },
            is_branch,
            timestamp: NaiveDate::from_ymd_opt(1940, 6, 14).unwrap(),
            world_state: WorldState::new(BTreeMap::new(), BTreeMap::new(), &vars),
        }
    }

    #[test]
    fn narration_has_date_description_and_mood() {
        let text = narration(&request(90, false));
        assert_eq!(
            text,
            "June 14, 1940: Fall of France. Paris is occupied. \
             Tensions climb toward open catastrophe."
        );
    }

    #[test]
    fn branch_narration_is_flagged() {
        let text = narration(&request(50, true));
        assert!(text.starts_with("In this altered history, June 14, 1940"));
        assert!(text.ends_with("The balance of the world holds, for now."));
    }

    #[test]
    fn prompts_follow_escalation() {
        assert!(image_prompt(&request(80, false)).contains("smoke-darkened"));
        assert!(image_prompt(&request(10, false)).contains("soft diffuse light"));
        assert!(video_prompt(&request(80, true)).contains("Handheld"));
        assert!(video_prompt(&request(80, true)).contains("alternate history"));
        assert!(!video_prompt(&request(50, false)).contains("alternate history"));
    }
}
