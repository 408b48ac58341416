//! Keyword interpretation of spoken commands.

use counterfact_types::{NodeId, VoiceIntent, VoiceIntentKind};

const FORK_TRIGGERS: &[&str] = &["what if", "suppose", "imagine", "instead"];

const NAVIGATE_TRIGGERS: &[&str] = &["go to", "show me", "jump to", "navigate", "back to"];

/// Node id prefixes recognised inside a transcript.
const NODE_PREFIXES: &[&str] = &["main-", "node-"];

pub(crate) fn parse(transcript: &str) -> VoiceIntent {
    let text = transcript.trim();
    let lower = text.to_lowercase();
    let target_node_id = target_node(text);

    for (intent, triggers) in [
        (VoiceIntentKind::Fork, FORK_TRIGGERS),
        (VoiceIntentKind::Navigate, NAVIGATE_TRIGGERS),
    ] {
        if let Some((start, trigger)) = triggers
            .iter()
            .find_map(|t| lower.find(t).map(|start| (start, *t)))
        {
            return VoiceIntent {
                intent,
                description: strip_trigger(text, start, trigger.len()),
                target_node_id,
            };
        }
    }

    VoiceIntent {
        intent: VoiceIntentKind::Unknown,
        description: text.to_owned(),
        target_node_id,
    }
}

/// Remove the trigger phrase and surrounding punctuation. Falls back to the
/// whole transcript when the byte range does not line up with it (which can
/// happen when lowercasing changes the length of non-ASCII text).
fn strip_trigger(text: &str, start: usize, len: usize) -> String {
    let end = start.saturating_add(len);
    match (text.get(..start), text.get(end..)) {
        (Some(before), Some(after)) => {
            let joined = format!("{} {}", before.trim(), after.trim());
            joined
                .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '?' | '.' | '!'))
                .to_owned()
        }
        _ => text.to_owned(),
    }
}

fn target_node(text: &str) -> Option<NodeId> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
        .find(|token| {
            NODE_PREFIXES.iter().any(|prefix| {
                token
                    .to_lowercase()
                    .strip_prefix(prefix)
                    .is_some_and(|rest| !rest.is_empty())
            })
        })
        .map(|token| NodeId::new(token.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn what_if_is_a_fork() {
        let intent = parse("What if Churchill resigned in 1940?");
        assert_eq!(intent.intent, VoiceIntentKind::Fork);
        assert_eq!(intent.description, "Churchill resigned in 1940");
        assert_eq!(intent.target_node_id, None);
    }

    #[test]
    fn trailing_instead_is_stripped() {
        let intent = parse("Germany attacks Britain instead");
        assert_eq!(intent.intent, VoiceIntentKind::Fork);
        assert_eq!(intent.description, "Germany attacks Britain");
    }

    #[test]
    fn navigation_with_node_token() {
        let intent = parse("Go to main-4, please");
        assert_eq!(intent.intent, VoiceIntentKind::Navigate);
        assert_eq!(intent.target_node_id, Some(NodeId::new("main-4")));
    }

    #[test]
    fn fork_at_a_named_node() {
        let intent = parse("Imagine at node-7 that Italy stays neutral");
        assert_eq!(intent.intent, VoiceIntentKind::Fork);
        assert_eq!(intent.target_node_id, Some(NodeId::new("node-7")));
    }

    #[test]
    fn unrecognised_command_is_unknown() {
        let intent = parse("  play some music ");
        assert_eq!(intent.intent, VoiceIntentKind::Unknown);
        assert_eq!(intent.description, "play some music");
        assert_eq!(intent.target_node_id, None);
    }
}
