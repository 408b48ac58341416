//! LLM response parsing into typed collaborator payloads.
//!
//! The LLM returns raw text. JSON replies are recovered through several
//! strategies before giving up; a reply that cannot be recovered is a
//! [`RunnerError::Parse`], which the collaborator seam reports as malformed
//! output so the fallback answers instead.

use counterfact_types::{NodeId, Scenario, VoiceIntent, VoiceIntentKind};
use serde::de::DeserializeOwned;

use crate::error::RunnerError;

/// Parse a JSON reply into `T`.
///
/// Attempts multiple recovery strategies if the raw text is not clean JSON:
/// 1. Direct `serde_json` deserialization
/// 2. Extract JSON from a markdown code block
/// 3. Take the outermost `{ ... }` span of the reply
///
/// Each candidate is also retried with trailing commas stripped.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, RunnerError> {
    let trimmed = raw.trim();
    let candidates = [
        Some(trimmed),
        extract_json_from_codeblock(trimmed),
        outermost_object(trimmed),
    ];

    let mut last_error = None;
    for candidate in candidates.into_iter().flatten() {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
        match serde_json::from_str::<T>(&strip_trailing_commas(candidate)) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }

    Err(RunnerError::Parse(match last_error {
        Some(e) => format!("all parse strategies failed ({e}) for: {trimmed}"),
        None => String::from("empty response"),
    }))
}

/// Parse a plain-text reply: trimmed, unwrapped from a code block or
/// surrounding quotes.
pub fn parse_text(raw: &str) -> Result<String, RunnerError> {
    let trimmed = raw.trim();
    let inner = extract_json_from_codeblock(trimmed).unwrap_or(trimmed);
    let text = inner
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(inner)
        .trim();
    if text.is_empty() {
        return Err(RunnerError::Parse(String::from("empty text response")));
    }
    Ok(text.to_owned())
}

/// Intermediate struct for deserializing a voice-intent reply before the
/// intent name is normalised.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVoiceIntent {
    intent: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "target_node_id")]
    target_node_id: Option<String>,
}

/// Parse a voice-intent reply. Intent names are matched case-insensitively;
/// anything unrecognised becomes [`VoiceIntentKind::Unknown`].
pub fn parse_voice_intent(raw: &str) -> Result<VoiceIntent, RunnerError> {
    let parsed: RawVoiceIntent = parse_json(raw)?;
    let intent = match parsed.intent.trim().to_lowercase().as_str() {
        "fork" | "branch" | "what_if" => VoiceIntentKind::Fork,
        "navigate" | "navigation" | "goto" | "go_to" => VoiceIntentKind::Navigate,
        _ => VoiceIntentKind::Unknown,
    };
    Ok(VoiceIntent {
        intent,
        description: parsed.description.unwrap_or_default().trim().to_owned(),
        target_node_id: parsed
            .target_node_id
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .map(NodeId::new),
    })
}

/// Parse a scenario reply. A scenario must carry at least one event.
pub fn parse_scenario(raw: &str) -> Result<Scenario, RunnerError> {
    let scenario: Scenario = parse_json(raw)?;
    if scenario.events.is_empty() {
        return Err(RunnerError::Parse(String::from("scenario has no events")));
    }
    Ok(scenario)
}

/// Extract JSON from a markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    // Look for ```json ... ``` or ``` ... ```
    let start = text
        .find("```json")
        .map(|i| {
            let after_tag = i.checked_add(7).unwrap_or(i);
            // Find the newline after ```json
            text.get(after_tag..)
                .and_then(|s| s.find('\n'))
                .and_then(|nl| after_tag.checked_add(nl))
                .and_then(|pos| pos.checked_add(1))
                .unwrap_or(after_tag)
        })
        .or_else(|| {
            text.find("```").map(|i| {
                let after_tag = i.checked_add(3).unwrap_or(i);
                text.get(after_tag..)
                    .and_then(|s| s.find('\n'))
                    .and_then(|nl| after_tag.checked_add(nl))
                    .and_then(|pos| pos.checked_add(1))
                    .unwrap_or(after_tag)
            })
        });

    let start = start?;
    let remaining = text.get(start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// The span from the first `{` to the last `}`.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Strip trailing commas before closing braces and brackets (common LLM error).
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut i = 0;
    while i < len {
        let c = chars.get(i).copied().unwrap_or(' ');
        if c == ',' {
            // Look ahead past whitespace for } or ]
            let mut j = i.checked_add(1).unwrap_or(i);
            while j < len && chars.get(j).copied().unwrap_or(' ').is_whitespace() {
                j = j.checked_add(1).unwrap_or(j);
            }
            let next = chars.get(j).copied().unwrap_or(' ');
            if next == '}' || next == ']' {
                i = i.checked_add(1).unwrap_or(len);
                continue;
            }
        }
        result.push(c);
        i = i.checked_add(1).unwrap_or(len);
    }

    result
}
