//! Parsers for the structured verdicts the model is asked to emit.
//!
//! Providers are prompted for strict JSON but routinely wrap it in prose
//! or drift from the schema, so every parser degrades in stages: strict
//! JSON first, then keyword scanning, then a conservative default. A
//! malformed completion must never abort a turn.

use serde_json::Value;

/// Outcome of asking the model whether the user answered the active question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonVerdict {
    pub has_response: bool,
    pub reason: Option<String>,
}

impl ReasonVerdict {
    pub fn answered(reason: impl Into<String>) -> Self {
        Self {
            has_response: true,
            reason: Some(reason.into()),
        }
    }

    pub fn unanswered() -> Self {
        Self {
            has_response: false,
            reason: None,
        }
    }
}

/// What the user's reaction to a confirmation request means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// The user confirmed; the conversation can close.
    Confirmed,
    /// The user wants more information before deciding.
    NeedsExplanation,
    /// The user neither confirmed nor asked; ask for confirmation again.
    StillUndecided,
}

/// Parses the answer-detection completion.
///
/// Expected shape is `{"has_response": 1, "reason": "..."}`. A verdict
/// only counts as answered when it carries a non-empty reason; anything
/// ambiguous is treated as unanswered so the session keeps exploring.
pub fn parse_reason_verdict(raw: &str) -> ReasonVerdict {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let Some(object) = value.as_object() else {
            return ReasonVerdict::unanswered();
        };

        let has_response = match object.get("has_response") {
            Some(flag) => flag.as_i64() == Some(1) || flag.as_bool() == Some(true),
            None => false,
        };

        let reason = object
            .get("reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty());

        return match (has_response, reason) {
            (true, Some(reason)) => ReasonVerdict::answered(reason),
            _ => ReasonVerdict::unanswered(),
        };
    }

    // Not valid JSON. Scan for the positive marker and salvage the quoted
    // reason if one is present.
    if trimmed.contains("\"has_response\": 1") {
        let reason = extract_quoted_reason(trimmed).unwrap_or_else(|| "opción válida".to_string());
        return ReasonVerdict::answered(reason);
    }

    ReasonVerdict::unanswered()
}

/// Pulls the quoted value following a `"reason":` key out of free text.
fn extract_quoted_reason(text: &str) -> Option<String> {
    let key_at = text.find("\"reason\"")?;
    let after_key = &text[key_at + "\"reason\"".len()..];
    let colon_at = after_key.find(':')?;
    let after_colon = &after_key[colon_at + 1..];
    let open = after_colon.find('"')?;
    let rest = &after_colon[open + 1..];
    let close = rest.find('"')?;
    let candidate = rest[..close].trim();

    if candidate.is_empty() || candidate == "null" {
        None
    } else {
        Some(candidate.to_string())
    }
}

/// Parses the close-evaluation completion.
///
/// Expected shape is `{"decision": "end_conversation" | "profesor" |
/// "confirmation"}`. Unknown decisions and unparseable output fall back to
/// [`CloseDecision::NeedsExplanation`], the safe choice from the prompt's
/// own rules.
pub fn parse_close_decision(raw: &str) -> CloseDecision {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let decision = value
            .as_object()
            .and_then(|object| object.get("decision"))
            .and_then(Value::as_str)
            .unwrap_or("");

        return match decision {
            "end_conversation" => CloseDecision::Confirmed,
            "confirmation" => CloseDecision::StillUndecided,
            _ => CloseDecision::NeedsExplanation,
        };
    }

    // Keyword fallback. "confirmation" is checked first because
    // "end_conversation" prompts often echo all three option names.
    let lowered = trimmed.to_lowercase();
    if lowered.contains("confirmation") {
        CloseDecision::StillUndecided
    } else if lowered.contains("end_conversation") {
        CloseDecision::Confirmed
    } else {
        CloseDecision::NeedsExplanation
    }
}
