//! Normalisation: turn untrusted model text into a bounded [`SuggestionSet`].
//!
//! Models asked for JSON usually return JSON, but not always: some wrap it
//! in prose ("Here is the result: {…} Thanks!"), some wrap it in a
//! ```` ```json ```` fence, some drop fields or answer "Høj" where "High" was
//! requested. Rejecting the whole answer for any of these would throw away a
//! perfectly usable result, so the normaliser works in three steps:
//!
//! 1. **Parse** — the whole text, or failing that the first `{…}` block
//!    (greedy: first `{` to last `}`). If both fail the *original* parse
//!    error is reported as [`NormalizeError::MalformedResponse`].
//! 2. **Shape** — the document must be an object with an `actions` array,
//!    otherwise [`NormalizeError::UnexpectedShape`].
//! 3. **Coerce** — every retained entry is rebuilt field by field with
//!    defaults and bounds from [`NormalizeLimits`]. This step cannot fail.
//!
//! Everything here is pure and synchronous; the cost is linear in the input.

use crate::config::{LabelSet, NormalizeLimits};
use crate::error::NormalizeError;
use crate::output::{Level, SuggestionAction, SuggestionSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Normalise with the default bounds and the English label set.
pub fn normalize(raw: &str) -> Result<SuggestionSet, NormalizeError> {
    Normalizer::default().normalize(raw)
}

/// A configured normaliser. Cheap to construct and `Copy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalizer {
    limits: NormalizeLimits,
    labels: LabelSet,
}

impl Normalizer {
    pub fn new(limits: NormalizeLimits, labels: LabelSet) -> Self {
        Self { limits, labels }
    }

    pub fn labels(&self) -> LabelSet {
        self.labels
    }

    /// Validate and coerce raw model text.
    pub fn normalize(&self, raw: &str) -> Result<SuggestionSet, NormalizeError> {
        if raw.trim().is_empty() {
            return Err(NormalizeError::EmptyResponse);
        }

        let doc = parse_document(raw)?;

        let entries = doc
            .as_object()
            .and_then(|obj| obj.get("actions"))
            .and_then(Value::as_array)
            .ok_or_else(|| NormalizeError::UnexpectedShape {
                detail: describe_shape(&doc),
            })?;

        let actions = entries
            .iter()
            .take(self.limits.max_actions)
            .map(|entry| self.coerce_action(entry))
            .collect();

        Ok(SuggestionSet { actions })
    }

    fn coerce_action(&self, entry: &Value) -> SuggestionAction {
        let empty = Map::new();
        let obj = entry.as_object().unwrap_or(&empty);
        let limits = &self.limits;

        SuggestionAction {
            title: string_field(obj, "title", limits.max_title_chars),
            description: string_field(obj, "description", limits.max_description_chars),
            impact: self.level_field(obj, "impact"),
            effort: self.level_field(obj, "effort"),
            steps: match obj.get("steps") {
                Some(Value::Array(steps)) => steps
                    .iter()
                    .take(limits.max_steps)
                    .map(|s| truncate_chars(&coerce_step(s), limits.max_step_chars))
                    .collect(),
                _ => Vec::new(),
            },
        }
    }

    fn level_field(&self, obj: &Map<String, Value>, key: &str) -> Level {
        obj.get(key)
            .and_then(Value::as_str)
            .and_then(|raw| self.labels.parse(raw))
            .unwrap_or_default()
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────

fn parse_document(raw: &str) -> Result<Value, NormalizeError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(doc) => Ok(doc),
        Err(original) => extract_json_block(raw)
            .and_then(|block| serde_json::from_str::<Value>(block).ok())
            .ok_or_else(|| NormalizeError::MalformedResponse {
                detail: original.to_string(),
            }),
    }
}

static RE_JSON_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Locate the outermost brace-delimited block in `text`.
///
/// Greedy: spans from the first `{` to the last `}`. No attempt is made to
/// balance braces inside; that is the JSON parser's job.
pub fn extract_json_block(text: &str) -> Option<&str> {
    RE_JSON_BLOCK.find(text).map(|m| m.as_str())
}

fn describe_shape(doc: &Value) -> String {
    match doc {
        Value::Object(obj) => match obj.get("actions") {
            None => "top-level object has no 'actions' field".to_string(),
            Some(other) => format!("'actions' is {}, expected an array", kind(other)),
        },
        other => format!("top-level value is {}, expected an object", kind(other)),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Coercion ─────────────────────────────────────────────────────────────

fn string_field(obj: &Map<String, Value>, key: &str, max_chars: usize) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| truncate_chars(s, max_chars))
        .unwrap_or_default()
}

/// Steps are free text, but models occasionally emit numbers or nested
/// objects. Scalars keep their JSON text; `null` becomes empty.
fn coerce_step(step: &Value) -> String {
    match step {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Keep the first `max_chars` Unicode scalar values of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
