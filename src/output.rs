//! Result types: the normalised suggestion set and per-request statistics.

use crate::config::LabelSet;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Impact or effort rating of a suggested action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Low, Level::Medium, Level::High];
}

/// One recommended action, already bounded and typed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SuggestionAction {
    pub title: String,
    pub description: String,
    pub impact: Level,
    pub effort: Level,
    pub steps: Vec<String>,
}

impl SuggestionAction {
    /// JSON form with ratings rendered through `labels`.
    pub fn to_json(&self, labels: LabelSet) -> Value {
        json!({
            "title": self.title,
            "description": self.description,
            "impact": labels.label(self.impact),
            "effort": labels.label(self.effort),
            "steps": self.steps,
        })
    }
}

/// Ordered, size-bounded list of actions returned to the caller.
///
/// Serialises as `{ "actions": [...] }`, the same shape the model is asked
/// to produce, so a normalised set can be fed back through the normaliser
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub actions: Vec<SuggestionAction>,
}

impl SuggestionSet {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// `{ "actions": [...] }` with ratings rendered through `labels`.
    pub fn to_json(&self, labels: LabelSet) -> Value {
        let actions: Vec<Value> = self.actions.iter().map(|a| a.to_json(labels)).collect();
        json!({ "actions": actions })
    }
}

/// Counters collected while serving one generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Characters of plan text sent to the model (after capping).
    pub plan_chars: usize,
    /// Whether the plan was cut to the configured maximum.
    pub plan_truncated: bool,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Failed attempts before the successful completion call.
    pub retries: u32,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a generation call produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub suggestions: SuggestionSet,
    pub stats: GenerationStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SuggestionSet {
        SuggestionSet {
            actions: vec![SuggestionAction {
                title: "Læs dagligt".into(),
                description: "Sæt 20 minutter af hver morgen".into(),
                impact: Level::High,
                effort: Level::Low,
                steps: vec!["Vælg en bog".into()],
            }],
        }
    }

    #[test]
    fn default_serialisation_uses_english_labels() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["actions"][0]["impact"], "High");
        assert_eq!(v["actions"][0]["effort"], "Low");
    }

    #[test]
    fn to_json_renders_danish_labels() {
        let v = sample().to_json(LabelSet::DanishMiddel);
        assert_eq!(v["actions"][0]["impact"], "Høj");
        assert_eq!(v["actions"][0]["effort"], "Lav");
        assert_eq!(v["actions"][0]["steps"][0], "Vælg en bog");
    }

    #[test]
    fn english_to_json_matches_derive() {
        let set = sample();
        assert_eq!(
            set.to_json(LabelSet::English),
            serde_json::to_value(&set).unwrap()
        );
    }
}
