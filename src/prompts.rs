//! Prompts for turning a learning plan into suggested actions.
//!
//! Every prompt lives here so that changing the wording touches one file
//! and unit tests can inspect prompts without a live model.
//!
//! The system prompt is a template rather than a constant: the rating
//! labels it asks for must match the [`LabelSet`] the normaliser accepts,
//! otherwise every rating would silently fall back to the default.
//!
//! Callers can override the system prompt via
//! [`crate::config::CoachConfig::system_prompt`].

use crate::config::{LabelSet, NormalizeLimits};

/// Placeholder replaced with the `/`-joined rating labels.
const LEVELS: &str = "{levels}";
/// Placeholder replaced with the number of actions requested.
const COUNT: &str = "{count}";

/// Default system prompt template.
pub const SYSTEM_PROMPT_TEMPLATE: &str = r#"Du er en ekspert i læring og udvikling. Analyser den givne læringsplan og foreslå præcis {count} konkrete, handlingsorienterede tiltag der kan forbedre læringen.

Svar ALTID i dette JSON format:
{
  "actions": [
    {
      "title": "Kort beskrivende titel",
      "description": "Detaljeret beskrivelse af tiltaget",
      "impact": "{levels}",
      "effort": "{levels}",
      "steps": ["Trin 1", "Trin 2", "Trin 3"]
    }
  ]
}

Brug kun en af værdierne {levels} for "impact" og "effort".
Svar kun med JSON, uden forklarende tekst før eller efter.

Fokuser på praktiske, implementerbare forslag der direkte adresserer læringsbehov i planen."#;

/// Render the default system prompt for `labels` and `limits`.
pub fn system_prompt(labels: LabelSet, limits: &NormalizeLimits) -> String {
    SYSTEM_PROMPT_TEMPLATE
        .replace(LEVELS, &labels.prompt_choices())
        .replace(COUNT, &limits.max_actions.to_string())
}

/// Build the user message carrying the plan text.
pub fn user_prompt(plan: &str, limits: &NormalizeLimits) -> String {
    format!(
        "Analyser denne læringsplan og foreslå {} konkrete tiltag:\n\n{}",
        limits.max_actions, plan
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_uses_configured_labels() {
        let p = system_prompt(LabelSet::DanishMiddel, &NormalizeLimits::default());
        assert!(p.contains("\"impact\": \"Høj/Middel/Lav\""));
        assert!(p.contains("præcis 3 konkrete"));
        assert!(!p.contains(LEVELS));
        assert!(!p.contains(COUNT));
    }

    #[test]
    fn system_prompt_default_is_english_labels() {
        let p = system_prompt(LabelSet::default(), &NormalizeLimits::default());
        assert!(p.contains("High/Medium/Low"));
    }

    #[test]
    fn user_prompt_embeds_plan() {
        let p = user_prompt("Lær Rust", &NormalizeLimits::default());
        assert!(p.starts_with("Analyser denne læringsplan og foreslå 3 konkrete tiltag:"));
        assert!(p.ends_with("\n\nLær Rust"));
    }
}
