//! Entry points: plan text or PDF in, normalised suggestions out.
//!
//! These functions run the whole pipeline for one request and are what the
//! HTTP handlers and the CLI call. Each returns a [`PlanCoachError`] for
//! anything that stops the request; nothing here panics on bad input or a
//! bad model answer.

use crate::config::CoachConfig;
use crate::error::PlanCoachError;
use crate::output::{GenerationOutput, GenerationStats};
use crate::pipeline::extract::{extract_plan_text, PdfExtractor, PlanTextExtractor};
use crate::pipeline::input::{check_upload, PlanInput};
use crate::pipeline::llm::{request_suggestions, CompletionProvider, LlmCompletionProvider};
use crate::pipeline::normalize::Normalizer;
use edgequake_llm::ProviderFactory;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Generate suggestions for a typed learning plan.
///
/// # Errors
/// - [`PlanCoachError::InputTooShort`] if the trimmed plan is below the minimum
/// - [`PlanCoachError::ProviderNotConfigured`] if no provider can be resolved
/// - [`PlanCoachError::ProviderUnavailable`] / [`PlanCoachError::ApiTimeout`]
///   when the model cannot be reached
/// - [`PlanCoachError::Normalize`] when the answer cannot be used
pub async fn generate(
    plan_text: impl AsRef<str>,
    config: &CoachConfig,
) -> Result<GenerationOutput, PlanCoachError> {
    let start = Instant::now();
    let plan = PlanInput::new(
        plan_text.as_ref(),
        config.min_plan_chars,
        config.max_plan_chars,
    )?;
    generate_for_plan(plan, config, start).await
}

/// Validate a PDF upload and turn it into plan text.
///
/// The result is subject to the same length bounds as typed text.
pub async fn extract_plan_from_pdf(
    pdf: &[u8],
    content_type: Option<&str>,
    config: &CoachConfig,
) -> Result<PlanInput, PlanCoachError> {
    check_upload(content_type, pdf, config.max_upload_bytes)?;

    let extractor = resolve_extractor(config);
    let text = extract_plan_text(extractor.as_ref(), pdf).await?;
    info!("Extracted {} characters from PDF", text.chars().count());

    PlanInput::new(&text, config.min_plan_chars, config.max_plan_chars)
}

/// Generate suggestions for a learning plan uploaded as a PDF.
pub async fn generate_from_pdf(
    pdf: &[u8],
    content_type: Option<&str>,
    config: &CoachConfig,
) -> Result<GenerationOutput, PlanCoachError> {
    let start = Instant::now();
    let plan = extract_plan_from_pdf(pdf, content_type, config).await?;
    generate_for_plan(plan, config, start).await
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally; do not call from async code.
pub fn generate_sync(
    plan_text: impl AsRef<str>,
    config: &CoachConfig,
) -> Result<GenerationOutput, PlanCoachError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PlanCoachError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(plan_text, config))
}

async fn generate_for_plan(
    plan: PlanInput,
    config: &CoachConfig,
    start: Instant,
) -> Result<GenerationOutput, PlanCoachError> {
    let provider = resolve_provider(config)?;
    info!(
        "Requesting suggestions for a {}-character plan{}",
        plan.chars(),
        if plan.was_truncated() { " (truncated)" } else { "" }
    );

    let llm_start = Instant::now();
    let (completion, retries) = request_suggestions(provider.as_ref(), &plan, config).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let normalizer = Normalizer::new(config.limits, config.labels);
    let suggestions = normalizer.normalize(&completion.content).inspect_err(|e| {
        warn!("Model answer rejected: {}", e);
    })?;

    let stats = GenerationStats {
        plan_chars: plan.chars(),
        plan_truncated: plan.was_truncated(),
        input_tokens: completion.prompt_tokens,
        output_tokens: completion.completion_tokens,
        retries,
        llm_duration_ms,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Generated {} suggestion(s) in {}ms ({} tokens in / {} out)",
        suggestions.len(),
        stats.total_duration_ms,
        stats.input_tokens,
        stats.output_tokens
    );

    Ok(GenerationOutput { suggestions, stats })
}

// ── Collaborator resolution ──────────────────────────────────────────────

/// The configured extractor, or [`PdfExtractor`].
pub fn resolve_extractor(config: &CoachConfig) -> Arc<dyn PlanTextExtractor> {
    match config.extractor {
        Some(ref extractor) => Arc::clone(extractor),
        None => Arc::new(PdfExtractor),
    }
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn CompletionProvider>, PlanCoachError> {
    let llm = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PlanCoachError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(LlmCompletionProvider::new(llm)))
}

/// Resolve the completion provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is; this is how
///    the server shares one provider across requests and how tests inject
///    scripted ones.
/// 2. **Named provider + model** (`config.provider_name`) — built through
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI key present** — OpenAI with the configured model
///    (default `gpt-4o-mini`).
/// 5. **Full auto-detection** ([`ProviderFactory::from_env`]).
pub fn resolve_provider(
    config: &CoachConfig,
) -> Result<Arc<dyn CompletionProvider>, PlanCoachError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", config.model_or_default());
        }
    }

    let (llm, _embedding) =
        ProviderFactory::from_env().map_err(|e| PlanCoachError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(LlmCompletionProvider::new(llm)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NormalizeError;
    use crate::output::Level;
    use crate::pipeline::llm::{Completion, CompletionRequest};
    use async_trait::async_trait;

    const PLAN: &str = "Læringsplan: Jeg vil blive bedre til projektledelse gennem kurser, mentoring og praksis.";

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionProvider for Canned {
        async fn complete(&self, _req: &CompletionRequest) -> Result<Completion, PlanCoachError> {
            Ok(Completion {
                content: self.0.to_string(),
                prompt_tokens: 120,
                completion_tokens: 80,
            })
        }
    }

    struct FixedText(&'static str);

    #[async_trait]
    impl PlanTextExtractor for FixedText {
        async fn extract_text(&self, _pdf: &[u8]) -> Result<String, PlanCoachError> {
            Ok(self.0.to_string())
        }
    }

    fn config_with(answer: &'static str) -> CoachConfig {
        CoachConfig::builder()
            .provider(Arc::new(Canned(answer)))
            .extractor(Arc::new(FixedText(PLAN)))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn generate_normalises_answer() {
        let config = config_with(
            r#"Sure! {"actions":[{"title":"Find en mentor","impact":"High","effort":"Low","steps":["Spørg din leder"]}]}"#,
        );
        let out = generate(PLAN, &config).await.unwrap();
        assert_eq!(out.suggestions.len(), 1);
        assert_eq!(out.suggestions.actions[0].impact, Level::High);
        assert_eq!(out.stats.input_tokens, 120);
        assert_eq!(out.stats.retries, 0);
        assert!(!out.stats.plan_truncated);
    }

    #[tokio::test]
    async fn generate_rejects_short_plan_before_calling_provider() {
        let err = generate("for kort", &config_with("{}")).await.unwrap_err();
        assert!(matches!(err, PlanCoachError::InputTooShort { .. }));
    }

    #[tokio::test]
    async fn generate_surfaces_normalize_errors() {
        let err = generate(PLAN, &config_with("")).await.unwrap_err();
        assert!(matches!(
            err,
            PlanCoachError::Normalize(NormalizeError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn generate_from_pdf_uses_extracted_text() {
        let config = config_with(r#"{"actions":[{"title":"A"},{"title":"B"}]}"#);
        let out = generate_from_pdf(b"%PDF-1.7 ...", Some("application/pdf"), &config)
            .await
            .unwrap();
        assert_eq!(out.suggestions.len(), 2);
        assert_eq!(out.stats.plan_chars, PLAN.chars().count());
    }

    #[tokio::test]
    async fn extract_plan_rejects_non_pdf() {
        let err = extract_plan_from_pdf(b"GIF89a", Some("image/gif"), &config_with("{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlanCoachError::UnsupportedFileType { .. }));
    }

    #[tokio::test]
    async fn extract_plan_rejects_short_pdf_text() {
        let config = CoachConfig::builder()
            .extractor(Arc::new(FixedText("Kun en titel")))
            .build()
            .unwrap();
        let err = extract_plan_from_pdf(b"%PDF-1.7", Some("application/pdf"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanCoachError::InputTooShort { .. }));
    }

    #[test]
    fn generate_sync_works_outside_runtime() {
        let config = config_with(r#"{"actions":[]}"#);
        let out = generate_sync(PLAN, &config).unwrap();
        assert!(out.suggestions.is_empty());
    }
}
