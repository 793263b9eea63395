//! Completion stage: send the plan to the model, with timeout and retries.
//!
//! [`CompletionProvider`] is the seam between this crate and whatever
//! produces text. Production code uses [`LlmCompletionProvider`], a thin
//! adapter over `edgequake_llm`'s multi-vendor [`LLMProvider`]; tests plug in
//! scripted providers. Prompt wording lives in [`crate::prompts`] so it can
//! change without touching retry or error handling here.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 from LLM APIs are transient and common at peak times.
//! Exponential backoff (`retry_backoff_ms * 2^attempt`) with the default
//! 500 ms base and 2 retries waits 500 ms → 1 s, so a user waits at most a
//! few seconds extra before getting a clean error.

use crate::config::CoachConfig;
use crate::error::PlanCoachError;
use crate::pipeline::input::PlanInput;
use crate::prompts;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// One completion call: prompts plus generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Text returned by a provider plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Anything that can answer a [`CompletionRequest`] with text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, PlanCoachError>;
}

/// Adapter from `edgequake_llm` providers to [`CompletionProvider`].
#[derive(Clone)]
pub struct LlmCompletionProvider {
    inner: Arc<dyn LLMProvider>,
}

impl LlmCompletionProvider {
    pub fn new(inner: Arc<dyn LLMProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CompletionProvider for LlmCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, PlanCoachError> {
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.user.as_str()),
        ];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .inner
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| PlanCoachError::ProviderUnavailable {
                attempts: 1,
                detail: format!("{}", e),
            })?;

        Ok(Completion {
            content: response.content,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        })
    }
}

/// Build the completion request for `plan` from the configuration.
pub fn build_request(plan: &PlanInput, config: &CoachConfig) -> CompletionRequest {
    let system = match config.system_prompt.as_deref() {
        Some(custom) => custom.to_string(),
        None => prompts::system_prompt(config.labels, &config.limits),
    };

    CompletionRequest {
        system,
        user: prompts::user_prompt(plan.as_str(), &config.limits),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Delay before retry `attempt` (1-based). Saturates instead of overflowing
/// when `max_retries` is set on the struct directly.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Ask the provider for suggestions on `plan`.
///
/// Each attempt is bounded by `api_timeout_secs`. Returns the completion and
/// the number of retries it took.
pub async fn request_suggestions(
    provider: &dyn CompletionProvider,
    plan: &PlanInput,
    config: &CoachConfig,
) -> Result<(Completion, u32), PlanCoachError> {
    let request = build_request(plan, config);
    let call_timeout = Duration::from_secs(config.api_timeout_secs);
    let start = Instant::now();

    let mut last_err: Option<PlanCoachError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Completion retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, provider.complete(&request)).await {
            Ok(Ok(completion)) => {
                debug!(
                    "Completion: {} input tokens, {} output tokens, {:?}",
                    completion.prompt_tokens,
                    completion.completion_tokens,
                    start.elapsed()
                );
                return Ok((completion, attempt));
            }
            Ok(Err(e)) => {
                warn!("Completion attempt {} failed — {}", attempt + 1, e);
                last_err = Some(e);
            }
            Err(_) => {
                warn!(
                    "Completion attempt {} timed out after {}s",
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(PlanCoachError::ApiTimeout {
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    let attempts = config.max_retries + 1;
    Err(match last_err {
        Some(e @ PlanCoachError::ApiTimeout { .. }) => e,
        Some(PlanCoachError::ProviderUnavailable { detail, .. }) => {
            PlanCoachError::ProviderUnavailable { attempts, detail }
        }
        Some(other) => PlanCoachError::ProviderUnavailable {
            attempts,
            detail: other.to_string(),
        },
        None => PlanCoachError::ProviderUnavailable {
            attempts,
            detail: "Unknown error".to_string(),
        },
    })
}
