//! Configuration types for plan-to-actions generation and the HTTP service.
//!
//! Generation behaviour is controlled through [`CoachConfig`], built via its
//! [`CoachConfigBuilder`]. The HTTP surface adds [`ServerConfig`] for the
//! knobs that only make sense behind a socket (bind address, rate limits,
//! static files).
//!
//! Defaults: `gpt-4o-mini` at temperature 0.7 with 1 500 output tokens, a
//! 50-character minimum plan and a 10 MiB upload cap.

use crate::error::PlanCoachError;
use crate::output::Level;
use crate::pipeline::extract::PlanTextExtractor;
use crate::pipeline::llm::CompletionProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

/// Default model when neither the caller nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Upper bound on completion retries accepted by the builder.
pub const MAX_RETRIES: u32 = 10;

/// Configuration for generating suggestions from a learning plan.
///
/// Built via [`CoachConfig::builder()`] or using [`CoachConfig::default()`].
///
/// # Example
/// ```rust
/// use plancoach::{CoachConfig, LabelSet};
///
/// let config = CoachConfig::builder()
///     .model("gpt-4o-mini")
///     .temperature(0.7)
///     .labels(LabelSet::DanishMedium)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CoachConfig {
    /// LLM model identifier, e.g. "gpt-4o-mini". If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed completion provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn CompletionProvider>>,

    /// PDF text extractor. If None, uses [`crate::pipeline::extract::PdfExtractor`].
    pub extractor: Option<Arc<dyn PlanTextExtractor>>,

    /// Sampling temperature for the completion. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 1500.
    ///
    /// Three actions with six steps each fit comfortably in ~900 tokens of
    /// Danish text; 1 500 leaves room for the model's formatting habits.
    pub max_tokens: usize,

    /// Retry attempts on a failed completion call. Default: 2, capped at
    /// [`MAX_RETRIES`] by the builder.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-completion-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom system prompt. If None, rendered from [`crate::prompts`].
    pub system_prompt: Option<String>,

    /// Vocabulary for impact/effort ratings. Default: [`LabelSet::English`].
    pub labels: LabelSet,

    /// Size bounds applied by the normaliser.
    pub limits: NormalizeLimits,

    /// Minimum trimmed plan length in characters. Default: 50.
    pub min_plan_chars: usize,

    /// Plan text is cut to this many characters before it is sent. Default: 20 000.
    pub max_plan_chars: usize,

    /// Largest accepted PDF upload in bytes. Default: 10 MiB.
    pub max_upload_bytes: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            extractor: None,
            temperature: 0.7,
            max_tokens: 1500,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            system_prompt: None,
            labels: LabelSet::default(),
            limits: NormalizeLimits::default(),
            min_plan_chars: 50,
            max_plan_chars: 20_000,
            max_upload_bytes: 10 * 1024 * 1024,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for CoachConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoachConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field(
                "provider",
                &self.provider.as_ref().map(|_| "<dyn CompletionProvider>"),
            )
            .field(
                "extractor",
                &self.extractor.as_ref().map(|_| "<dyn PlanTextExtractor>"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("labels", &self.labels)
            .field("limits", &self.limits)
            .field("min_plan_chars", &self.min_plan_chars)
            .field("max_plan_chars", &self.max_plan_chars)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl CoachConfig {
    /// Create a new builder for `CoachConfig`.
    pub fn builder() -> CoachConfigBuilder {
        CoachConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model to request, falling back to [`DEFAULT_MODEL`].
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`CoachConfig`].
#[derive(Debug)]
pub struct CoachConfigBuilder {
    config: CoachConfig,
}

impl CoachConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn PlanTextExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn labels(mut self, labels: LabelSet) -> Self {
        self.config.labels = labels;
        self
    }

    pub fn limits(mut self, limits: NormalizeLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn min_plan_chars(mut self, n: usize) -> Self {
        self.config.min_plan_chars = n;
        self
    }

    pub fn max_plan_chars(mut self, n: usize) -> Self {
        self.config.max_plan_chars = n;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CoachConfig, PlanCoachError> {
        let c = &self.config;
        if c.min_plan_chars == 0 {
            return Err(PlanCoachError::InvalidConfig(
                "Minimum plan length must be ≥ 1".into(),
            ));
        }
        if c.max_plan_chars < c.min_plan_chars {
            return Err(PlanCoachError::InvalidConfig(format!(
                "Maximum plan length ({}) is below the minimum ({})",
                c.max_plan_chars, c.min_plan_chars
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(PlanCoachError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.limits.max_actions == 0 {
            return Err(PlanCoachError::InvalidConfig(
                "At least one action must be allowed".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Normaliser bounds ────────────────────────────────────────────────────

/// Size bounds the normaliser enforces on model output.
///
/// All string bounds count Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeLimits {
    pub max_actions: usize,
    pub max_title_chars: usize,
    pub max_description_chars: usize,
    pub max_steps: usize,
    pub max_step_chars: usize,
}

impl Default for NormalizeLimits {
    fn default() -> Self {
        Self {
            max_actions: 3,
            max_title_chars: 120,
            max_description_chars: 500,
            max_steps: 6,
            max_step_chars: 200,
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Vocabulary used to read and write impact/effort ratings.
///
/// The Danish variants of the service disagreed on the middle label
/// ("Medium" vs "Middel"), so the set is a configuration choice rather than
/// something inferred from model output. Only the labels of the selected
/// set are recognised; anything else becomes the set's default label.
///
/// | Set | Low | Medium | High |
/// |-----|-----|--------|------|
/// | `English` | Low | Medium | High |
/// | `DanishMedium` | Lav | Medium | Høj |
/// | `DanishMiddel` | Lav | Middel | Høj |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelSet {
    #[default]
    English,
    DanishMedium,
    DanishMiddel,
}

impl LabelSet {
    /// The label this set uses for `level`.
    pub fn label(self, level: Level) -> &'static str {
        match (self, level) {
            (LabelSet::English, Level::Low) => "Low",
            (LabelSet::English, Level::Medium) => "Medium",
            (LabelSet::English, Level::High) => "High",
            (LabelSet::DanishMedium, Level::Low) => "Lav",
            (LabelSet::DanishMedium, Level::Medium) => "Medium",
            (LabelSet::DanishMedium, Level::High) => "Høj",
            (LabelSet::DanishMiddel, Level::Low) => "Lav",
            (LabelSet::DanishMiddel, Level::Medium) => "Middel",
            (LabelSet::DanishMiddel, Level::High) => "Høj",
        }
    }

    /// Parse a label of this set. Surrounding whitespace is ignored; the
    /// comparison is otherwise exact.
    pub fn parse(self, raw: &str) -> Option<Level> {
        let raw = raw.trim();
        Level::ALL
            .into_iter()
            .find(|&level| self.label(level) == raw)
    }

    /// Labels in prompt order (high → low), joined with `/`.
    pub fn prompt_choices(self) -> String {
        format!(
            "{}/{}/{}",
            self.label(Level::High),
            self.label(Level::Medium),
            self.label(Level::Low)
        )
    }
}

// ── HTTP service ─────────────────────────────────────────────────────────

/// Settings that only apply when running the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address to bind. Default: 0.0.0.0:3000.
    pub addr: SocketAddr,

    /// Directory served for non-API paths (index.html etc.). Default: `public`.
    pub static_dir: Option<PathBuf>,

    /// Completion calls allowed in flight at once. Default: 10.
    pub max_concurrent_requests: usize,

    /// Sustained per-client quota on the API routes. Default: 10/minute.
    pub rate_limit_per_minute: u32,

    /// Requests a client may make back-to-back before the quota applies. Default: 5.
    pub rate_limit_burst: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000)),
            static_dir: Some(PathBuf::from("public")),
            max_concurrent_requests: 10,
            rate_limit_per_minute: 10,
            rate_limit_burst: 5,
        }
    }
}
