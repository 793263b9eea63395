//! # plancoach
//!
//! Turn a learning plan into three concrete, rated actions using an LLM.
//!
//! A learner pastes a plan (or uploads it as a PDF); the model is asked for
//! actions in a fixed JSON shape; whatever comes back is treated as
//! untrusted text and normalised into a bounded [`SuggestionSet`] before it
//! reaches the caller.
//!
//! ## Pipeline Overview
//!
//! ```text
//! plan text / PDF
//!  │
//!  ├─ 1. Input      trim, 50-char minimum, 20 000-char cap, upload checks
//!  ├─ 2. Extract    PDF → text (pdf-extract, spawn_blocking) + cleanup
//!  ├─ 3. LLM        one completion call with timeout and retry/backoff
//!  ├─ 4. Normalize  JSON recovery, ≤3 actions, bounded strings, typed ratings
//!  └─ 5. Output     { "actions": [...] } + per-request stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plancoach::{generate, CoachConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = CoachConfig::default();
//!     let plan = "Jeg vil lære at lede møder bedre. Jeg deltager i et kursus \
//!                 og beder min leder om feedback efter hvert teammøde.";
//!     let output = generate(plan, &config).await?;
//!     println!("{}", output.suggestions.to_json(config.labels));
//!     Ok(())
//! }
//! ```
//!
//! The normaliser is usable on its own:
//!
//! ```rust
//! let set = plancoach::normalize(r#"{"actions":[{"title":"Læs dagligt"}]}"#).unwrap();
//! assert_eq!(set.actions[0].title, "Læs dagligt");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `plancoach` binary (clap + anyhow + dotenv + tracing-subscriber) |
//!
//! Disable `cli` when embedding only the library or the router:
//! ```toml
//! plancoach = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CoachConfig, CoachConfigBuilder, LabelSet, NormalizeLimits, ServerConfig};
pub use error::{NormalizeError, PlanCoachError};
pub use generate::{extract_plan_from_pdf, generate, generate_from_pdf, generate_sync};
pub use output::{GenerationOutput, GenerationStats, Level, SuggestionAction, SuggestionSet};
pub use pipeline::extract::{PdfExtractor, PlanTextExtractor};
pub use pipeline::input::PlanInput;
pub use pipeline::llm::{Completion, CompletionProvider, CompletionRequest};
pub use pipeline::normalize::{normalize, Normalizer};
pub use server::{router, serve, AppState};
