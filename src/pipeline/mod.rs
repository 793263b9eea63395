//! Pipeline stages for turning a learning plan into suggested actions.
//!
//! Each submodule implements one step and is testable on its own; only
//! [`llm`] does network I/O and only [`extract`] does heavy CPU work.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌──────── PDF bytes ─────────┐
//!            │  input::check_upload       │
//!            │  extract ──▶ clean         │
//!            └─────────────┬──────────────┘
//!                          ▼
//! plan text ──▶ input::PlanInput ──▶ llm ──▶ normalize ──▶ SuggestionSet
//! ```
//!
//! 1. [`input`]     — upload checks, plan length bounds, CLI path/URL loading
//! 2. [`extract`]   — PDF → text on the blocking pool
//! 3. [`clean`]     — strip layout debris from extracted text
//! 4. [`llm`]       — completion call with timeout and retry/backoff
//! 5. [`normalize`] — untrusted model text → bounded, typed suggestions

pub mod clean;
pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
