//! Error types for the plancoach library.
//!
//! Two error types reflect two stages that fail for different reasons:
//!
//! * [`PlanCoachError`] — everything that can stop a single request: bad
//!   input, an unusable upload, an unreachable provider, or a model answer
//!   that could not be normalised. Returned from the top-level `generate*`
//!   functions and mapped to an HTTP status by [`crate::server`].
//!
//! * [`NormalizeError`] — the three ways [`crate::pipeline::normalize`] can
//!   reject raw model text. Wrapped into [`PlanCoachError::Normalize`] by
//!   the orchestration layer, but kept separate so the normaliser has no
//!   dependency on anything outside its own stage.
//!
//! None of these are fatal to the process: the server logs the error, sends
//! a short message to the caller and keeps serving.

use std::path::PathBuf;
use thiserror::Error;

/// All request-level errors returned by the plancoach library.
#[derive(Debug, Error)]
pub enum PlanCoachError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Plan text (typed or extracted from a PDF) is below the minimum length.
    #[error("Plan text is too short: {chars} characters, minimum is {min}")]
    InputTooShort { chars: usize, min: usize },

    /// Request body had no usable `planText` field.
    #[error("Request is missing the planText field: {detail}")]
    MissingPlanText { detail: String },

    /// JSON request body exceeds the body cap.
    #[error("Request body exceeds the limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Multipart request had no `pdf` field.
    #[error("Upload is missing the '{field}' field")]
    MissingUpload { field: String },

    /// Upload is not a PDF, either by declared MIME type or by magic bytes.
    #[error("Unsupported file type '{content_type}': only application/pdf is accepted")]
    UnsupportedFileType { content_type: String },

    /// Multipart body could not be read.
    #[error("Upload could not be read: {detail}")]
    InvalidUpload { detail: String },

    /// Upload exceeds the configured size cap.
    #[error("Upload exceeds the limit of {limit} bytes")]
    FileTooLarge { limit: usize },

    /// PDF could not be parsed by the text extractor.
    #[error("PDF could not be read: {detail}")]
    CorruptPdf { detail: String },

    /// PDF parsed fine but contains no text (scanned or image-only).
    #[error("PDF contains no extractable text")]
    NoExtractableText,

    /// Local PDF path does not exist (CLI input).
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file (CLI input).
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed (CLI input).
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout (CLI input).
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every attempt to reach the completion provider failed.
    #[error("LLM provider unavailable after {attempts} attempt(s): {detail}")]
    ProviderUnavailable { attempts: u32, detail: String },

    /// A single completion call exceeded the per-call timeout.
    #[error("LLM call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The model answered, but the answer could not be normalised.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    // ── Service errors ────────────────────────────────────────────────────
    /// Caller exceeded the request quota.
    #[error("Rate limit exceeded for client {client}")]
    RateLimited { client: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why raw model output could not be turned into a
/// [`crate::output::SuggestionSet`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The provider returned no content at all.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// Neither the whole text nor the embedded `{…}` block is valid JSON.
    /// `detail` is the parse error of the whole text.
    #[error("LLM response is not valid JSON: {detail}")]
    MalformedResponse { detail: String },

    /// Valid JSON without an `actions` array at the top level.
    #[error("LLM response has an unexpected shape: {detail}")]
    UnexpectedShape { detail: String },
}
