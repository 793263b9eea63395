//! PDF text extraction.
//!
//! Extraction sits behind [`PlanTextExtractor`] so the HTTP layer and tests
//! can swap it out; the default [`PdfExtractor`] wraps `pdf-extract`.
//!
//! ## Why spawn_blocking?
//!
//! `pdf-extract` is synchronous and CPU-bound (it decompresses and decodes
//! every content stream), and it panics on some malformed documents. Running
//! it on the blocking pool keeps Tokio workers free, and the `JoinError`
//! from a panicking task turns into an ordinary [`PlanCoachError::CorruptPdf`]
//! instead of taking the request handler down with it.

use crate::error::PlanCoachError;
use crate::pipeline::clean::clean_plan_text;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Turns PDF bytes into plain text.
#[async_trait]
pub trait PlanTextExtractor: Send + Sync {
    /// Extract the document's text. Implementations should fail with
    /// [`PlanCoachError::CorruptPdf`] for unreadable input.
    async fn extract_text(&self, pdf: &[u8]) -> Result<String, PlanCoachError>;
}

/// Default extractor backed by the `pdf-extract` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

#[async_trait]
impl PlanTextExtractor for PdfExtractor {
    async fn extract_text(&self, pdf: &[u8]) -> Result<String, PlanCoachError> {
        let bytes = pdf.to_vec();
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| {
                warn!("PDF extraction task failed: {}", e);
                PlanCoachError::CorruptPdf {
                    detail: "extractor crashed on this document".to_string(),
                }
            })?
            .map_err(|e| PlanCoachError::CorruptPdf {
                detail: e.to_string(),
            })
    }
}

/// Extract and clean the text of a PDF.
///
/// Fails with [`PlanCoachError::NoExtractableText`] when nothing but
/// whitespace survives cleanup (scanned or image-only documents).
pub async fn extract_plan_text(
    extractor: &dyn PlanTextExtractor,
    pdf: &[u8],
) -> Result<String, PlanCoachError> {
    let raw = extractor.extract_text(pdf).await?;
    let cleaned = clean_plan_text(&raw);
    debug!(
        "Extracted {} characters ({} before cleanup)",
        cleaned.chars().count(),
        raw.chars().count()
    );

    if cleaned.is_empty() {
        return Err(PlanCoachError::NoExtractableText);
    }
    Ok(cleaned)
}
