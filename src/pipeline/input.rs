//! Input validation: plan text bounds and PDF upload checks.
//!
//! Plan text arrives either typed into a form or extracted from a PDF. Both
//! paths end in [`PlanInput::new`], so the minimum length and the cap are
//! enforced in exactly one place.
//!
//! PDF bytes arrive either as a multipart upload ([`check_upload`]) or, from
//! the CLI, as a local path or URL ([`resolve_pdf_source`]). Either way the
//! `%PDF` magic bytes are checked before anything is handed to the extractor
//! so a renamed JPEG yields a clear error instead of a parser failure.

use crate::error::PlanCoachError;
use crate::pipeline::normalize::truncate_chars;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};

/// MIME type accepted for uploads.
pub const PDF_MIME: &str = "application/pdf";

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Plan text that has passed the length checks and is ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanInput {
    text: String,
    truncated: bool,
}

impl PlanInput {
    /// Trim `raw`, reject it if shorter than `min_chars`, and cut it to
    /// `max_chars`. Lengths are counted in characters.
    pub fn new(raw: &str, min_chars: usize, max_chars: usize) -> Result<Self, PlanCoachError> {
        let trimmed = raw.trim();
        let chars = trimmed.chars().count();

        if chars < min_chars {
            return Err(PlanCoachError::InputTooShort {
                chars,
                min: min_chars,
            });
        }

        let truncated = chars > max_chars;
        let text = if truncated {
            debug!("Plan text cut from {} to {} characters", chars, max_chars);
            truncate_chars(trimmed, max_chars)
        } else {
            trimmed.to_string()
        };

        Ok(Self { text, truncated })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Length in characters.
    pub fn chars(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the text was cut to the configured maximum.
    pub fn was_truncated(&self) -> bool {
        self.truncated
    }
}

/// Validate an uploaded file before extraction.
///
/// Size is checked first so an oversized non-PDF reports the size problem.
pub fn check_upload(
    content_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<(), PlanCoachError> {
    if bytes.len() > max_bytes {
        debug!("Rejected {}-byte PDF (limit {})", bytes.len(), max_bytes);
        return Err(PlanCoachError::FileTooLarge { limit: max_bytes });
    }

    let declared = content_type.unwrap_or("").trim();
    let essence = declared.split(';').next().unwrap_or("").trim();
    if !essence.eq_ignore_ascii_case(PDF_MIME) {
        return Err(PlanCoachError::UnsupportedFileType {
            content_type: declared.to_string(),
        });
    }

    if !has_pdf_magic(bytes) {
        return Err(PlanCoachError::UnsupportedFileType {
            content_type: format!("{declared} (content is not a PDF)"),
        });
    }

    Ok(())
}

fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[..4] == PDF_MAGIC
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load PDF bytes from a local path or an HTTP/HTTPS URL.
pub async fn resolve_pdf_source(
    input: &str,
    max_bytes: usize,
    timeout_secs: u64,
) -> Result<Vec<u8>, PlanCoachError> {
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input)?
    };

    if bytes.len() > max_bytes {
        debug!("Rejected {}-byte PDF (limit {})", bytes.len(), max_bytes);
        return Err(PlanCoachError::FileTooLarge { limit: max_bytes });
    }
    if !has_pdf_magic(&bytes) {
        return Err(PlanCoachError::UnsupportedFileType {
            content_type: format!("{input} (content is not a PDF)"),
        });
    }
    Ok(bytes)
}

fn read_local(path_str: &str) -> Result<Vec<u8>, PlanCoachError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(PlanCoachError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PlanCoachError::PermissionDenied { path });
        }
        Err(_) => return Err(PlanCoachError::FileNotFound { path }),
    };

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| PlanCoachError::Internal(format!("Failed to read {}: {e}", path.display())))?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, PlanCoachError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PlanCoachError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PlanCoachError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PlanCoachError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PlanCoachError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PlanCoachError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
