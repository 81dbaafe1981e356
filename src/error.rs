//! Error types for the edgequake-mathsnap library.
//!
//! A run either produces a report, ends with no actionable content, or fails
//! with a [`MathSnapError`]. "No marker found" is deliberately *not* an error:
//! it is reported as [`crate::output::SolveOutcome::NoMatch`].
//!
//! Variants are grouped by the stage that raises them. [`MathSnapError::kind`]
//! collapses them into the coarse taxonomy callers usually branch on
//! (extraction vs. generation vs. render), so the CLI can pick an exit message
//! without matching every variant.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-mathsnap library.
#[derive(Debug, Error)]
pub enum MathSnapError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input image was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The bytes were read but are not a decodable PNG/JPEG image.
    #[error("'{source_name}' is not a supported image: {detail}")]
    InvalidImage { source_name: String, detail: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The OCR collaborator was unreachable or rejected the request.
    #[error("Text extraction failed ({backend}): {detail}")]
    Extraction { backend: String, detail: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The completion collaborator was unreachable or rejected the prompt.
    #[error("Generation failed after {retries} retries: {detail}")]
    Generation { retries: u32, detail: String },

    /// A completion call exceeded the configured timeout on every attempt.
    #[error("Generation timed out after {secs}s")]
    GenerationTimeout { secs: u64 },

    // ── Render errors ─────────────────────────────────────────────────────
    /// Canvas measurement, rasterisation or PNG encoding failed.
    #[error("Report rendering failed: {detail}")]
    Render { detail: String },

    /// No usable TrueType/OpenType font could be loaded.
    #[error(
        "No usable font found (tried: {tried}).\n\
Pass --font /path/to/font.ttf or install DejaVu Sans / Liberation Sans."
    )]
    FontUnavailable { tried: String },

    /// Could not create or write the output PNG file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`MathSnapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Extraction,
    Generation,
    Render,
    Config,
    Internal,
}

impl MathSnapError {
    /// The pipeline stage family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MathSnapError::FileNotFound { .. }
            | MathSnapError::PermissionDenied { .. }
            | MathSnapError::InvalidImage { .. }
            | MathSnapError::DownloadFailed { .. } => ErrorKind::Input,
            MathSnapError::Extraction { .. } => ErrorKind::Extraction,
            MathSnapError::ProviderNotConfigured { .. }
            | MathSnapError::Generation { .. }
            | MathSnapError::GenerationTimeout { .. } => ErrorKind::Generation,
            MathSnapError::Render { .. }
            | MathSnapError::FontUnavailable { .. }
            | MathSnapError::OutputWriteFailed { .. } => ErrorKind::Render,
            MathSnapError::InvalidConfig(_) => ErrorKind::Config,
            MathSnapError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn render(detail: impl std::fmt::Display) -> Self {
        MathSnapError::Render {
            detail: detail.to_string(),
        }
    }
}
