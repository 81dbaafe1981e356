//! Result types returned by the solve entry points.

use crate::pipeline::dispatch::Marker;
use crate::pipeline::ocr::ExtractedText;
use crate::pipeline::postprocess::GeneratedText;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the rendered report should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactTarget {
    /// Write to this path (temp file + rename).
    File(PathBuf),
    /// Write `<stem>_solution.png` / `<stem>_feedback.png` next to the input,
    /// or into `output_dir` when configured.
    Derived,
    /// Keep the PNG in memory and return it in [`ReportArtifact::png`].
    Buffer,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SolveOutcome {
    /// No marker token in the extracted text. Nothing was rendered.
    NoMatch {
        extracted: ExtractedText,
        stats: SolveStats,
    },
    /// A report was generated.
    Reported(ReportOutput),
}

impl SolveOutcome {
    pub fn marker(&self) -> Marker {
        match self {
            SolveOutcome::NoMatch { .. } => Marker::None,
            SolveOutcome::Reported(r) => r.mode,
        }
    }

    pub fn report(&self) -> Option<&ReportOutput> {
        match self {
            SolveOutcome::Reported(r) => Some(r),
            SolveOutcome::NoMatch { .. } => None,
        }
    }

    pub fn stats(&self) -> &SolveStats {
        match self {
            SolveOutcome::NoMatch { stats, .. } => stats,
            SolveOutcome::Reported(r) => &r.stats,
        }
    }
}

/// A generated report and everything that went into it.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    pub mode: Marker,
    pub problem: String,
    /// Present in CHECK mode only.
    pub student_work: Option<String>,
    pub generated: GeneratedText,
    pub artifact: ReportArtifact,
    pub stats: SolveStats,
}

/// The rendered PNG.
#[derive(Debug, Clone, Serialize)]
pub struct ReportArtifact {
    pub width: u32,
    pub height: u32,
    /// Wrapped body lines drawn, across all sections.
    pub wrapped_lines: usize,
    /// Text ran past the bottom edge (pre-measured sizing only).
    pub clipped: bool,
    /// Written location for [`ArtifactTarget::File`].
    pub path: Option<PathBuf>,
    /// PNG bytes for [`ArtifactTarget::Buffer`].
    #[serde(skip)]
    pub png: Option<Vec<u8>>,
}

/// Timing and usage for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveStats {
    pub preprocess_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub retries: u32,
}

/// One entry of a batch run.
#[derive(Debug)]
pub struct BatchItem {
    pub input: String,
    pub result: Result<SolveOutcome, crate::error::MathSnapError>,
}
