//! # edgequake-mathsnap
//!
//! Solve or check photographed handwritten math and render the explanation as
//! a PNG report.
//!
//! ## How it works
//!
//! A photo is read by an OCR collaborator. The recognised text is scanned
//! for a marker token written on the page:
//!
//! * `QTAR` — everything else on the page is a problem to **solve**.
//! * `CTAR` — text before the marker is the problem, text after it is the
//!   student's attempt, to be **checked**.
//!
//! The matching prompt goes to an LLM; its answer is cleaned up, laid out on
//! an 800 px wide canvas and written next to the photo as
//! `<stem>_solution.png` or `<stem>_feedback.png`. A page without a marker
//! produces no report and no error.
//!
//! ## Pipeline Overview
//!
//! ```text
//! photo
//!  │
//!  ├─ 1. Input       resolve local file or download from URL
//!  ├─ 2. Preprocess  resize to 1200 px, grayscale, sharpen (spawn_blocking)
//!  ├─ 3. OCR         Google Vision TEXT_DETECTION or a vision LLM
//!  ├─ 4. Dispatch    QTAR → solve, CTAR → check, else no match
//!  ├─ 5. LLM         plain-text solution or feedback, retry + timeout
//!  ├─ 6. Polish      strip $ and \boxed{}, fallback text on empty replies
//!  ├─ 7. Layout      greedy word wrap, canvas height from wrapped lines
//!  └─ 8. Output      ab_glyph raster → PNG → atomic write
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_mathsnap::{solve_to_file, SolveOutcome, SolverConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // LLM provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = SolverConfig::builder()
//!         .google_api_key(std::env::var("GOOGLE_API_KEY")?)
//!         .build()?;
//!     match solve_to_file("homework.jpg", &config).await? {
//!         SolveOutcome::Reported(r) => eprintln!("wrote {:?}", r.artifact.path),
//!         SolveOutcome::NoMatch { .. } => eprintln!("no QTAR/CTAR marker on the page"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Custom collaborators
//!
//! [`Solver::new`] takes any [`TextRecognizer`] and [`TextCompleter`], so a
//! different OCR service or a cached LLM can be plugged in without touching
//! the pipeline.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mathsnap` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-mathsnap = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod solve;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{LayoutStrategy, OcrBackend, PreprocessOptions, SolverConfig, SolverConfigBuilder};
pub use error::{ErrorKind, MathSnapError};
pub use output::{ArtifactTarget, BatchItem, ReportArtifact, ReportOutput, SolveOutcome, SolveStats};
pub use pipeline::dispatch::{classify, Dispatch, Marker};
pub use pipeline::input::{ImageInput, InputOrigin};
pub use pipeline::llm::{Completion, LlmCompleter, TextCompleter};
pub use pipeline::ocr::{ExtractedText, GoogleVisionRecognizer, Recognition, TextRecognizer, VisionLlmRecognizer};
pub use pipeline::postprocess::GeneratedText;
pub use pipeline::raster::FontSet;
pub use progress::{NoopProgressCallback, PipelineStage, ProgressCallback, SolveProgressCallback};
pub use solve::{solve, solve_batch, solve_bytes, solve_sync, solve_to_file, Solver};
