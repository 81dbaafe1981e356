//! Pipeline controller and the public solve entry points.
//!
//! A [`Solver`] owns its configuration and the two injected collaborators
//! (OCR and completion). One call to [`Solver::run`] drives a single image
//! through
//!
//! ```text
//! IDLE → [PREPROCESSING] → EXTRACTING → DISPATCHING
//!      → SOLVING | CHECKING | NO_MATCH → RENDERING → DONE
//! ```
//!
//! Any collaborator error aborts the run and is returned unchanged. Nothing
//! is written to disk unless rendering and encoding both succeeded.

use crate::config::{OcrBackend, SolverConfig};
use crate::error::MathSnapError;
use crate::output::{ArtifactTarget, BatchItem, ReportArtifact, ReportOutput, SolveOutcome, SolveStats};
use crate::pipeline::dispatch::{self, Dispatch};
use crate::pipeline::input::{self, ImageInput};
use crate::pipeline::layout::Report;
use crate::pipeline::llm::{self, LlmCompleter, TextCompleter};
use crate::pipeline::ocr::{self, GoogleVisionRecognizer, TextRecognizer, VisionLlmRecognizer};
use crate::pipeline::postprocess::{self, GenerationMode};
use crate::pipeline::raster::{self, FontSet};
use crate::pipeline::{output, preprocess};
use crate::progress::PipelineStage;
use crate::prompts;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Runs the solve/check pipeline with injected collaborators.
pub struct Solver {
    config: SolverConfig,
    recognizer: Arc<dyn TextRecognizer>,
    completer: Arc<dyn TextCompleter>,
    fonts: OnceCell<Arc<FontSet>>,
}

impl Solver {
    /// Build a solver around explicit collaborators.
    pub fn new(
        config: SolverConfig,
        recognizer: Arc<dyn TextRecognizer>,
        completer: Arc<dyn TextCompleter>,
    ) -> Self {
        Self {
            config,
            recognizer,
            completer,
            fonts: OnceCell::new(),
        }
    }

    /// Build a solver with the default collaborators chosen by `config`.
    ///
    /// The LLM provider is resolved once and shared by the completion adapter
    /// and, for [`OcrBackend::VisionLlm`], the OCR adapter.
    pub fn from_config(config: SolverConfig) -> Result<Self, MathSnapError> {
        let provider = llm::resolve_provider(&config)?;

        let recognizer: Arc<dyn TextRecognizer> = match config.ocr {
            OcrBackend::GoogleVision => {
                let key = config.google_api_key.clone().ok_or_else(|| {
                    MathSnapError::ProviderNotConfigured {
                        provider: OcrBackend::GoogleVision.name().to_string(),
                        hint: "Set GOOGLE_API_KEY or pass --google-api-key, \
                               or use --ocr vision-llm."
                            .to_string(),
                    }
                })?;
                Arc::new(GoogleVisionRecognizer::new(
                    config.google_vision_endpoint.clone(),
                    key,
                    config.api_timeout_secs,
                )?)
            }
            OcrBackend::VisionLlm => Arc::new(VisionLlmRecognizer::new(
                Arc::clone(&provider),
                config.api_timeout_secs,
                config.max_tokens,
            )),
        };

        let completer = Arc::new(LlmCompleter::new(provider, &config));
        Ok(Self::new(config, recognizer, completer))
    }

    /// Use `fonts` instead of loading them from `config` on first render.
    pub fn with_fonts(mut self, fonts: FontSet) -> Self {
        self.fonts = OnceCell::from(Arc::new(fonts));
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Resolve `input` (path or URL) and run it, writing the report next to
    /// the input.
    pub async fn solve_path(&self, input: &str) -> Result<SolveOutcome, MathSnapError> {
        let image = match input::resolve_input(input, self.config.download_timeout_secs).await {
            Ok(i) => i,
            Err(e) => {
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_run_error(input, &e.to_string());
                }
                return Err(e);
            }
        };
        self.run(image, ArtifactTarget::Derived).await
    }

    /// Drive one image through the pipeline.
    pub async fn run(
        &self,
        image: ImageInput,
        target: ArtifactTarget,
    ) -> Result<SolveOutcome, MathSnapError> {
        let source = image.display_name();
        info!("Starting run: {}", source);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(&source);
        }

        let result = self.run_inner(&source, image, target).await;

        match &result {
            Ok(outcome) => {
                let path = outcome
                    .report()
                    .and_then(|r| r.artifact.path.as_ref())
                    .map(|p| p.display().to_string());
                info!(
                    "Run complete: {} ({:?}, {}ms)",
                    source,
                    outcome.marker(),
                    outcome.stats().total_duration_ms
                );
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_run_complete(&source, path.as_deref());
                }
            }
            Err(e) => {
                warn!("Run failed: {}: {}", source, e);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_run_error(&source, &e.to_string());
                }
            }
        }
        result
    }

    async fn run_inner(
        &self,
        source: &str,
        image: ImageInput,
        target: ArtifactTarget,
    ) -> Result<SolveOutcome, MathSnapError> {
        let total_start = Instant::now();
        let mut stats = SolveStats::default();
        let ImageInput { bytes, origin } = image;

        // ── Step 1: Preprocess ───────────────────────────────────────────
        let bytes = match self.config.preprocess {
            Some(options) => {
                self.stage(source, PipelineStage::Preprocessing);
                let start = Instant::now();
                let filtered = preprocess::filter_image(bytes, options).await?;
                stats.preprocess_duration_ms = start.elapsed().as_millis() as u64;
                filtered
            }
            None => bytes,
        };

        // ── Step 2: Extract text ─────────────────────────────────────────
        self.stage(source, PipelineStage::Extracting);
        let start = Instant::now();
        let extracted = ocr::extract_text(self.recognizer.as_ref(), &bytes).await?;
        stats.extract_duration_ms = start.elapsed().as_millis() as u64;

        // ── Step 3: Dispatch ─────────────────────────────────────────────
        self.stage(source, PipelineStage::Dispatching);
        let dispatched = dispatch::classify(extracted.as_str());
        let marker = dispatched.marker();
        debug!("{}: marker {:?}", source, marker);

        let (mode, problem, student_work, prompt) = match dispatched {
            Dispatch::NoMatch => {
                self.stage(source, PipelineStage::NoMatch);
                info!("{}: no marker token found, nothing to render", source);
                stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
                return Ok(SolveOutcome::NoMatch { extracted, stats });
            }
            Dispatch::Solve { problem } => {
                self.stage(source, PipelineStage::Solving);
                let prompt = prompts::build_solve_prompt(&problem);
                (GenerationMode::Solve, problem, None, prompt)
            }
            Dispatch::Check {
                problem,
                student_work,
            } => {
                self.stage(source, PipelineStage::Checking);
                let prompt = prompts::build_check_prompt(&problem, &student_work);
                (GenerationMode::Check, problem, Some(student_work), prompt)
            }
        };

        // ── Step 4: Generate ─────────────────────────────────────────────
        let start = Instant::now();
        let completion = self.completer.complete(&prompt).await?;
        stats.llm_duration_ms = start.elapsed().as_millis() as u64;
        stats.input_tokens = completion.input_tokens as u64;
        stats.output_tokens = completion.output_tokens as u64;
        stats.retries = completion.retries;

        let generated = postprocess::normalize_completion(completion.text.as_deref(), mode);
        if generated.is_fallback() {
            warn!("{}: empty completion, using fallback text", source);
        }

        let report = match &student_work {
            None => Report::solution(&problem, generated.as_str()),
            Some(work) => Report::feedback(&problem, work, generated.as_str()),
        };

        // ── Step 5: Render ───────────────────────────────────────────────
        self.stage(source, PipelineStage::Rendering);
        let start = Instant::now();
        let fonts = self.fonts().await?;
        let strategy = self.config.layout;
        let rendered = tokio::task::spawn_blocking(move || {
            raster::render_report(&report, &fonts, strategy)
        })
        .await
        .map_err(|e| MathSnapError::Internal(format!("Render task panicked: {}", e)))??;

        if rendered.clipped {
            warn!("{}: report text runs past the canvas bottom", source);
        }

        let path = match target {
            ArtifactTarget::File(p) => Some(p),
            ArtifactTarget::Derived => {
                output::derive_output_path(&origin, marker, self.config.output_dir.as_deref())
            }
            ArtifactTarget::Buffer => None,
        };

        let png = match &path {
            Some(p) => {
                output::write_atomic(p, &rendered.png).await?;
                info!("{}: wrote {}", source, p.display());
                None
            }
            None => Some(rendered.png),
        };
        stats.render_duration_ms = start.elapsed().as_millis() as u64;

        self.stage(source, PipelineStage::Done);
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        Ok(SolveOutcome::Reported(ReportOutput {
            mode: marker,
            problem,
            student_work,
            generated,
            artifact: ReportArtifact {
                width: rendered.width,
                height: rendered.height,
                wrapped_lines: rendered.wrapped_lines,
                clipped: rendered.clipped,
                path,
                png,
            },
            stats,
        }))
    }

    fn stage(&self, source: &str, stage: PipelineStage) {
        debug!("{}: {}", source, stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage(source, stage);
        }
    }

    async fn fonts(&self) -> Result<Arc<FontSet>, MathSnapError> {
        let fonts = self
            .fonts
            .get_or_try_init(|| async {
                let regular = self.config.font_path.clone();
                let bold = self.config.bold_font_path.clone();
                tokio::task::spawn_blocking(move || {
                    FontSet::load(regular.as_deref(), bold.as_deref()).map(Arc::new)
                })
                .await
                .map_err(|e| MathSnapError::Internal(format!("Font task panicked: {}", e)))
                .and_then(|loaded| loaded)
            })
            .await?;
        Ok(Arc::clone(fonts))
    }
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Solve or check the image at `input` (path or URL) and return the report
/// in memory.
///
/// # Example
/// ```rust,no_run
/// use edgequake_mathsnap::{solve, SolveOutcome, SolverConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SolverConfig::builder().google_api_key("AIza...").build()?;
/// match solve("homework.jpg", &config).await? {
///     SolveOutcome::Reported(r) => println!("{}", r.generated.as_str()),
///     SolveOutcome::NoMatch { extracted, .. } => eprintln!("no marker in: {extracted}"),
/// }
/// # Ok(())
/// # }
/// ```
pub async fn solve(
    input: impl AsRef<str>,
    config: &SolverConfig,
) -> Result<SolveOutcome, MathSnapError> {
    let solver = Solver::from_config(config.clone())?;
    let image = input::resolve_input(input.as_ref(), config.download_timeout_secs).await?;
    solver.run(image, ArtifactTarget::Buffer).await
}

/// Like [`solve`], but writes `<stem>_solution.png` / `<stem>_feedback.png`
/// next to the input (or into `output_dir`).
pub async fn solve_to_file(
    input: impl AsRef<str>,
    config: &SolverConfig,
) -> Result<SolveOutcome, MathSnapError> {
    let solver = Solver::from_config(config.clone())?;
    solver.solve_path(input.as_ref()).await
}

/// Run the pipeline on in-memory PNG/JPEG bytes.
pub async fn solve_bytes(
    bytes: &[u8],
    config: &SolverConfig,
    target: ArtifactTarget,
) -> Result<SolveOutcome, MathSnapError> {
    let solver = Solver::from_config(config.clone())?;
    let image = ImageInput::from_bytes(bytes.to_vec(), "image.png")?;
    solver.run(image, target).await
}

/// Synchronous wrapper around [`solve`].
///
/// Creates a temporary tokio runtime internally.
pub fn solve_sync(
    input: impl AsRef<str>,
    config: &SolverConfig,
) -> Result<SolveOutcome, MathSnapError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MathSnapError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(solve(input, config))
}

/// Run several inputs as independent pipelines, at most
/// `config.concurrency` at a time. Reports are written next to each input.
///
/// Results come back in input order. A failure in one run does not affect
/// the others.
pub async fn solve_batch<S: AsRef<str>>(
    inputs: &[S],
    config: &SolverConfig,
) -> Result<Vec<BatchItem>, MathSnapError> {
    let solver = Solver::from_config(config.clone())?;
    Ok(solver.run_batch(inputs).await)
}

impl Solver {
    /// Batch form of [`Solver::solve_path`].
    pub async fn run_batch<S: AsRef<str>>(&self, inputs: &[S]) -> Vec<BatchItem> {
        let mut items: Vec<(usize, BatchItem)> = stream::iter(inputs.iter().enumerate())
            .map(|(idx, input)| async move {
                let input = input.as_ref().to_string();
                let result = self.solve_path(&input).await;
                (idx, BatchItem { input, result })
            })
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        items.sort_by_key(|(idx, _)| *idx);
        items.into_iter().map(|(_, item)| item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::dispatch::Marker;
    use crate::pipeline::input::InputOrigin;
    use crate::pipeline::llm::Completion;
    use crate::pipeline::ocr::Recognition;
    use crate::pipeline::postprocess::{GeneratedText, SOLUTION_FALLBACK};
    use crate::progress::SolveProgressCallback;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    struct StubOcr(Option<&'static str>);

    #[async_trait]
    impl TextRecognizer for StubOcr {
        fn name(&self) -> &str {
            "stub"
        }

        async fn recognize(&self, _image: &[u8]) -> Result<Recognition, MathSnapError> {
            match self.0 {
                Some(text) => Ok(Recognition {
                    text: text.to_string(),
                    found: !text.is_empty(),
                    candidates: vec![],
                }),
                None => Err(MathSnapError::Extraction {
                    backend: "stub".into(),
                    detail: "service unavailable".into(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct StubLlm {
        reply: Option<String>,
        fail: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl StubLlm {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextCompleter for StubLlm {
        async fn complete(&self, prompt: &str) -> Result<Completion, MathSnapError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(MathSnapError::Generation {
                    retries: 0,
                    detail: "rejected".into(),
                });
            }
            Ok(Completion {
                text: self.reply.clone(),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct RecordStages(Mutex<Vec<PipelineStage>>);

    impl SolveProgressCallback for RecordStages {
        fn on_stage(&self, _source: &str, stage: PipelineStage) {
            self.0.lock().unwrap().push(stage);
        }
    }

    fn config() -> SolverConfig {
        SolverConfig::builder().preprocess(None).build().unwrap()
    }

    fn local_image(dir: &Path) -> ImageInput {
        let path = dir.join("hw.png");
        std::fs::write(&path, b"not decoded").unwrap();
        ImageInput {
            bytes: b"not decoded".to_vec(),
            origin: InputOrigin::Local(path),
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    macro_rules! fonts_or_skip {
        () => {
            match FontSet::system() {
                Some(f) => f,
                None => {
                    println!("SKIP — no system font installed");
                    return;
                }
            }
        };
    }

    #[tokio::test]
    async fn no_marker_writes_nothing_and_skips_llm() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(StubLlm::replying("unused"));
        let stages = Arc::new(RecordStages::default());
        let config = SolverConfig::builder()
            .preprocess(None)
            .progress_callback(stages.clone())
            .build()
            .unwrap();
        let solver = Solver::new(config, Arc::new(StubOcr(Some("just some notes"))), llm.clone());

        let outcome = solver
            .run(local_image(dir.path()), ArtifactTarget::Derived)
            .await
            .unwrap();

        assert!(matches!(outcome, SolveOutcome::NoMatch { .. }));
        assert_eq!(llm.calls(), 0);
        assert_eq!(dir_entries(dir.path()), vec!["hw.png"]);
        assert_eq!(
            *stages.0.lock().unwrap(),
            vec![
                PipelineStage::Extracting,
                PipelineStage::Dispatching,
                PipelineStage::NoMatch
            ]
        );
    }

    #[tokio::test]
    async fn nothing_detected_is_no_match() {
        let solver = Solver::new(config(), Arc::new(StubOcr(Some(""))), Arc::new(StubLlm::default()));
        let image = ImageInput {
            bytes: vec![],
            origin: InputOrigin::Memory { name: "m".into() },
        };
        match solver.run(image, ArtifactTarget::Buffer).await.unwrap() {
            SolveOutcome::NoMatch { extracted, .. } => assert!(!extracted.is_detected()),
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn extraction_failure_aborts_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(StubLlm::replying("unused"));
        let solver = Solver::new(config(), Arc::new(StubOcr(None)), llm.clone());

        let err = solver
            .run(local_image(dir.path()), ArtifactTarget::Derived)
            .await
            .unwrap_err();

        assert!(matches!(err, MathSnapError::Extraction { .. }));
        assert_eq!(llm.calls(), 0);
        assert_eq!(dir_entries(dir.path()), vec!["hw.png"]);
    }

    #[tokio::test]
    async fn generation_failure_aborts_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let solver = Solver::new(
            config(),
            Arc::new(StubOcr(Some("QTAR 2x + 3 = 7"))),
            Arc::new(StubLlm::failing()),
        );

        let err = solver
            .run(local_image(dir.path()), ArtifactTarget::Derived)
            .await
            .unwrap_err();

        assert!(matches!(err, MathSnapError::Generation { .. }));
        assert_eq!(dir_entries(dir.path()), vec!["hw.png"]);
    }

    #[tokio::test]
    async fn solve_writes_solution_png_next_to_input() {
        let fonts = fonts_or_skip!();
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(StubLlm::replying("Subtract 3, then divide by 2: $\\boxed{x = 2}$"));
        let solver = Solver::new(config(), Arc::new(StubOcr(Some("QTAR 2x + 3 = 7"))), llm.clone())
            .with_fonts(fonts);

        let outcome = solver
            .run(local_image(dir.path()), ArtifactTarget::Derived)
            .await
            .unwrap();

        let report = outcome.report().expect("report");
        assert_eq!(report.mode, Marker::Solve);
        assert_eq!(report.problem, "2x + 3 = 7");
        assert_eq!(report.generated.as_str(), "Subtract 3, then divide by 2: x = 2");
        assert!(llm.prompts.lock().unwrap()[0].ends_with("2x + 3 = 7"));

        let path = dir.path().join("hw_solution.png");
        assert_eq!(report.artifact.path.as_deref(), Some(path.as_path()));
        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 800);
        assert!(img.height() >= 600);
    }

    #[tokio::test]
    async fn check_returns_feedback_buffer() {
        let fonts = fonts_or_skip!();
        let llm = Arc::new(StubLlm::replying("Step 2 is wrong: 7 - 3 = 4."));
        let solver = Solver::new(
            config(),
            Arc::new(StubOcr(Some("2x + 3 = 7 CTAR 2x = 10, x = 5"))),
            llm.clone(),
        )
        .with_fonts(fonts);
        let image = ImageInput {
            bytes: vec![],
            origin: InputOrigin::Memory { name: "m.png".into() },
        };

        let outcome = solver.run(image, ArtifactTarget::Buffer).await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.mode, Marker::Check);
        assert_eq!(report.problem, "2x + 3 = 7");
        assert_eq!(report.student_work.as_deref(), Some("2x = 10, x = 5"));

        let prompt = &llm.prompts.lock().unwrap()[0];
        assert!(prompt.contains("2x + 3 = 7"));
        assert!(prompt.contains("2x = 10, x = 5"));

        let png = report.artifact.png.as_ref().expect("buffer");
        let img = image::load_from_memory(png).unwrap();
        assert_eq!(img.width(), 800);
        assert!(report.artifact.path.is_none());
    }

    #[tokio::test]
    async fn empty_completion_renders_fallback() {
        let fonts = fonts_or_skip!();
        let solver = Solver::new(config(), Arc::new(StubOcr(Some("QTAR 1+1"))), Arc::new(StubLlm::default()))
            .with_fonts(fonts);
        let image = ImageInput {
            bytes: vec![],
            origin: InputOrigin::Memory { name: "m.png".into() },
        };

        let outcome = solver.run(image, ArtifactTarget::Buffer).await.unwrap();
        assert_eq!(
            outcome.report().unwrap().generated,
            GeneratedText::Fallback(SOLUTION_FALLBACK.to_string())
        );
    }

    #[tokio::test]
    async fn missing_font_is_render_error_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SolverConfig::builder()
            .preprocess(None)
            .font_path(dir.path().join("missing.ttf"))
            .build()
            .unwrap();
        let solver = Solver::new(config, Arc::new(StubOcr(Some("QTAR 1+1"))), Arc::new(StubLlm::replying("2")));

        let err = solver
            .run(local_image(dir.path()), ArtifactTarget::Derived)
            .await
            .unwrap_err();
        assert!(matches!(err, MathSnapError::FontUnavailable { .. }));
        assert_eq!(dir_entries(dir.path()), vec!["hw.png"]);
    }

    #[tokio::test]
    async fn batch_keeps_input_order_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.png");
        std::fs::write(&good, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap();
        let missing = dir.path().join("missing.png");

        let solver = Solver::new(config(), Arc::new(StubOcr(Some("no marker"))), Arc::new(StubLlm::default()));
        let inputs = vec![
            missing.to_string_lossy().to_string(),
            good.to_string_lossy().to_string(),
        ];
        let items = solver.run_batch(&inputs).await;

        assert_eq!(items.len(), 2);
        assert!(matches!(items[0].result, Err(MathSnapError::FileNotFound { .. })));
        assert!(matches!(items[1].result, Ok(SolveOutcome::NoMatch { .. })));
        assert_eq!(items[1].input, inputs[1]);
    }

    #[tokio::test]
    async fn batch_inputs_sharing_a_report_path_both_succeed() {
        let fonts = fonts_or_skip!();
        let dir = tempfile::tempdir().unwrap();
        let jpg = dir.path().join("hw.jpg");
        let png = dir.path().join("hw.png");
        std::fs::write(&jpg, b"\xFF\xD8\xFF\xE0 jpeg").unwrap();
        std::fs::write(&png, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap();

        let config = SolverConfig::builder()
            .preprocess(None)
            .concurrency(2)
            .build()
            .unwrap();
        let solver = Solver::new(
            config,
            Arc::new(StubOcr(Some("QTAR x + 1 = 2"))),
            Arc::new(StubLlm::replying("Subtract 1 from both sides.\nx = 1")),
        )
        .with_fonts(fonts);
        let inputs = vec![
            jpg.to_string_lossy().to_string(),
            png.to_string_lossy().to_string(),
        ];
        let items = solver.run_batch(&inputs).await;

        for item in &items {
            assert!(item.result.is_ok(), "{}: {:?}", item.input, item.result);
        }
        let out = dir.path().join("hw_solution.png");
        let img = image::open(&out).expect("published report decodes");
        assert_eq!(img.width(), 800);
        assert_eq!(dir_entries(dir.path()), vec!["hw.jpg", "hw.png", "hw_solution.png"]);
    }
}
