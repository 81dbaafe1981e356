//! CLI binary for edgequake-mathsnap.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SolverConfig` and reports one line per image.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_mathsnap::{
    LayoutStrategy, MathSnapError, OcrBackend, PipelineStage, PreprocessOptions, ProgressCallback,
    SolveOutcome, SolveProgressCallback, Solver, SolverConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner plus one log line per finished image. Runs may finish out of
/// order when several images are processed concurrently.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("mathsnap");
        bar.set_message("Starting…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed(&self, source: &str) -> String {
        let ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(source)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        dim(&format!("{:.1}s", ms as f64 / 1000.0))
    }
}

impl SolveProgressCallback for CliProgressCallback {
    fn on_run_start(&self, source: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(source.to_string(), Instant::now());
        self.bar.set_message(source.to_string());
    }

    fn on_stage(&self, source: &str, stage: PipelineStage) {
        self.bar.set_message(format!("{source}  {}", dim(&stage.to_string())));
    }

    fn on_run_complete(&self, source: &str, artifact: Option<&str>) {
        let elapsed = self.elapsed(source);
        match artifact {
            Some(path) => self.bar.println(format!(
                "  {} {}  →  {}  {}",
                green("✓"),
                source,
                bold(path),
                elapsed
            )),
            None => self.bar.println(format!(
                "  {} {}  {}  {}",
                dim("·"),
                source,
                dim("no QTAR/CTAR marker, nothing written"),
                elapsed
            )),
        }
    }

    fn on_run_error(&self, source: &str, error: &str) {
        let elapsed = self.elapsed(source);
        self.bar.println(format!(
            "  {} {}  {}  {}",
            red("✗"),
            source,
            red(&truncate(error.lines().next().unwrap_or(error), 80)),
            elapsed
        ));
    }
}

const AFTER_HELP: &str = r#"MARKERS:
  Write one of these tokens anywhere on the page before taking the photo:

  QTAR   Solve: everything else on the page is the problem.
         Writes <stem>_solution.png next to the photo.
  CTAR   Check: text before the token is the problem, text after it is the
         student's work. Writes <stem>_feedback.png next to the photo.

  A page with neither token is reported and nothing is written.

EXAMPLES:
  # Solve a photographed equation (Google Vision OCR, auto-detected LLM)
  mathsnap homework.jpg

  # Check several pages, reports into ./out
  mathsnap --output-dir out page1.jpg page2.jpg page3.jpg

  # No Google key: let the vision LLM read the photo too
  mathsnap --ocr vision-llm --provider openai --model gpt-4.1-mini homework.jpg

  # Structured output for scripts
  mathsnap --json homework.jpg > result.json

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY          Google Cloud Vision API key (--ocr google)
  GEMINI_API_KEY          Google Gemini API key
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_PROVIDER      Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  MATHSNAP_FONT           TrueType font for report text
  MATHSNAP_BOLD_FONT      TrueType font for headings
"#;

/// Solve or check photographed handwritten math.
#[derive(Parser, Debug)]
#[command(
    name = "mathsnap",
    version,
    about = "Solve or check photographed handwritten math and render a PNG report",
    long_about = "Read a photo of handwritten math, solve it (QTAR) or check the student's \
work (CTAR) with an LLM, and render the explanation as an 800 px wide PNG next to the photo.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files (PNG/JPEG) or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// OCR backend.
    #[arg(long, env = "MATHSNAP_OCR", value_enum, default_value = "google")]
    ocr: OcrArg,

    /// Google Cloud Vision API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_api_key: Option<String>,

    /// TrueType/OpenType font for body text.
    #[arg(long, env = "MATHSNAP_FONT")]
    font: Option<PathBuf>,

    /// TrueType/OpenType font for headings and section titles.
    #[arg(long, env = "MATHSNAP_BOLD_FONT")]
    bold_font: Option<PathBuf>,

    /// Canvas sizing strategy.
    #[arg(long, env = "MATHSNAP_LAYOUT", value_enum, default_value = "wrap-aware")]
    layout: LayoutArg,

    /// Send the photo to OCR as-is (no resize/grayscale/sharpen).
    #[arg(long, env = "MATHSNAP_NO_PREPROCESS")]
    no_preprocess: bool,

    /// Write reports here instead of next to each photo.
    #[arg(short, long, env = "MATHSNAP_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Print one JSON object per image to stdout.
    #[arg(long, env = "MATHSNAP_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "MATHSNAP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MATHSNAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MATHSNAP_QUIET")]
    quiet: bool,

    /// Retries on LLM failure.
    #[arg(long, env = "MATHSNAP_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "MATHSNAP_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "MATHSNAP_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Per-call OCR/LLM timeout in seconds.
    #[arg(long, env = "MATHSNAP_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "MATHSNAP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Images processed concurrently.
    #[arg(short, long, env = "MATHSNAP_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OcrArg {
    Google,
    VisionLlm,
}

impl From<OcrArg> for OcrBackend {
    fn from(v: OcrArg) -> Self {
        match v {
            OcrArg::Google => OcrBackend::GoogleVision,
            OcrArg::VisionLlm => OcrBackend::VisionLlm,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    WrapAware,
    PreMeasured,
}

impl From<LayoutArg> for LayoutStrategy {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::WrapAware => LayoutStrategy::WrapAware,
            LayoutArg::PreMeasured => LayoutStrategy::PreMeasured,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs; --verbose brings them
    // back regardless.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as ProgressCallback),
    )?;

    let solver = Solver::from_config(config).context("Failed to set up OCR / LLM providers")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let items = solver.run_batch(&cli.inputs).await;

    if let Some(ref cb) = progress {
        cb.bar.finish_and_clear();
    }

    let total = items.len();
    let mut failed = 0usize;
    let mut first_error: Option<(String, MathSnapError)> = None;

    for item in items {
        match item.result {
            Ok(outcome) => {
                if cli.json {
                    print_json(&item.input, Ok(&outcome))?;
                } else if !cli.quiet && !show_progress {
                    print_outcome(&item.input, &outcome);
                }
            }
            Err(e) => {
                failed += 1;
                if cli.json {
                    print_json(&item.input, Err(&e))?;
                }
                if !show_progress {
                    eprintln!("{} {}: {}", red("✗"), item.input, e);
                }
                if first_error.is_none() {
                    first_error = Some((item.input, e));
                }
            }
        }
    }

    if !cli.quiet && !cli.json && total > 1 {
        eprintln!(
            "{} {}/{} images processed",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&(total - failed).to_string()),
            total
        );
    }

    match first_error {
        None => Ok(()),
        Some((input, e)) if total == 1 => {
            Err(anyhow::Error::new(e)).with_context(|| format!("Failed to process {input}"))
        }
        Some(_) => anyhow::bail!("{failed} of {total} images failed"),
    }
}

fn print_outcome(input: &str, outcome: &SolveOutcome) {
    match outcome {
        SolveOutcome::Reported(r) => {
            let path = r
                .artifact
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            eprintln!(
                "{} {}  →  {}  {}",
                green("✓"),
                input,
                bold(&path),
                dim(&format!(
                    "{} tokens in / {} out, {}ms",
                    r.stats.input_tokens, r.stats.output_tokens, r.stats.total_duration_ms
                ))
            );
        }
        SolveOutcome::NoMatch { extracted, .. } => {
            eprintln!(
                "{} {}  {}",
                dim("·"),
                input,
                dim(&format!(
                    "no QTAR/CTAR marker in: {}",
                    truncate(&extracted.to_string().replace('\n', " "), 60)
                ))
            );
        }
    }
}

fn print_json(input: &str, result: std::result::Result<&SolveOutcome, &MathSnapError>) -> Result<()> {
    let value = match result {
        Ok(outcome) => serde_json::json!({ "input": input, "result": outcome }),
        Err(e) => serde_json::json!({
            "input": input,
            "error": { "kind": e.kind(), "message": e.to_string() },
        }),
    };
    println!(
        "{}",
        serde_json::to_string(&value).context("Failed to serialise output")?
    );
    Ok(())
}

/// Map CLI args to `SolverConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SolverConfig> {
    let preprocess = if cli.no_preprocess {
        None
    } else {
        Some(PreprocessOptions::default())
    };

    let mut builder = SolverConfig::builder()
        .ocr(cli.ocr.into())
        .layout(cli.layout.into())
        .preprocess(preprocess)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .concurrency(cli.concurrency);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref key) = cli.google_api_key {
        builder = builder.google_api_key(key.clone());
    }
    if let Some(ref font) = cli.font {
        builder = builder.font_path(font.clone());
    }
    if let Some(ref font) = cli.bold_font {
        builder = builder.bold_font_path(font.clone());
    }
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
