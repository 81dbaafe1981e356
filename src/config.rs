//! Configuration types for a solve/check run.
//!
//! Every knob lives in [`SolverConfig`], built via [`SolverConfigBuilder`].
//! Apart from the LLM provider factory's own API-key lookup, the library does
//! not read the process environment: the caller (usually the CLI, through
//! clap's `env` attributes) decides where values come from and hands them
//! over here.

use crate::error::MathSnapError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default Google Vision REST endpoint.
pub const GOOGLE_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Configuration for a pipeline run.
///
/// # Example
/// ```rust
/// use edgequake_mathsnap::{LayoutStrategy, SolverConfig};
///
/// let config = SolverConfig::builder()
///     .provider_name("gemini")
///     .model("gemini-2.0-flash")
///     .google_api_key("AIza...")
///     .layout(LayoutStrategy::WrapAware)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SolverConfig {
    /// LLM model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-mini".
    /// If None, [`DEFAULT_MODEL`] is used with the named provider.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for completions. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate for one explanation. Default: 2048.
    ///
    /// Step-by-step solutions for school algebra rarely exceed 800 tokens;
    /// feedback on long student work can run longer.
    pub max_tokens: usize,

    /// Retry attempts on a failed completion call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-completion-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Which OCR collaborator extracts text from the photo.
    pub ocr: OcrBackend,

    /// API key for the Google Vision backend.
    pub google_api_key: Option<String>,

    /// Google Vision endpoint; overridable for proxies and tests.
    pub google_vision_endpoint: String,

    /// Image filter applied before OCR. `None` sends the photo untouched.
    pub preprocess: Option<PreprocessOptions>,

    /// Canvas sizing strategy for the report. Default: [`LayoutStrategy::WrapAware`].
    pub layout: LayoutStrategy,

    /// Regular-weight font used for body text. Default: first system font found.
    pub font_path: Option<PathBuf>,

    /// Bold font for heading and section titles. Falls back to the regular face.
    pub bold_font_path: Option<PathBuf>,

    /// Directory for report files. Default: next to the input image.
    pub output_dir: Option<PathBuf>,

    /// Number of images processed concurrently by batch runs. Default: 4.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional stage-progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 2048,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            ocr: OcrBackend::default(),
            google_api_key: None,
            google_vision_endpoint: GOOGLE_VISION_ENDPOINT.to_string(),
            preprocess: Some(PreprocessOptions::default()),
            layout: LayoutStrategy::default(),
            font_path: None,
            bold_font_path: None,
            output_dir: None,
            concurrency: 4,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("ocr", &self.ocr)
            .field("google_api_key", &self.google_api_key.as_ref().map(|_| "<redacted>"))
            .field("preprocess", &self.preprocess)
            .field("layout", &self.layout)
            .field("font_path", &self.font_path)
            .field("bold_font_path", &self.bold_font_path)
            .field("output_dir", &self.output_dir)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl SolverConfig {
    /// Create a new builder for `SolverConfig`.
    pub fn builder() -> SolverConfigBuilder {
        SolverConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SolverConfig`].
#[derive(Debug)]
pub struct SolverConfigBuilder {
    config: SolverConfig,
}

impl SolverConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn ocr(mut self, backend: OcrBackend) -> Self {
        self.config.ocr = backend;
        self
    }

    pub fn google_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.google_api_key = Some(key.into());
        self
    }

    pub fn google_vision_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.google_vision_endpoint = url.into();
        self
    }

    pub fn preprocess(mut self, options: Option<PreprocessOptions>) -> Self {
        self.config.preprocess = options;
        self
    }

    pub fn layout(mut self, strategy: LayoutStrategy) -> Self {
        self.config.layout = strategy;
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn bold_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.bold_font_path = Some(path.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SolverConfig, MathSnapError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(MathSnapError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(MathSnapError::InvalidConfig(
                "API timeout must be at least 1 second".into(),
            ));
        }
        if let Some(ref p) = c.preprocess {
            if p.target_width < 16 || p.target_width > 8000 {
                return Err(MathSnapError::InvalidConfig(format!(
                    "Preprocess width must be 16–8000 px, got {}",
                    p.target_width
                )));
            }
        }
        if c.google_api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(MathSnapError::InvalidConfig(
                "Google API key must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// OCR collaborator selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrBackend {
    /// Google Cloud Vision `TEXT_DETECTION`. Requires `google_api_key`. (default)
    #[default]
    GoogleVision,
    /// Transcribe the photo with the configured vision-capable LLM.
    VisionLlm,
}

impl OcrBackend {
    pub fn name(&self) -> &'static str {
        match self {
            OcrBackend::GoogleVision => "google-vision",
            OcrBackend::VisionLlm => "vision-llm",
        }
    }
}

/// How the report canvas height is determined.
///
/// | Strategy | Height | Use when |
/// |----------|--------|----------|
/// | `WrapAware` | `max(600, last cursor + 50)` after word-wrap | always safe (default) |
/// | `PreMeasured` | `max(600, 200 + raw lines × 30)` | bodies known to fit the column |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutStrategy {
    #[default]
    WrapAware,
    /// Sizes from embedded line breaks only; long lines that wrap can be
    /// clipped at the bottom of the canvas.
    PreMeasured,
}

/// Image-filter options applied to the photo before OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessOptions {
    /// Resize so the image is this many pixels wide (aspect preserved). Default: 1200.
    pub target_width: u32,
    /// Convert to 8-bit luma. Default: true.
    pub grayscale: bool,
    /// Apply an unsharp mask. Default: true.
    pub sharpen: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            target_width: 1200,
            grayscale: true,
            sharpen: true,
        }
    }
}
