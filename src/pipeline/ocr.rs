//! Text extraction: the OCR collaborator seam and its normalisation.
//!
//! [`TextRecognizer`] is the only thing the controller knows about OCR. Two
//! backends ship with the crate:
//!
//! * [`GoogleVisionRecognizer`] — Cloud Vision `images:annotate` with
//!   `TEXT_DETECTION`. The first annotation is the full-page text; the rest
//!   are per-token candidates.
//! * [`VisionLlmRecognizer`] — asks a vision-capable chat model to
//!   transcribe the photo, reusing the completion provider stack.
//!
//! Whatever the backend returns, [`normalize_recognition`] folds it into one
//! [`ExtractedText`]. "Nothing detected" is a value, not an error.

use crate::error::MathSnapError;
use crate::pipeline::encode;
use crate::prompts::VISION_OCR_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Shown in place of extracted text when nothing was recognised.
pub const NO_TEXT_SENTINEL: &str = "No text detected";

/// Raw answer from an OCR collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognition {
    /// Full recognised text, possibly empty.
    pub text: String,
    /// Whether the collaborator detected any text at all.
    pub found: bool,
    /// Optional per-token candidates, in reading order.
    pub candidates: Vec<String>,
}

/// OCR collaborator contract.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short backend name for logs and errors.
    fn name(&self) -> &str;

    /// Recognise text in encoded image bytes.
    ///
    /// Transport or service failures return [`MathSnapError::Extraction`];
    /// an image with no text returns `Ok` with `found == false`.
    async fn recognize(&self, image: &[u8]) -> Result<Recognition, MathSnapError>;
}

/// Text recognised in the photo. Never absent: no detection is
/// [`ExtractedText::none`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    text: String,
    detected: bool,
}

impl ExtractedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            detected: true,
        }
    }

    pub fn none() -> Self {
        Self {
            text: String::new(),
            detected: false,
        }
    }

    /// The recognised text; empty when nothing was detected.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detected {
            f.write_str(&self.text)
        } else {
            f.write_str(NO_TEXT_SENTINEL)
        }
    }
}

/// Fold a raw [`Recognition`] into one extracted string.
///
/// Full text wins; when the collaborator only returned token candidates they
/// are joined with single spaces.
pub fn normalize_recognition(rec: Recognition) -> ExtractedText {
    if !rec.found {
        return ExtractedText::none();
    }
    if !rec.text.trim().is_empty() {
        return ExtractedText::new(rec.text);
    }
    let joined = rec
        .candidates
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        ExtractedText::none()
    } else {
        ExtractedText::new(joined)
    }
}

/// Run `recognizer` once and normalise its answer.
pub async fn extract_text(
    recognizer: &dyn TextRecognizer,
    image: &[u8],
) -> Result<ExtractedText, MathSnapError> {
    let rec = recognizer.recognize(image).await?;
    let extracted = normalize_recognition(rec);
    if extracted.is_detected() {
        debug!(
            "{}: extracted {} chars",
            recognizer.name(),
            extracted.as_str().len()
        );
    } else {
        info!("{}: {}", recognizer.name(), NO_TEXT_SENTINEL);
    }
    Ok(extracted)
}

// ── Google Cloud Vision ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: VisionImage<'a>,
    features: Vec<VisionFeature>,
}

#[derive(Serialize)]
struct VisionImage<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct VisionFeature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    error: Option<VisionStatus>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VisionStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Cloud Vision `TEXT_DETECTION` over the REST API.
pub struct GoogleVisionRecognizer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GoogleVisionRecognizer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, MathSnapError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MathSnapError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    fn fail(&self, detail: impl Into<String>) -> MathSnapError {
        MathSnapError::Extraction {
            backend: self.name().to_string(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl TextRecognizer for GoogleVisionRecognizer {
    fn name(&self) -> &str {
        "google-vision"
    }

    async fn recognize(&self, image: &[u8]) -> Result<Recognition, MathSnapError> {
        let content = encode::to_base64(image);
        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: VisionImage { content: &content },
                features: vec![VisionFeature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.fail("request timed out")
                } else {
                    self.fail(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(self.fail(format!("HTTP {status}: {snippet}")));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| self.fail(format!("malformed response: {e}")))?;

        recognition_from_response(parsed).map_err(|detail| self.fail(detail))
    }
}

fn recognition_from_response(resp: AnnotateResponse) -> Result<Recognition, String> {
    let Some(first) = resp.responses.into_iter().next() else {
        return Ok(Recognition::default());
    };

    if let Some(err) = first.error {
        if err.code != 0 {
            return Err(format!("Vision error {}: {}", err.code, err.message));
        }
    }

    let mut annotations = first.text_annotations.into_iter();
    let Some(full) = annotations.next() else {
        return Ok(Recognition::default());
    };

    Ok(Recognition {
        text: full.description.unwrap_or_default(),
        found: true,
        candidates: annotations.filter_map(|a| a.description).collect(),
    })
}

// ── Vision LLM ───────────────────────────────────────────────────────────────

/// Transcribe the photo with a vision-capable chat model.
pub struct VisionLlmRecognizer {
    provider: Arc<dyn LLMProvider>,
    timeout: Duration,
    max_tokens: usize,
}

impl VisionLlmRecognizer {
    pub fn new(provider: Arc<dyn LLMProvider>, timeout_secs: u64, max_tokens: usize) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(timeout_secs),
            max_tokens,
        }
    }
}

#[async_trait]
impl TextRecognizer for VisionLlmRecognizer {
    fn name(&self) -> &str {
        "vision-llm"
    }

    async fn recognize(&self, image: &[u8]) -> Result<Recognition, MathSnapError> {
        let messages = vec![
            ChatMessage::system(VISION_OCR_PROMPT),
            ChatMessage::user_with_images("", vec![encode::to_image_data(image, encode::sniff_mime(image))]),
        ];
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let fail = |detail: String| MathSnapError::Extraction {
            backend: "vision-llm".to_string(),
            detail,
        };

        let response = tokio::time::timeout(self.timeout, self.provider.chat(&messages, Some(&options)))
            .await
            .map_err(|_| fail(format!("timed out after {}s", self.timeout.as_secs())))?
            .map_err(|e| fail(e.to_string()))?;

        let text = response.content;
        Ok(Recognition {
            found: !text.trim().is_empty(),
            text,
            candidates: Vec::new(),
        })
    }
}
