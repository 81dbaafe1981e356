//! Completion adapter: send a prompt to the LLM and return its text.
//!
//! Everything the controller needs from a language model goes through
//! [`TextCompleter`]. The default implementation, [`LlmCompleter`], wraps an
//! `edgequake_llm` provider and owns the retry and timeout policy, so the
//! controller never sleeps or counts attempts itself.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Attempts are spaced by
//! exponential backoff (`retry_backoff_ms * 2^(attempt-1)`): with 500 ms base
//! and 3 retries the wait sequence is 500 ms → 1 s → 2 s. Each attempt is
//! also bounded by `api_timeout_secs`.

use crate::config::{SolverConfig, DEFAULT_MODEL};
use crate::error::MathSnapError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Text returned by a completion collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Model output; `None` when the model returned nothing.
    pub text: Option<String>,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Failed attempts before this one succeeded.
    pub retries: u32,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// LLM collaborator contract.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// Complete `prompt`. Unreachable or rejecting services return
    /// [`MathSnapError::Generation`] or [`MathSnapError::GenerationTimeout`].
    async fn complete(&self, prompt: &str) -> Result<Completion, MathSnapError>;
}

/// [`TextCompleter`] backed by an `edgequake_llm` provider.
pub struct LlmCompleter {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    max_retries: u32,
    retry_backoff_ms: u64,
    timeout: Duration,
}

impl LlmCompleter {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &SolverConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }
}

#[async_trait]
impl TextCompleter for LlmCompleter {
    async fn complete(&self, prompt: &str) -> Result<Completion, MathSnapError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];

        let mut last_err: Option<String> = None;
        let mut timeouts = 0u32;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Completion: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(self.timeout, self.provider.chat(&messages, Some(&self.options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "Completion: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    let text = Some(response.content).filter(|s| !s.is_empty());
                    return Ok(Completion {
                        text,
                        input_tokens: response.prompt_tokens,
                        output_tokens: response.completion_tokens,
                        retries: attempt,
                    });
                }
                Ok(Err(e)) => {
                    let err_msg = e.to_string();
                    warn!("Completion: attempt {} failed — {}", attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
                Err(_) => {
                    warn!(
                        "Completion: attempt {} timed out after {}s",
                        attempt + 1,
                        self.timeout.as_secs()
                    );
                    timeouts += 1;
                    last_err = Some(format!("timed out after {}s", self.timeout.as_secs()));
                }
            }
        }

        if timeouts == self.max_retries + 1 {
            return Err(MathSnapError::GenerationTimeout {
                secs: self.timeout.as_secs(),
            });
        }

        Err(MathSnapError::Generation {
            retries: self.max_retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Build `CompletionOptions` from the solver config.
fn build_options(config: &SolverConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, MathSnapError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        MathSnapError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`), built through
///    [`ProviderFactory::create_llm_provider`], which reads that provider's
///    API key from the environment.
/// 3. **Auto-detection** ([`ProviderFactory::from_env`]), which picks the
///    first provider with a key present.
pub fn resolve_provider(config: &SolverConfig) -> Result<Arc<dyn LLMProvider>, MathSnapError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| MathSnapError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Delay before retry `attempt` (1-based): `base × 2^(attempt-1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}
