//! Provider layer: a uniform completion/JSON-completion contract over one or
//! more LLM vendors, with bounded concurrency and retry/backoff applied as an
//! explicit wrapper (not attribute-based decorator magic, per the design
//! notes' "decorator-based retry/timeout" redesign flag).

pub mod embedder;
pub mod fake;
pub mod openai;

pub use embedder::{Embedder, FakeEmbedder};

use crate::errors::TrustBenchError;
use crate::model::ProviderResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Options accepted by a completion call. Kept minimal; vendor-specific
/// extensions go through `extra`.
#[derive(Debug, Clone, Default)]
pub struct CompletionOpts {
    /// Optional system/context strings prepended ahead of the prompt.
    pub context: Vec<String>,
    /// Per-call timeout override; falls back to the provider's default.
    pub timeout: Option<Duration>,
}

/// Capability set every provider implements.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate text for `prompt`, never raising for transient failures
    /// before retries are exhausted by the caller's wrapper.
    async fn completion(
        &self,
        prompt: &str,
        opts: &CompletionOpts,
    ) -> Result<ProviderResult, TrustBenchError>;

    /// Generate text and parse the first `{...}` substring as JSON.
    async fn json_completion(
        &self,
        prompt: &str,
        opts: &CompletionOpts,
    ) -> Result<(serde_json::Value, ProviderResult), TrustBenchError> {
        let result = self.completion(prompt, opts).await?;
        let value = extract_json(&result.text)
            .map_err(|e| TrustBenchError::Parse(format!("{e}: {:?}", result.text)))?;
        Ok((value, result))
    }

    /// Stable provider identifier, e.g. `"fake"`, `"openai"`.
    fn name(&self) -> &'static str;
}

/// Extract the first `{...}` JSON object substring and parse it, ignoring any
/// trailing text after the object closes.
fn extract_json(text: &str) -> Result<serde_json::Value, serde_json::Error> {
    let trimmed = text.trim();
    let start = trimmed.find('{').unwrap_or(0);
    let candidate = &trimmed[start..];
    serde_json::Deserializer::from_str(candidate)
        .into_iter::<serde_json::Value>()
        .next()
        .unwrap_or_else(|| serde_json::from_str(candidate))
}

/// Retry policy: up to `max_retries` attempts beyond the first, with sleep
/// `backoff * attempt` (linear in attempt count) between attempts.
/// Non-retriable errors bypass retries entirely.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Backoff multiplier in seconds.
    pub backoff_seconds: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_seconds: 1.0,
        }
    }
}

/// Wraps any [`LlmProvider`] with a process-wide bounded concurrency
/// semaphore and the retry/backoff policy from §4.1. This is the "explicit
/// higher-order wrapper" the design notes call for in place of a decorator.
pub struct BoundedProvider {
    inner: Arc<dyn LlmProvider>,
    semaphore: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl BoundedProvider {
    /// Wrap `inner` with a semaphore of `concurrency` permits and `retry` policy.
    pub fn new(inner: Arc<dyn LlmProvider>, concurrency: usize, retry: RetryPolicy) -> Self {
        Self {
            inner,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            retry,
        }
    }

    /// Name of the wrapped provider (passed through for metrics/labels).
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn with_retries<F, Fut, T>(&self, mut attempt_fn: F) -> Result<T, TrustBenchError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, TrustBenchError>>,
    {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TrustBenchError::Cancelled)?;

        let mut attempt = 0u32;
        loop {
            match attempt_fn().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retriable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let sleep_for = Duration::from_secs_f64(self.retry.backoff_seconds * attempt as f64);
                    tracing::warn!(attempt, error = %e, "provider call failed, retrying");
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// `completion` with concurrency throttling and retry/backoff applied.
    pub async fn completion(
        &self,
        prompt: &str,
        opts: &CompletionOpts,
    ) -> Result<ProviderResult, TrustBenchError> {
        self.with_retries(|| {
            let inner = Arc::clone(&self.inner);
            let prompt = prompt.to_string();
            let opts = opts.clone();
            async move {
                let started = Instant::now();
                let mut result = inner.completion(&prompt, &opts).await?;
                if result.latency_seconds <= 0.0 {
                    result.latency_seconds = started.elapsed().as_secs_f64();
                }
                Ok(result)
            }
        })
        .await
    }

    /// `json_completion` with the same retry semantics, plus ParseError retry
    /// up to `max_retries` per §4.1 before escalating.
    pub async fn json_completion(
        &self,
        prompt: &str,
        opts: &CompletionOpts,
    ) -> Result<(serde_json::Value, ProviderResult), TrustBenchError> {
        self.with_retries(|| {
            let inner = Arc::clone(&self.inner);
            let prompt = prompt.to_string();
            let opts = opts.clone();
            async move { inner.json_completion(&prompt, &opts).await }
        })
        .await
    }
}
