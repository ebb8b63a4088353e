//! OpenAI-compatible chat completion provider.

use super::{CompletionOpts, LlmProvider};
use crate::errors::TrustBenchError;
use crate::model::ProviderResult;
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;

/// Talks to any OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiProvider {
    model: String,
    api_key: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Build a provider against the public OpenAI API.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_base_url(
            model,
            api_key,
            "https://api.openai.com/v1/chat/completions",
        )
    }

    /// Build a provider against an OpenAI-compatible endpoint (self-hosted
    /// gateways, Azure-style proxies, etc).
    pub fn with_base_url(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            temperature: 0.0,
            max_tokens: 1024,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn completion(
        &self,
        prompt: &str,
        opts: &CompletionOpts,
    ) -> Result<ProviderResult, TrustBenchError> {
        let content = if opts.context.is_empty() {
            prompt.to_string()
        } else {
            format!("Context:\n{:?}\n\nQuestion: {}", opts.context, prompt)
        };

        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": content}],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let started = Instant::now();
        let resp = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TrustBenchError::RateLimited(format!(
                "openai returned 429 for model {}",
                self.model
            )));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(TrustBenchError::Unauthorized(
                "openai rejected the configured api key".into(),
            ));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TrustBenchError::ModelUnavailable(self.model.clone()));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TrustBenchError::ModelUnavailable(format!(
                "openai error {status}: {text}"
            )));
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TrustBenchError::Parse(e.to_string()))?;

        let text = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TrustBenchError::Parse("response missing choices[0].message.content".into()))?
            .to_string();

        Ok(ProviderResult {
            text,
            latency_seconds: started.elapsed().as_secs_f64(),
            usage: payload.get("usage").cloned(),
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

fn classify_transport_error(e: &reqwest::Error) -> TrustBenchError {
    if e.is_timeout() {
        TrustBenchError::Timeout(std::time::Duration::from_secs(0))
    } else {
        TrustBenchError::RateLimited(format!("transport error: {e}"))
    }
}
