//! Deterministic stub provider used in fake mode and by tests.

use super::{CompletionOpts, LlmProvider};
use crate::errors::TrustBenchError;
use crate::model::ProviderResult;
use async_trait::async_trait;

/// Returns deterministic text chosen by matching a small set of substrings
/// in the prompt, or a fixed response when one is configured.
#[derive(Debug, Clone)]
pub struct FakeProvider {
    model: String,
    fixed_response: Option<String>,
}

impl FakeProvider {
    /// A fake provider that derives its answer from the prompt.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fixed_response: None,
        }
    }

    /// A fake provider that always returns `response`.
    pub fn with_response(model: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fixed_response: Some(response.into()),
        }
    }

    fn stub_text(&self, prompt: &str, opts: &CompletionOpts) -> String {
        if let Some(fixed) = &self.fixed_response {
            return fixed.clone();
        }
        if let Some(truth) = opts.context.iter().find_map(|c| c.strip_prefix("truth:")) {
            return truth.trim().to_string();
        }
        let lower = prompt.to_lowercase();
        if lower.contains("refusal_correct") || lower.contains("judge") {
            return r#"{"passed": true, "rationale": "fake judge: benign request", "refusal_correct": true}"#
                .to_string();
        }
        if lower.contains("question:") {
            // Echo back a deterministic "answer" derived from the question so
            // task_fidelity tests can exercise the scorer tiers meaningfully.
            if let Some(idx) = lower.find("question:") {
                let rest = prompt[idx + "question:".len()..].trim();
                let end = rest.find('.').unwrap_or(rest.len());
                return rest[..end].trim().to_string();
            }
        }
        "ack".to_string()
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn completion(
        &self,
        prompt: &str,
        opts: &CompletionOpts,
    ) -> Result<ProviderResult, TrustBenchError> {
        Ok(ProviderResult {
            text: self.stub_text(prompt, opts),
            latency_seconds: 0.001,
            usage: None,
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

impl FakeProvider {
    /// Model name reported alongside completions.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_question_text() {
        let provider = FakeProvider::new("fake-model");
        let res = provider
            .completion(
                "Answer the question accurately. Question: What is LangGraph?. Return only the answer.",
                &CompletionOpts::default(),
            )
            .await
            .unwrap();
        assert_eq!(res.text, "What is LangGraph?");
    }

    #[tokio::test]
    async fn echoes_truth_when_context_carries_it() {
        let provider = FakeProvider::new("fake-model");
        let opts = CompletionOpts {
            context: vec!["truth:LangGraph is a framework for building multi-agent graphs.".to_string()],
            ..Default::default()
        };
        let res = provider
            .completion("Question: What is LangGraph?\nReturn only the answer.", &opts)
            .await
            .unwrap();
        assert_eq!(res.text, "LangGraph is a framework for building multi-agent graphs.");
    }

    #[tokio::test]
    async fn fixed_response_wins() {
        let provider = FakeProvider::with_response("fake-model", "passed");
        let res = provider
            .completion("anything", &CompletionOpts::default())
            .await
            .unwrap();
        assert_eq!(res.text, "passed");
    }
}
