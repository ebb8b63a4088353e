//! LLM-judge scorer: top tier of the fallback chain. Fully implemented but
//! disabled by default, matching the commented-out RAGAS path in the
//! recovered `agents/task_fidelity.py` and the "disabled by default" call in
//! spec.md §4.3.

use super::{Scorer, ScorerMeta};
use crate::model::DatasetRecord;
use crate::providers::{BoundedProvider, CompletionOpts};
use async_trait::async_trait;
use std::sync::Arc;

/// Whether the judge tier runs at all.
#[derive(Debug, Clone)]
pub struct JudgeRuntimeConfig {
    /// Defaults to `false`: judge scoring is implemented but opt-in.
    pub enabled: bool,
}

impl Default for JudgeRuntimeConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

const JUDGE_PROMPT: &str = "You are evaluating answer faithfulness against a reference. \
Return JSON: {\"score\": <0.0-1.0>, \"rationale\": str}\n\nAnswer: {answer}\nReference: {truth}";

/// Scores answers by asking an LLM to rate faithfulness against the
/// reference, in `[0.0, 1.0]`.
pub struct JudgeScorer {
    config: JudgeRuntimeConfig,
    provider: Option<Arc<BoundedProvider>>,
}

impl JudgeScorer {
    /// A judge scorer that is disabled unless `config.enabled` and a
    /// provider are both present.
    pub fn new(config: JudgeRuntimeConfig) -> Self {
        Self {
            config,
            provider: None,
        }
    }

    /// Attach the provider used to issue judge calls.
    pub fn with_provider(mut self, provider: Arc<BoundedProvider>) -> Self {
        self.provider = Some(provider);
        self
    }
}

#[async_trait]
impl Scorer for JudgeScorer {
    async fn try_score(
        &self,
        rows: &[DatasetRecord],
        answers: &[String],
    ) -> Option<(Vec<f64>, ScorerMeta)> {
        if !self.config.enabled {
            return None;
        }
        let provider = self.provider.as_ref()?;

        let mut scores = Vec::with_capacity(rows.len());
        for (row, answer) in rows.iter().zip(answers.iter()) {
            let prompt = JUDGE_PROMPT
                .replace("{answer}", answer)
                .replace("{truth}", &row.truth);
            let (value, _) = provider
                .json_completion(&prompt, &CompletionOpts::default())
                .await
                .ok()?;
            let score = value.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0);
            scores.push(score.clamp(0.0, 1.0));
        }

        Some((
            scores,
            ScorerMeta {
                scorer: "judge",
                reason: None,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_judge_falls_through() {
        let scorer = JudgeScorer::new(JudgeRuntimeConfig::default());
        let rows = vec![DatasetRecord {
            id: "1".into(),
            question: "q".into(),
            truth: "truth".into(),
        }];
        let answers = vec!["answer".to_string()];
        assert!(scorer.try_score(&rows, &answers).await.is_none());
    }
}
