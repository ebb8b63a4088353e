//! Scorer layer: an ordered chain of scoring tiers the task fidelity agent
//! walks until one produces a result — judge (disabled by default), then
//! embedding similarity, then token overlap, which always succeeds.

pub mod embedding;
pub mod judge;
pub mod token_overlap;

use crate::model::DatasetRecord;
use async_trait::async_trait;

pub use embedding::EmbeddingScorer;
pub use judge::{JudgeRuntimeConfig, JudgeScorer};
pub use token_overlap::TokenOverlapScorer;

/// Metadata describing which scorer produced a result and why earlier tiers
/// were skipped.
#[derive(Debug, Clone)]
pub struct ScorerMeta {
    /// Name of the scorer that produced the scores (`"judge"`, `"embedding"`,
    /// `"token_overlap"`).
    pub scorer: &'static str,
    /// Why this tier was reached, e.g. `"embedding_failed_using_token_overlap"`.
    pub reason: Option<String>,
}

/// One scoring tier. `try_score` returns `None` when this tier is
/// unavailable or fails, letting the caller fall through to the next one.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Attempt to score each `(row, answer)` pair; `None` falls through.
    async fn try_score(
        &self,
        rows: &[DatasetRecord],
        answers: &[String],
    ) -> Option<(Vec<f64>, ScorerMeta)>;
}

/// Run `rows`/`answers` through `tiers` in order, returning the first
/// tier's result. The chain is expected to end in [`TokenOverlapScorer`],
/// which never returns `None`, so this always resolves.
pub async fn score_with_fallback(
    tiers: &[Box<dyn Scorer>],
    rows: &[DatasetRecord],
    answers: &[String],
) -> (Vec<f64>, ScorerMeta) {
    for tier in tiers {
        if let Some(result) = tier.try_score(rows, answers).await {
            return result;
        }
    }
    (
        vec![0.0; answers.len()],
        ScorerMeta {
            scorer: "none",
            reason: Some("no scorer tier produced a result".to_string()),
        },
    )
}

/// Default scorer chain: judge (disabled), embedding (no embedder
/// configured by default), token overlap (always available).
pub fn default_chain() -> Vec<Box<dyn Scorer>> {
    vec![
        Box::new(JudgeScorer::new(JudgeRuntimeConfig::default())),
        Box::new(TokenOverlapScorer),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, truth: &str) -> DatasetRecord {
        DatasetRecord {
            id: id.to_string(),
            question: "q".to_string(),
            truth: truth.to_string(),
        }
    }

    #[tokio::test]
    async fn default_chain_falls_through_to_token_overlap() {
        let chain = default_chain();
        let rows = vec![row("1", "Paris is the capital of France")];
        let answers = vec!["Paris is the capital of France".to_string()];
        let (scores, meta) = score_with_fallback(&chain, &rows, &answers).await;
        assert_eq!(scores, vec![1.0]);
        assert_eq!(meta.scorer, "token_overlap");
    }
}
