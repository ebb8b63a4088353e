//! Embedding-similarity scorer: the middle tier, grounded on the recovered
//! `agents/embedding_scorer.py::EmbeddingScorer` (cosine similarity over an
//! embedding model), adapted to the teacher's `Embedder` capability trait.

use super::{Scorer, ScorerMeta};
use crate::model::DatasetRecord;
use crate::providers::Embedder;
use async_trait::async_trait;
use std::sync::Arc;

/// Scores answers by cosine similarity of their embedding against the
/// ground truth's embedding, clamped to `[0, 1]`.
pub struct EmbeddingScorer {
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingScorer {
    /// Build a scorer backed by `embedder`.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

#[async_trait]
impl Scorer for EmbeddingScorer {
    async fn try_score(
        &self,
        rows: &[DatasetRecord],
        answers: &[String],
    ) -> Option<(Vec<f64>, ScorerMeta)> {
        let mut scores = Vec::with_capacity(rows.len());
        for (row, answer) in rows.iter().zip(answers.iter()) {
            if answer.is_empty() || row.truth.is_empty() {
                scores.push(0.0);
                continue;
            }
            let answer_vec = self.embedder.embed(answer).await.ok()?;
            let truth_vec = self.embedder.embed(&row.truth).await.ok()?;
            scores.push(cosine_similarity(&answer_vec, &truth_vec).clamp(0.0, 1.0));
        }
        Some((
            scores,
            ScorerMeta {
                scorer: "embedding",
                reason: None,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FakeEmbedder;

    #[tokio::test]
    async fn identical_vectors_score_one() {
        let embedder = Arc::new(FakeEmbedder::new("fake-embed", vec![1.0, 0.0, 0.0]));
        let scorer = EmbeddingScorer::new(embedder);
        let rows = vec![DatasetRecord {
            id: "1".into(),
            question: "q".into(),
            truth: "truth".into(),
        }];
        let answers = vec!["answer".to_string()];
        let (scores, meta) = scorer.try_score(&rows, &answers).await.unwrap();
        assert_eq!(scores, vec![1.0]);
        assert_eq!(meta.scorer, "embedding");
    }
}
