//! Token-overlap scorer: the bottom tier of the fallback chain, always
//! available (no network, no model). Exact thresholds grounded on
//! `_fake_score` in the recovered `agents/task_fidelity.py`.

use super::{Scorer, ScorerMeta};
use crate::model::DatasetRecord;
use async_trait::async_trait;
use std::collections::HashSet;

/// Scores an answer against ground truth by exact/substring match, falling
/// back to token-set overlap.
pub struct TokenOverlapScorer;

fn score_pair(answer: &str, truth: &str) -> f64 {
    if answer.is_empty() || truth.is_empty() {
        return 0.0;
    }

    let answer_lower = answer.to_lowercase();
    let answer_lower = answer_lower.trim();
    let truth_lower = truth.to_lowercase();
    let truth_lower = truth_lower.trim();

    if answer_lower == truth_lower {
        return 1.0;
    }
    if truth_lower.contains(answer_lower) || answer_lower.contains(truth_lower) {
        return 0.8;
    }

    let answer_tokens: HashSet<&str> = answer_lower.split_whitespace().collect();
    let truth_tokens: HashSet<&str> = truth_lower.split_whitespace().collect();
    if truth_tokens.is_empty() {
        return 0.0;
    }

    let overlap = answer_tokens.intersection(&truth_tokens).count();
    if overlap == 0 {
        return 0.0;
    }
    let base_score = overlap as f64 / truth_tokens.len() as f64;
    base_score.max(0.3).min(0.9)
}

#[async_trait]
impl Scorer for TokenOverlapScorer {
    async fn try_score(
        &self,
        rows: &[DatasetRecord],
        answers: &[String],
    ) -> Option<(Vec<f64>, ScorerMeta)> {
        let scores = rows
            .iter()
            .zip(answers.iter())
            .map(|(row, answer)| score_pair(answer, &row.truth))
            .collect();
        Some((
            scores,
            ScorerMeta {
                scorer: "token_overlap",
                reason: None,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(score_pair("Paris", "paris"), 1.0);
    }

    #[test]
    fn substring_match_scores_point_eight() {
        assert_eq!(score_pair("The answer is Paris, France", "Paris, France"), 0.8);
    }

    #[test]
    fn partial_overlap_is_clamped() {
        let score = score_pair("cats and dogs", "dogs and birds and snakes");
        assert!(score >= 0.3 && score <= 0.9);
    }

    #[test]
    fn no_overlap_scores_zero() {
        assert_eq!(score_pair("completely unrelated", "something else entirely"), 0.0);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(score_pair("", "truth"), 0.0);
        assert_eq!(score_pair("answer", ""), 0.0);
    }
}
