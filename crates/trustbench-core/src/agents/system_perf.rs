//! System performance agent: measures provider latency distribution.
//! Grounded on the recovered `agents/system_perf.py`.

use crate::config::Profile;
use crate::errors::TrustBenchError;
use crate::model::{AgentResult, Failure, PillarName};
use crate::providers::{BoundedProvider, CompletionOpts};
use std::path::Path;

const LATENCY_PROMPT: &str = "Latency-probe: respond with a short acknowledgement.";

/// Run the system performance pillar: fire `sampling.n` latency probes and
/// report p95/mean latency against `thresholds.p95_latency`.
pub async fn run(
    profile: &Profile,
    provider: &BoundedProvider,
    workdir: &Path,
) -> Result<AgentResult, TrustBenchError> {
    let n = profile.sampling.n.max(1) as usize;
    let mut latencies = Vec::with_capacity(n);
    let mut responses = Vec::with_capacity(n);

    for _ in 0..n {
        let result = provider
            .completion(LATENCY_PROMPT, &CompletionOpts::default())
            .await?;
        latencies.push(result.latency_seconds);
        responses.push(result.text);
    }

    let mut sorted = latencies.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let p95_index = ((0.95 * sorted.len() as f64) as usize).saturating_sub(1).min(sorted.len() - 1);
    let p95_latency = sorted[p95_index];
    let mean_latency = sorted.iter().sum::<f64>() / sorted.len() as f64;

    std::fs::create_dir_all(workdir)
        .map_err(|e| TrustBenchError::Storage(format!("failed to create {}: {e}", workdir.display())))?;
    let path = workdir.join("latency_samples.json");
    let body = serde_json::to_string_pretty(&serde_json::json!({
        "latencies": latencies,
        "responses": responses,
    }))
    .map_err(|e| TrustBenchError::Storage(format!("failed to serialize latency samples: {e}")))?;
    std::fs::write(&path, body)
        .map_err(|e| TrustBenchError::Storage(format!("failed to write {}: {e}", path.display())))?;

    let mut failures = Vec::new();
    if p95_latency > profile.thresholds.p95_latency {
        failures.push(Failure {
            pillar: PillarName::System,
            id: "latency".to_string(),
            reason: "p95_latency_exceeded".to_string(),
            detail: Some(serde_json::json!({
                "score": p95_latency,
                "threshold": profile.thresholds.p95_latency,
            })),
        });
    }

    let mut agent_result = AgentResult::default();
    agent_result.metrics.insert("p95_latency".to_string(), p95_latency);
    agent_result.metrics.insert("mean_latency".to_string(), mean_latency);
    agent_result.metrics.insert("samples".to_string(), latencies.len() as f64);
    agent_result.failures = failures;
    Ok(agent_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Sampling, Thresholds};
    use crate::providers::{fake::FakeProvider, RetryPolicy};
    use std::sync::Arc;

    fn profile() -> Profile {
        Profile {
            name: "test".into(),
            provider_id: "fake".into(),
            secondary_provider_id: None,
            model: "fake-model".into(),
            dataset_path: "unused".into(),
            adversarial_path: "unused".into(),
            unsafe_path: "unused".into(),
            repo_path: None,
            semgrep_rules_path: None,
            thresholds: Thresholds {
                faithfulness: 0.5,
                p95_latency: 10.0,
                injection_block_rate: 0.8,
                refusal_accuracy: 0.9,
                warn_threshold: 0.75,
            },
            sampling: Sampling { n: 5, seed: 1 },
        }
    }

    #[tokio::test]
    async fn reports_p95_within_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let provider = BoundedProvider::new(
            Arc::new(FakeProvider::new("fake-model")),
            4,
            RetryPolicy::default(),
        );
        let result = run(&profile(), &provider, &dir.path().join("work")).await.unwrap();
        assert_eq!(result.metrics["samples"], 5.0);
        assert!(result.failures.is_empty());
    }
}
