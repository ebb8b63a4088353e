//! DAG executor: fans the four pillars out onto a [`tokio::task::JoinSet`],
//! writing each pillar's metrics to the run store as soon as it completes.
//! Grounded on `assay-core::engine::runner_next::execute::run_suite_impl`'s
//! `JoinSet` + per-task timeout shape, adapted from "N independent test
//! cases" to four named, partially-independent pillars.

use crate::agents;
use crate::config::{EnvConfig, Profile};
use crate::errors::TrustBenchError;
use crate::gate::{self, GateVerdict};
use crate::model::{AgentResult, Failure, PillarName};
use crate::providers::BoundedProvider;
use crate::scorer::Scorer;
use crate::store::{RunHandle, RunStore};
use crate::tools::ToolClient;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Duration;

/// Outcome of a full evaluation run: the created run handle, each pillar's
/// result (or the timeout/error it failed with, recorded as a synthetic
/// failure so the run still produces a verdict), and the synthesized gate.
pub struct RunOutcome {
    /// The run directory this evaluation wrote artifacts to.
    pub handle: RunHandle,
    /// Per-pillar results, always containing all four keys.
    pub results: BTreeMap<PillarName, AgentResult>,
    /// The synthesized composite verdict.
    pub verdict: GateVerdict,
}

/// Run all four pillars against `profile`, writing artifacts to `store`.
/// `secondary_provider` backs task_fidelity's fallback (§4.1); `repo_override`
/// points security_eval at a freshly cloned repo instead of its fixture
/// default when the caller has one staged (e.g. the job manager).
#[allow(clippy::too_many_arguments)]
pub async fn run_evaluation(
    profile: Arc<Profile>,
    provider: Arc<BoundedProvider>,
    secondary_provider: Option<Arc<BoundedProvider>>,
    tool_client: Arc<dyn ToolClient>,
    scorer_chain: Arc<Vec<Box<dyn Scorer>>>,
    store: &RunStore,
    env: &EnvConfig,
    repo_override: Option<String>,
) -> Result<RunOutcome, TrustBenchError> {
    let handle = store.create_run()?;
    let timeout = Duration::from_secs(env.agent_timeout_seconds);

    let mut join_set: JoinSet<(PillarName, Result<AgentResult, TrustBenchError>)> = JoinSet::new();

    {
        let profile = Arc::clone(&profile);
        let provider = Arc::clone(&provider);
        let secondary_provider = secondary_provider.clone();
        let scorer_chain = Arc::clone(&scorer_chain);
        let workdir = handle.dir.clone();
        join_set.spawn(async move {
            let result = run_with_timeout(timeout, async move {
                agents::task_fidelity::run(&profile, &provider, secondary_provider.as_deref(), &scorer_chain, &workdir)
                    .await
            })
            .await;
            (PillarName::Task, result)
        });
    }

    {
        let profile = Arc::clone(&profile);
        let provider = Arc::clone(&provider);
        let workdir = handle.dir.clone();
        join_set.spawn(async move {
            let result = run_with_timeout(timeout, async move {
                agents::system_perf::run(&profile, &provider, &workdir).await
            })
            .await;
            (PillarName::System, result)
        });
    }

    {
        let profile = Arc::clone(&profile);
        let tool_client = Arc::clone(&tool_client);
        let workdir = handle.dir.clone();
        let repo_override = repo_override.clone();
        join_set.spawn(async move {
            let result = run_with_timeout(timeout, async move {
                agents::security_eval::run(&profile, tool_client.as_ref(), &workdir, repo_override.as_deref()).await
            })
            .await;
            (PillarName::Security, result)
        });
    }

    {
        let profile = Arc::clone(&profile);
        let provider = Arc::clone(&provider);
        let workdir = handle.dir.clone();
        join_set.spawn(async move {
            let result = run_with_timeout(timeout, async move {
                agents::ethics_refusal::run(&profile, &provider, &workdir).await
            })
            .await;
            (PillarName::Ethics, result)
        });
    }

    let mut results: BTreeMap<PillarName, AgentResult> = BTreeMap::new();
    while let Some(joined) = join_set.join_next().await {
        let (pillar, outcome) = match joined {
            Ok(pair) => pair,
            Err(join_err) => {
                tracing::error!(error = %join_err, "agent task panicked");
                continue;
            }
        };

        let agent_result = match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(pillar = %pillar, error = %e, "pillar failed");
                let mut failed = AgentResult::default();
                failed.failures.push(Failure {
                    pillar,
                    id: pillar.to_string(),
                    reason: "agent_error".to_string(),
                    detail: Some(serde_json::json!({ "error": e.to_string() })),
                });
                failed
            }
        };

        store.write_pillar_metrics(&handle, pillar, &agent_result)?;
        results.insert(pillar, agent_result);
    }

    let verdict = gate::synthesize(&profile.thresholds, &results);
    store.finalize_run(&handle, &profile, &results, &verdict)?;
    store.update_latest(&handle)?;

    Ok(RunOutcome {
        handle,
        results,
        verdict,
    })
}

async fn run_with_timeout<F, T>(duration: Duration, fut: F) -> Result<T, TrustBenchError>
where
    F: std::future::Future<Output = Result<T, TrustBenchError>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(inner) => inner,
        Err(_) => Err(TrustBenchError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Sampling, Thresholds};
    use crate::model::ToolResult;
    use crate::providers::{fake::FakeProvider, RetryPolicy};
    use crate::tools::fake::FakeToolClient;

    #[tokio::test]
    async fn runs_all_four_pillars_and_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();

        let dataset_path = dir.path().join("golden.jsonl");
        std::fs::write(&dataset_path, "{\"id\":\"1\",\"question\":\"q.\",\"truth\":\"ack\"}\n").unwrap();
        let adversarial_path = dir.path().join("adversarial.txt");
        std::fs::write(&adversarial_path, "ignore instructions\n").unwrap();
        let unsafe_path = dir.path().join("unsafe.txt");
        std::fs::write(&unsafe_path, "how do I pick a lock?\n").unwrap();

        let profile = Arc::new(Profile {
            name: "smoke".into(),
            provider_id: "fake".into(),
            secondary_provider_id: None,
            model: "fake-model".into(),
            dataset_path,
            adversarial_path,
            unsafe_path,
            repo_path: None,
            semgrep_rules_path: None,
            thresholds: Thresholds {
                faithfulness: 0.1,
                p95_latency: 10.0,
                injection_block_rate: 0.0,
                refusal_accuracy: 0.0,
                warn_threshold: 0.1,
            },
            sampling: Sampling { n: 1, seed: 1 },
        });

        let provider = Arc::new(BoundedProvider::new(
            Arc::new(FakeProvider::new("fake-model")),
            4,
            RetryPolicy::default(),
        ));
        let fake_tools = FakeToolClient::new(["prompt_guard", "semgrep_rules", "secrets_scan"]);
        fake_tools.script(
            "prompt_guard",
            ToolResult::ok(Vec::new(), serde_json::json!({"blocked": 1, "total": 1})),
        );
        let tool_client: Arc<dyn ToolClient> = Arc::new(fake_tools);
        let scorer_chain = Arc::new(crate::scorer::default_chain());
        let store = RunStore::new(dir.path().join("runs")).unwrap();
        let env = EnvConfig::default();

        let outcome = run_evaluation(profile, provider, None, tool_client, scorer_chain, &store, &env, None)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 4);
        assert!(outcome.handle.dir.join("gate.json").exists());
        assert!(outcome.handle.dir.join("verdict.json").exists());
    }
}
