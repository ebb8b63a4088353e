//! Background worker that drives queued jobs through clone → analyze →
//! evaluate → report, updating [`JobStore`] state as it proceeds. Grounded
//! on the stage sequence in the recovered `job_store.py` (`JobStage::{Init,
//! Cloning, Analysis, Evaluation, Reporting, Complete}`) and on the
//! `JoinSet` fan-out idiom already used by `trustbench_core::orchestrator`.

use crate::jobs::{JobStage, JobState, JobStore, JobUpdate};
use std::sync::Arc;
use tokio::sync::mpsc;
use trustbench_core::config::{EnvConfig, Profile};
use trustbench_core::providers::fake::FakeProvider;
use trustbench_core::providers::openai::OpenAiProvider;
use trustbench_core::providers::{BoundedProvider, LlmProvider, RetryPolicy};
use trustbench_core::store::RunStore;
use trustbench_core::tools::http::HttpToolClient;
use trustbench_core::tools::ToolClient;

/// One unit of work: analyze `repo_url` under `profile_path` and record
/// progress against `job_id`.
pub struct AnalyzeRequest {
    pub job_id: String,
    pub repo_url: String,
    pub profile_path: std::path::PathBuf,
}

/// Owns the channel queued jobs are dispatched through and the shared run
/// store they write artifacts to.
pub struct JobManager {
    sender: mpsc::UnboundedSender<AnalyzeRequest>,
}

impl JobManager {
    /// Spawn the background worker loop.
    pub fn spawn(job_store: Arc<JobStore>, run_store: Arc<RunStore>, env: Arc<EnvConfig>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<AnalyzeRequest>();

        tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                process_job(&job_store, &run_store, &env, request).await;
            }
        });

        Self { sender }
    }

    /// Enqueue `request` for processing. Errors only if the worker loop has
    /// already shut down.
    pub fn enqueue(&self, request: AnalyzeRequest) -> Result<(), AnalyzeRequest> {
        self.sender.send(request).map_err(|e| e.0)
    }
}

fn resolve_provider(provider_id: &str, model: &str, env: &EnvConfig) -> Arc<dyn LlmProvider> {
    if env.fake_provider || provider_id == "fake" {
        return Arc::new(FakeProvider::new(model));
    }
    let api_key = env.provider_api_key.clone().unwrap_or_default();
    Arc::new(OpenAiProvider::new(model, api_key))
}

async fn process_job(
    job_store: &JobStore,
    run_store: &RunStore,
    env: &EnvConfig,
    request: AnalyzeRequest,
) {
    let AnalyzeRequest {
        job_id,
        repo_url,
        profile_path,
    } = request;

    let _ = job_store.update_job(
        &job_id,
        JobUpdate {
            state: Some(JobState::Cloning),
            stage: Some(JobStage::Cloning),
            progress: Some(0.1),
            message: Some(format!("staging {repo_url}")),
            ..Default::default()
        },
    );

    let tool_client: Arc<dyn ToolClient> = Arc::new(HttpToolClient::new(
        env.tool_bridge_url.clone(),
        None,
        std::time::Duration::from_secs(30),
    ));

    let staged = match trustbench_core::tools::download_and_extract_repo(tool_client.as_ref(), &repo_url).await {
        Ok(staged) => staged,
        Err(e) => {
            fail_job(job_store, &job_id, format!("failed to stage repository: {e}"));
            return;
        }
    };
    let repo_dir = staged.stats.get("repo_dir").and_then(|v| v.as_str()).map(str::to_string);
    let branch = staged.stats.get("branch").and_then(|v| v.as_str()).map(str::to_string);
    if let Some(repo_dir) = &repo_dir {
        let mut metadata_update = serde_json::Map::new();
        metadata_update.insert("workspace".to_string(), serde_json::Value::String(repo_dir.clone()));
        if let Some(branch) = &branch {
            metadata_update.insert("branch".to_string(), serde_json::Value::String(branch.clone()));
        }
        let _ = job_store.update_job(
            &job_id,
            JobUpdate {
                metadata_update: Some(metadata_update),
                ..Default::default()
            },
        );
    }

    let _ = job_store.update_job(
        &job_id,
        JobUpdate {
            state: Some(JobState::Analyzing),
            stage: Some(JobStage::Analysis),
            progress: Some(0.3),
            message: Some("profile loaded, evaluation starting".to_string()),
            ..Default::default()
        },
    );

    let profile = match Profile::load(&profile_path) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            fail_job(job_store, &job_id, format!("invalid profile: {e}"));
            return;
        }
    };

    let inner_provider = resolve_provider(&profile.provider_id, &profile.model, env);
    let provider = Arc::new(BoundedProvider::new(
        inner_provider,
        env.max_provider_concurrency,
        RetryPolicy {
            max_retries: env.provider_retries,
            backoff_seconds: env.provider_retry_backoff,
        },
    ));
    let secondary_provider = profile.secondary_provider_id.as_deref().map(|id| {
        Arc::new(BoundedProvider::new(
            resolve_provider(id, &profile.model, env),
            env.max_provider_concurrency,
            RetryPolicy {
                max_retries: env.provider_retries,
                backoff_seconds: env.provider_retry_backoff,
            },
        ))
    });
    let scorer_chain = Arc::new(trustbench_core::scorer::default_chain());

    let _ = job_store.update_job(
        &job_id,
        JobUpdate {
            state: Some(JobState::Evaluating),
            stage: Some(JobStage::Evaluation),
            progress: Some(0.5),
            ..Default::default()
        },
    );

    let outcome = trustbench_core::orchestrator::run_evaluation(
        profile,
        provider,
        secondary_provider,
        tool_client,
        scorer_chain,
        run_store,
        env,
        repo_dir,
    )
    .await;

    match outcome {
        Ok(outcome) => {
            let _ = job_store.update_job(
                &job_id,
                JobUpdate {
                    state: Some(JobState::Reporting),
                    stage: Some(JobStage::Reporting),
                    progress: Some(0.9),
                    ..Default::default()
                },
            );

            let mut artifacts = serde_json::Map::new();
            artifacts.insert("run_id".to_string(), serde_json::Value::String(outcome.handle.run_id.clone()));
            artifacts.insert(
                "decision".to_string(),
                serde_json::to_value(outcome.verdict.decision).unwrap_or(serde_json::Value::Null),
            );

            let _ = job_store.update_job(
                &job_id,
                JobUpdate {
                    state: Some(JobState::Complete),
                    stage: Some(JobStage::Complete),
                    progress: Some(1.0),
                    message: Some("evaluation complete".to_string()),
                    artifacts: Some(artifacts),
                    ..Default::default()
                },
            );
        }
        Err(e) => fail_job(job_store, &job_id, e.to_string()),
    }
}

fn fail_job(job_store: &JobStore, job_id: &str, error: String) {
    tracing::error!(job_id, %error, "job failed");
    let _ = job_store.update_job(
        job_id,
        JobUpdate {
            state: Some(JobState::Failed),
            error: Some(error),
            ..Default::default()
        },
    );
}
