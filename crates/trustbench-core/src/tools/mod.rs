//! Tool bridge client: a uniform way to call out to the external tool
//! server (`prompt_guard`, `semgrep_rules`, `secrets_scan`, repo fixture
//! management) without agents knowing about HTTP.

pub mod fake;
pub mod http;

use crate::errors::TrustBenchError;
use crate::model::ToolResult;
use async_trait::async_trait;
use serde_json::Value;

/// Capability set every tool bridge implements.
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Call `tool` with `args`, returning its uniform result shape. Tool
    /// failures are data (`ToolResult::failed`), not errors; `Err` is
    /// reserved for transport failure against the bridge itself.
    async fn call(&self, tool: &str, args: Value) -> Result<ToolResult, TrustBenchError>;

    /// List tool names the bridge currently exposes.
    async fn discover(&self) -> Result<Vec<String>, TrustBenchError>;
}

/// `prompt_guard(prompts)`: classifies each prompt as blocked/allowed.
pub async fn prompt_guard(
    client: &dyn ToolClient,
    prompts: &[String],
) -> Result<ToolResult, TrustBenchError> {
    client
        .call("prompt_guard", serde_json::json!({ "prompts": prompts }))
        .await
}

/// `semgrep_rules(path, rules_path?)`: static analysis over a checked-out repo.
pub async fn semgrep_rules(
    client: &dyn ToolClient,
    path: &str,
    rules_path: Option<&str>,
) -> Result<ToolResult, TrustBenchError> {
    client
        .call(
            "semgrep_rules",
            serde_json::json!({ "path": path, "rules_path": rules_path }),
        )
        .await
}

/// `secrets_scan(path)`: scans a directory tree for likely credential leaks.
pub async fn secrets_scan(client: &dyn ToolClient, path: &str) -> Result<ToolResult, TrustBenchError> {
    client
        .call("secrets_scan", serde_json::json!({ "path": path }))
        .await
}

/// `download_and_extract_repo(repo_url)`: stages a fixture repo under a
/// scratch workspace and returns its local path.
pub async fn download_and_extract_repo(
    client: &dyn ToolClient,
    repo_url: &str,
) -> Result<ToolResult, TrustBenchError> {
    client
        .call(
            "download_and_extract_repo",
            serde_json::json!({ "repo_url": repo_url }),
        )
        .await
}

/// `env_content(dir_path)`: reads `.env`-shaped files under `dir_path` so
/// security_eval can check for committed secrets.
pub async fn env_content(
    client: &dyn ToolClient,
    dir_path: &str,
) -> Result<ToolResult, TrustBenchError> {
    client
        .call("env_content", serde_json::json!({ "dir_path": dir_path }))
        .await
}

/// `cleanup_workspace()`: removes any scratch repo staged by
/// `download_and_extract_repo`.
pub async fn cleanup_workspace(client: &dyn ToolClient) -> Result<ToolResult, TrustBenchError> {
    client.call("cleanup_workspace", serde_json::json!({})).await
}
