//! Deterministic in-memory [`ToolClient`](super::ToolClient) for tests: no
//! network, scripted responses keyed by tool name.

use super::ToolClient;
use crate::errors::TrustBenchError;
use crate::model::ToolResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Returns a canned [`ToolResult`] per tool name, defaulting to an empty
/// success when no script entry exists.
pub struct FakeToolClient {
    scripted: Mutex<HashMap<String, ToolResult>>,
    tool_names: Vec<String>,
}

impl FakeToolClient {
    /// A fake bridge that reports `tool_names` as discoverable and returns
    /// empty successes for anything not explicitly scripted.
    pub fn new(tool_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            scripted: Mutex::new(HashMap::new()),
            tool_names: tool_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Script the result returned for the next (and all following) calls to `tool`.
    pub fn script(&self, tool: impl Into<String>, result: ToolResult) {
        self.scripted.lock().unwrap().insert(tool.into(), result);
    }
}

#[async_trait]
impl ToolClient for FakeToolClient {
    async fn call(&self, tool: &str, _args: serde_json::Value) -> Result<ToolResult, TrustBenchError> {
        Ok(self
            .scripted
            .lock()
            .unwrap()
            .get(tool)
            .cloned()
            .unwrap_or_else(|| ToolResult::ok(Vec::new(), serde_json::json!({}))))
    }

    async fn discover(&self) -> Result<Vec<String>, TrustBenchError> {
        Ok(self.tool_names.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_scripted_result() {
        let client = FakeToolClient::new(["prompt_guard"]);
        client.script(
            "prompt_guard",
            ToolResult::ok(vec![serde_json::json!({"blocked": true})], serde_json::json!({"blocked": 1})),
        );
        let result = client.call("prompt_guard", serde_json::json!({})).await.unwrap();
        assert!(result.ok);
        assert_eq!(result.findings.len(), 1);
    }

    #[tokio::test]
    async fn unscripted_call_defaults_to_empty_success() {
        let client = FakeToolClient::new(Vec::<String>::new());
        let result = client.call("secrets_scan", serde_json::json!({})).await.unwrap();
        assert!(result.ok);
        assert!(result.findings.is_empty());
    }
}
