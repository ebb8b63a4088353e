//! HTTP-backed [`ToolClient`](super::ToolClient): `POST {base}/tools/{name}`
//! with `{"args": {...}}`, bearer auth optional.

use super::ToolClient;
use crate::errors::TrustBenchError;
use crate::model::ToolResult;
use async_trait::async_trait;
use std::time::Duration;

/// Talks to the external tool bridge over HTTP.
pub struct HttpToolClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpToolClient {
    /// Build a client against `base_url` (e.g. `http://localhost:8765`),
    /// timing each call out after `timeout`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url.trim_end_matches('/'));
        let mut req = self.client.post(url);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        req
    }
}

#[async_trait]
impl ToolClient for HttpToolClient {
    async fn call(&self, tool: &str, args: serde_json::Value) -> Result<ToolResult, TrustBenchError> {
        let payload = serde_json::json!({ "args": args });
        let resp = self
            .request(&format!("/tools/{tool}"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| TrustBenchError::Tool {
                tool: tool.to_string(),
                message: format!("transport error: {e}"),
            })?;

        if !resp.status().is_success() {
            return Err(TrustBenchError::Tool {
                tool: tool.to_string(),
                message: format!("bridge returned status {}", resp.status()),
            });
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| TrustBenchError::Tool {
            tool: tool.to_string(),
            message: format!("bridge returned non-JSON body: {e}"),
        })?;

        let ok = body.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
        if !ok {
            let message = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            return Ok(ToolResult::failed(message));
        }

        let data = body.get("data").cloned().unwrap_or(serde_json::json!({}));
        let findings = data
            .get("findings")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let stats = data.get("stats").cloned().unwrap_or(serde_json::json!({}));
        Ok(ToolResult::ok(findings, stats))
    }

    async fn discover(&self) -> Result<Vec<String>, TrustBenchError> {
        let resp = self
            .request("/discover")
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| TrustBenchError::Tool {
                tool: "discover".to_string(),
                message: format!("transport error: {e}"),
            })?;

        let body: serde_json::Value = resp.json().await.map_err(|e| TrustBenchError::Tool {
            tool: "discover".to_string(),
            message: format!("bridge returned non-JSON body: {e}"),
        })?;

        Ok(body
            .get("tools")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }
}
