//! Error taxonomy for the evaluation engine.
//!
//! Agents and the orchestrator never panic: failures are either recovered
//! locally (retries) or translated into one of these variants and surfaced
//! as a structured failure record. Only [`TrustBenchError::Config`] and
//! [`TrustBenchError::Storage`] abort an entire run.

use std::time::Duration;

/// Error taxonomy (kinds, not type names) per the failure semantics design.
#[derive(Debug, thiserror::Error)]
pub enum TrustBenchError {
    /// Bad profile, missing key, unreadable dataset. No recovery; fails the run at start.
    #[error("config error: {0}")]
    Config(String),

    /// Credential missing and fake mode disabled.
    #[error("provider unauthorized: {0}")]
    Unauthorized(String),

    /// Retriable: provider reported rate limiting.
    #[error("provider rate limited: {0}")]
    RateLimited(String),

    /// Retriable: provider call exceeded its timeout.
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),

    /// Non-retriable: provider/model not available.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// LLM returned non-JSON where JSON was required, after exhausting retries.
    #[error("failed to parse JSON completion: {0}")]
    Parse(String),

    /// Tool bridge returned ok=false or an HTTP/transport error.
    #[error("tool '{tool}' failed: {message}")]
    Tool {
        /// Tool name as passed to `ToolClient::call`.
        tool: String,
        /// Human-readable failure detail.
        message: String,
    },

    /// Caller signaled cancellation; in-flight work was allowed to drain.
    #[error("run cancelled")]
    Cancelled,

    /// Disk write failure; aborts the run, no partial gate.json is written.
    #[error("storage error: {0}")]
    Storage(String),
}

impl TrustBenchError {
    /// Retriable errors per the provider retry policy (§4.1): rate limits,
    /// timeouts, and JSON parse failures are retried with backoff; everything
    /// else is not.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Timeout(_) | Self::Parse(_))
    }
}
