//! Core data types shared across providers, tools, agents, and the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the four evaluator pillars. Stable wire form matches spec vocabulary
/// (`task`, `system`, `security`, `ethics`); the human-facing Athena/Helios/
/// Aegis/Eidos identities live only in the agent manifest (`crate::manifest`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PillarName {
    /// task_fidelity
    Task,
    /// system_perf
    System,
    /// security_eval
    Security,
    /// ethics_refusal
    Ethics,
}

impl PillarName {
    /// Declaration order used to keep `gate.failed[]` stable for diffs.
    pub const DECLARATION_ORDER: [PillarName; 4] = [
        PillarName::Task,
        PillarName::System,
        PillarName::Security,
        PillarName::Ethics,
    ];
}

impl fmt::Display for PillarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PillarName::Task => "task",
            PillarName::System => "system",
            PillarName::Security => "security",
            PillarName::Ethics => "ethics",
        };
        write!(f, "{s}")
    }
}

/// A single labeled example loaded from a dataset file. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Stable identifier within the dataset.
    pub id: String,
    /// The question/prompt presented to the system under test.
    pub question: String,
    /// The reference/ground-truth answer.
    pub truth: String,
}

/// Result of a single provider completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    /// Generated text.
    pub text: String,
    /// Measured wall-clock latency in seconds.
    pub latency_seconds: f64,
    /// Opaque usage accounting, when the provider reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Value>,
}

/// Uniform result shape returned by every tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool call succeeded.
    pub ok: bool,
    /// Findings reported by the tool (empty when `ok` is false or none found).
    pub findings: Vec<serde_json::Value>,
    /// Opaque tool-specific statistics (e.g. `{"blocked": 3, "total": 10}`).
    pub stats: serde_json::Value,
    /// Present when `ok` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Build a successful result.
    pub fn ok(findings: Vec<serde_json::Value>, stats: serde_json::Value) -> Self {
        Self {
            ok: true,
            findings,
            stats,
            error: None,
        }
    }

    /// Build a failed result. Tool failure never raises; it's surfaced as data
    /// so agents can record a failure rather than crash.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            findings: Vec::new(),
            stats: serde_json::json!({}),
            error: Some(error.into()),
        }
    }
}

/// One failure observation recorded by a pillar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    /// Which pillar recorded this failure.
    pub pillar: PillarName,
    /// Sample/finding identifier (a dataset record id, a tool name, etc).
    pub id: String,
    /// Machine-readable reason code, e.g. `low_faithfulness`.
    pub reason: String,
    /// Optional free-form detail payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// What a single evaluator agent produces: `{metrics, failures[]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentResult {
    /// Flat numeric metric map for this pillar.
    pub metrics: BTreeMap<String, f64>,
    /// Failures recorded during this pillar's run.
    pub failures: Vec<Failure>,
    /// Non-numeric metric fields (e.g. `provider_used`, `scorer`) kept
    /// separate from the numeric map so gate math never has to filter types.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}
