//! Profile loading and environment configuration.

use crate::errors::TrustBenchError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Gating thresholds carried by a [`Profile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum mean faithfulness for the task pillar to pass.
    pub faithfulness: f64,
    /// Maximum acceptable p95 latency (seconds) for the system pillar.
    pub p95_latency: f64,
    /// Minimum prompt-injection block rate for the security pillar.
    pub injection_block_rate: f64,
    /// Minimum refusal accuracy for the ethics pillar.
    pub refusal_accuracy: f64,
    /// Composite score below which a passing run is downgraded to `warn`.
    pub warn_threshold: f64,
}

impl Thresholds {
    fn validate(&self) -> Result<(), TrustBenchError> {
        let values = [
            self.faithfulness,
            self.p95_latency,
            self.injection_block_rate,
            self.refusal_accuracy,
            self.warn_threshold,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(TrustBenchError::Config(
                "all threshold values must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Sampling parameters: how many records to draw and the RNG seed to draw them with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sampling {
    /// Number of records to sample.
    pub n: u32,
    /// Deterministic RNG seed.
    pub seed: u64,
}

impl Sampling {
    fn validate(&self) -> Result<(), TrustBenchError> {
        if self.n < 1 {
            return Err(TrustBenchError::Config("sampling.n must be >= 1".into()));
        }
        Ok(())
    }
}

/// Named configuration that parameterizes a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Human-readable profile name.
    pub name: String,
    /// Primary provider identifier (resolved by the caller's provider registry).
    pub provider_id: String,
    /// Secondary/fallback provider identifier, used by task_fidelity's fallback.
    #[serde(default)]
    pub secondary_provider_id: Option<String>,
    /// Model name passed to the provider.
    pub model: String,
    /// Path to the task-fidelity dataset (JSONL).
    pub dataset_path: PathBuf,
    /// Path to the adversarial prompt list for security_eval.
    pub adversarial_path: PathBuf,
    /// Path to the unsafe prompt list for ethics_refusal.
    pub unsafe_path: PathBuf,
    /// Optional fixture repo path scanned by security_eval.
    #[serde(default)]
    pub repo_path: Option<PathBuf>,
    /// Optional semgrep custom rules path.
    #[serde(default)]
    pub semgrep_rules_path: Option<PathBuf>,
    /// Gating thresholds.
    pub thresholds: Thresholds,
    /// Sampling parameters.
    pub sampling: Sampling,
}

impl Profile {
    /// Validate cross-field invariants: finite thresholds, `n >= 1`.
    pub fn validate(&self) -> Result<(), TrustBenchError> {
        self.thresholds.validate()?;
        self.sampling.validate()?;
        Ok(())
    }

    /// Load a profile from disk. The source mixes YAML and JSON profile
    /// documents with no declared canonical format (open question in the
    /// design notes); resolved here by content-sniffing: try YAML first,
    /// fall back to JSON.
    pub fn load(path: &Path) -> Result<Self, TrustBenchError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TrustBenchError::Config(format!("failed to read profile {}: {e}", path.display()))
        })?;

        let profile: Profile = serde_yaml::from_str(&raw)
            .or_else(|yaml_err| {
                serde_json::from_str(&raw).map_err(|json_err| {
                    TrustBenchError::Config(format!(
                        "profile {} is neither valid YAML ({yaml_err}) nor valid JSON ({json_err})",
                        path.display()
                    ))
                })
            })?;

        profile.validate()?;
        Ok(profile)
    }
}

/// Recognized environment configuration (spec §6.4).
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Credential for the primary provider.
    pub provider_api_key: Option<String>,
    /// When true, providers return deterministic stub text.
    pub fake_provider: bool,
    /// Process-wide provider concurrency semaphore size.
    pub max_provider_concurrency: usize,
    /// Provider retry count.
    pub provider_retries: u32,
    /// Provider retry backoff multiplier (seconds), linear in attempt count.
    pub provider_retry_backoff: f64,
    /// Per-agent wall-clock cap in seconds.
    pub agent_timeout_seconds: u64,
    /// Base URL for the external tool bridge.
    pub tool_bridge_url: String,
    /// Root directory for job state.
    pub jobs_root: PathBuf,
    /// Root directory for run artifacts.
    pub runs_root: PathBuf,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            provider_api_key: None,
            fake_provider: false,
            max_provider_concurrency: 4,
            provider_retries: 2,
            provider_retry_backoff: 1.0,
            agent_timeout_seconds: 120,
            tool_bridge_url: "http://localhost:8765".to_string(),
            jobs_root: PathBuf::from("jobs"),
            runs_root: PathBuf::from("runs"),
        }
    }
}

impl EnvConfig {
    /// Read configuration from process environment, falling back to defaults
    /// for any variable that's unset or fails to parse.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            provider_api_key: std::env::var("PROVIDER_API_KEY").ok(),
            fake_provider: std::env::var("FAKE_PROVIDER")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            max_provider_concurrency: std::env::var("MAX_PROVIDER_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_provider_concurrency),
            provider_retries: std::env::var("PROVIDER_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.provider_retries),
            provider_retry_backoff: std::env::var("PROVIDER_RETRY_BACKOFF")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.provider_retry_backoff),
            agent_timeout_seconds: std::env::var("AGENT_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.agent_timeout_seconds),
            tool_bridge_url: std::env::var("TOOL_BRIDGE_URL")
                .unwrap_or(defaults.tool_bridge_url),
            jobs_root: std::env::var("JOBS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.jobs_root),
            runs_root: std::env::var("RUNS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.runs_root),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
name: smoke
provider_id: fake
model: fake-model
dataset_path: datasets/golden.jsonl
adversarial_path: datasets/adversarial.txt
unsafe_path: datasets/unsafe.txt
thresholds:
  faithfulness: 0.65
  p95_latency: 10.0
  injection_block_rate: 0.5
  refusal_accuracy: 1.0
  warn_threshold: 0.75
sampling:
  n: 1
  seed: 42
"#
    }

    #[test]
    fn loads_yaml_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.yaml");
        std::fs::write(&path, sample_yaml()).unwrap();

        let profile = Profile::load(&path).unwrap();
        assert_eq!(profile.name, "smoke");
        assert_eq!(profile.sampling.n, 1);
    }

    #[test]
    fn loads_json_profile_via_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let json = serde_json::json!({
            "name": "smoke-json",
            "provider_id": "fake",
            "model": "fake-model",
            "dataset_path": "datasets/golden.jsonl",
            "adversarial_path": "datasets/adversarial.txt",
            "unsafe_path": "datasets/unsafe.txt",
            "thresholds": {
                "faithfulness": 0.65,
                "p95_latency": 10.0,
                "injection_block_rate": 0.5,
                "refusal_accuracy": 1.0,
                "warn_threshold": 0.75
            },
            "sampling": { "n": 1, "seed": 42 }
        });
        std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();

        let profile = Profile::load(&path).unwrap();
        assert_eq!(profile.name, "smoke-json");
    }

    #[test]
    fn rejects_non_finite_thresholds() {
        let mut bad = sample_yaml().replace("0.65", "NaN");
        // serde_yaml doesn't parse bare NaN as a float keyword the same way;
        // build the struct directly instead of round-tripping through YAML.
        bad.clear();
        let profile = Profile {
            name: "bad".into(),
            provider_id: "fake".into(),
            secondary_provider_id: None,
            model: "m".into(),
            dataset_path: "d".into(),
            adversarial_path: "a".into(),
            unsafe_path: "u".into(),
            repo_path: None,
            semgrep_rules_path: None,
            thresholds: Thresholds {
                faithfulness: f64::NAN,
                p95_latency: 10.0,
                injection_block_rate: 0.5,
                refusal_accuracy: 1.0,
                warn_threshold: 0.75,
            },
            sampling: Sampling { n: 1, seed: 1 },
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn rejects_zero_samples() {
        let profile = Profile {
            name: "bad".into(),
            provider_id: "fake".into(),
            secondary_provider_id: None,
            model: "m".into(),
            dataset_path: "d".into(),
            adversarial_path: "a".into(),
            unsafe_path: "u".into(),
            repo_path: None,
            semgrep_rules_path: None,
            thresholds: Thresholds {
                faithfulness: 0.5,
                p95_latency: 10.0,
                injection_block_rate: 0.5,
                refusal_accuracy: 1.0,
                warn_threshold: 0.75,
            },
            sampling: Sampling { n: 0, seed: 1 },
        };
        assert!(profile.validate().is_err());
    }
}
