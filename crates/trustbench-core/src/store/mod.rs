//! Run store: directory-per-run artifact layout with atomic writes.
//! Grounded on `ThirdKeyAI-Symbiont::metrics::file::FileExporter` (tempfile +
//! rename) and `assay-registry::cache_next::io::write_atomic`, with the
//! metric discovery walk grounded on the recovered
//! `trust_bench_studio/utils/run_store.py::_collect_numeric`.

pub mod report;

use crate::config::{Profile, Thresholds};
use crate::errors::TrustBenchError;
use crate::gate::GateVerdict;
use crate::model::{AgentResult, PillarName};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A run directory created by [`RunStore::create_run`].
#[derive(Debug, Clone)]
pub struct RunHandle {
    /// Stable run identifier (also the directory name under the runs root).
    pub run_id: String,
    /// Absolute path to the run's artifact directory.
    pub dir: PathBuf,
}

/// Persists run artifacts under a single root directory.
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    /// Open (creating if necessary) a run store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, TrustBenchError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| TrustBenchError::Storage(format!("failed to create runs root {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    /// Create a new run directory named from the current time and a short
    /// random suffix.
    pub fn create_run(&self) -> Result<RunHandle, TrustBenchError> {
        let run_id = format!(
            "{}-{}",
            chrono::Utc::now().format("%Y%m%dT%H%M%SZ"),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        let dir = self.root.join(&run_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| TrustBenchError::Storage(format!("failed to create run dir {}: {e}", dir.display())))?;
        Ok(RunHandle { run_id, dir })
    }

    /// Path to a previously created run directory, without creating it.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }

    /// Root directory this store manages.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_atomic_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), TrustBenchError> {
        let body = serde_json::to_string_pretty(value)
            .map_err(|e| TrustBenchError::Storage(format!("failed to serialize {}: {e}", path.display())))?;
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .map_err(|e| TrustBenchError::Storage(format!("failed to create {}: {e}", parent.display())))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| TrustBenchError::Storage(format!("failed to create temp file in {}: {e}", parent.display())))?;
        tmp.write_all(body.as_bytes())
            .map_err(|e| TrustBenchError::Storage(format!("failed to write temp file: {e}")))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| TrustBenchError::Storage(format!("failed to fsync temp file: {e}")))?;
        tmp.persist(path)
            .map_err(|e| TrustBenchError::Storage(format!("failed to persist {}: {e}", path.display())))?;
        Ok(())
    }

    /// Write `result` to `{pillar}_metrics.json` as soon as that pillar
    /// finishes, independent of the other pillars.
    pub fn write_pillar_metrics(
        &self,
        handle: &RunHandle,
        pillar: PillarName,
        result: &AgentResult,
    ) -> Result<(), TrustBenchError> {
        let path = handle.dir.join(format!("{pillar}_metrics.json"));
        self.write_atomic_json(&path, result)
    }

    /// Write the run-level artifacts once all pillars have completed:
    /// `metrics.json`, `gate.json`, `verdict.json`, `run.json`,
    /// `failures.csv` (when there are any), `report.md`, `report.html`.
    pub fn finalize_run(
        &self,
        handle: &RunHandle,
        profile: &Profile,
        results: &BTreeMap<PillarName, AgentResult>,
        verdict: &GateVerdict,
    ) -> Result<(), TrustBenchError> {
        let mut metrics_doc = serde_json::Map::new();
        for pillar in PillarName::DECLARATION_ORDER {
            if let Some(result) = results.get(&pillar) {
                for (key, value) in &result.metrics {
                    metrics_doc.insert(key.clone(), serde_json::json!(value));
                }
            }
        }
        self.write_atomic_json(&handle.dir.join("metrics.json"), &serde_json::Value::Object(metrics_doc))?;
        self.write_atomic_json(&handle.dir.join("gate.json"), &verdict.gate_artifact())?;
        self.write_atomic_json(&handle.dir.join("verdict.json"), verdict)?;

        let run_doc = serde_json::json!({
            "run_id": handle.run_id,
            "profile": profile.name,
            "created_at": chrono::Utc::now().to_rfc3339(),
            "decision": verdict.decision,
            "composite": verdict.composite,
        });
        self.write_atomic_json(&handle.dir.join("run.json"), &run_doc)?;

        if results.values().any(|result| !result.failures.is_empty()) {
            self.write_failures_csv(handle, results)?;
        }
        report::write_reports(&handle.dir, profile, results, verdict)?;
        Ok(())
    }

    fn write_failures_csv(
        &self,
        handle: &RunHandle,
        results: &BTreeMap<PillarName, AgentResult>,
    ) -> Result<(), TrustBenchError> {
        let mut body = String::from("pillar,id,reason,detail\n");
        for pillar in PillarName::DECLARATION_ORDER {
            if let Some(result) = results.get(&pillar) {
                for failure in &result.failures {
                    let detail = failure
                        .detail
                        .as_ref()
                        .map(|d| d.to_string())
                        .unwrap_or_default();
                    body.push_str(&format!(
                        "{},{},{},\"{}\"\n",
                        failure.pillar,
                        failure.id.replace(',', ";"),
                        failure.reason,
                        detail.replace('"', "''")
                    ));
                }
            }
        }

        let path = handle.dir.join("failures.csv");
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| TrustBenchError::Storage(format!("failed to create temp file: {e}")))?;
        tmp.write_all(body.as_bytes())
            .map_err(|e| TrustBenchError::Storage(format!("failed to write failures.csv: {e}")))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| TrustBenchError::Storage(format!("failed to fsync failures.csv: {e}")))?;
        tmp.persist(&path)
            .map_err(|e| TrustBenchError::Storage(format!("failed to persist failures.csv: {e}")))?;
        Ok(())
    }

    /// Point `latest` at `handle`'s run directory: build `latest.tmp` as a
    /// full copy, then atomically swap it in for `latest`.
    pub fn update_latest(&self, handle: &RunHandle) -> Result<(), TrustBenchError> {
        let tmp_dir = self.root.join("latest.tmp");
        let latest_dir = self.root.join("latest");

        if tmp_dir.exists() {
            std::fs::remove_dir_all(&tmp_dir)
                .map_err(|e| TrustBenchError::Storage(format!("failed to clear stale latest.tmp: {e}")))?;
        }
        copy_dir_recursive(&handle.dir, &tmp_dir)?;

        if latest_dir.exists() {
            std::fs::remove_dir_all(&latest_dir)
                .map_err(|e| TrustBenchError::Storage(format!("failed to remove previous latest: {e}")))?;
        }
        std::fs::rename(&tmp_dir, &latest_dir)
            .map_err(|e| TrustBenchError::Storage(format!("failed to swap in latest: {e}")))?;
        Ok(())
    }

    /// Promote `run_id` to the baseline: copy its directory to `baseline/`
    /// and write `baseline_meta.json` alongside it.
    pub fn promote_baseline(&self, run_id: &str, note: Option<String>) -> Result<(), TrustBenchError> {
        let source = self.run_dir(run_id);
        if !source.exists() {
            return Err(TrustBenchError::Storage(format!("run {run_id} does not exist")));
        }
        let baseline_dir = self.root.join("baseline");
        if baseline_dir.exists() {
            std::fs::remove_dir_all(&baseline_dir)
                .map_err(|e| TrustBenchError::Storage(format!("failed to remove previous baseline: {e}")))?;
        }
        copy_dir_recursive(&source, &baseline_dir)?;

        let meta = serde_json::json!({
            "promoted_at": chrono::Utc::now().to_rfc3339(),
            "note": note,
            "source_run": run_id,
        });
        self.write_atomic_json(&self.root.join("baseline_meta.json"), &meta)
    }
}

fn copy_dir_recursive(from: &Path, to: &Path) -> Result<(), TrustBenchError> {
    std::fs::create_dir_all(to)
        .map_err(|e| TrustBenchError::Storage(format!("failed to create {}: {e}", to.display())))?;
    for entry in std::fs::read_dir(from)
        .map_err(|e| TrustBenchError::Storage(format!("failed to read {}: {e}", from.display())))?
    {
        let entry = entry.map_err(|e| TrustBenchError::Storage(format!("failed to read dir entry: {e}")))?;
        let dest = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir_recursive(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)
                .map_err(|e| TrustBenchError::Storage(format!("failed to copy {}: {e}", entry.path().display())))?;
        }
    }
    Ok(())
}

/// Walk a JSON value collecting numeric leaves, bounded to 3 levels of
/// object nesting and 2 levels of array nesting (8 items per array), up to
/// `limit` total leaves. Mirrors `_collect_numeric`.
pub fn discover_metrics(value: &serde_json::Value, limit: usize) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    walk_metrics(value, String::new(), 0, limit, &mut metrics);
    metrics
}

fn walk_metrics(
    value: &serde_json::Value,
    prefix: String,
    depth: usize,
    limit: usize,
    out: &mut BTreeMap<String, f64>,
) {
    if out.len() >= limit {
        return;
    }
    match value {
        serde_json::Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                let label = if prefix.is_empty() { "value".to_string() } else { prefix };
                out.entry(label).or_insert(f);
            }
        }
        serde_json::Value::Object(map) if depth < 3 => {
            for (key, sub_value) in map {
                if out.len() >= limit {
                    return;
                }
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                walk_metrics(sub_value, new_prefix, depth + 1, limit, out);
            }
        }
        serde_json::Value::Array(items) if depth < 2 => {
            for (index, item) in items.iter().take(8).enumerate() {
                if out.len() >= limit {
                    return;
                }
                let new_prefix = if prefix.is_empty() {
                    index.to_string()
                } else {
                    format!("{prefix}[{index}]")
                };
                walk_metrics(item, new_prefix, depth + 1, limit, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sampling;

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
                faithfulness: 0.65,
                p95_latency: 10.0,
                injection_block_rate: 0.8,
                refusal_accuracy: 0.9,
                warn_threshold: 0.75,
            },
            sampling: Sampling { n: 1, seed: 1 },
        }
    }

    #[test]
    fn create_run_and_finalize_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path().join("runs")).unwrap();
        let handle = store.create_run().unwrap();

        let mut results = BTreeMap::new();
        results.insert(
            PillarName::Task,
            {
                let mut r = AgentResult::default();
                r.metrics.insert("faithfulness".to_string(), 0.9);
                r.metrics.insert("avg_latency".to_string(), 1.0);
                r.metrics.insert("samples".to_string(), 10.0);
                r
            },
        );
        results.insert(PillarName::System, AgentResult::default());
        results.insert(PillarName::Security, {
            let mut r = AgentResult::default();
            r.metrics.insert("injection_block_rate".to_string(), 1.0);
            r.metrics.insert("semgrep_findings".to_string(), 0.0);
            r.metrics.insert("secret_findings".to_string(), 0.0);
            r
        });
        results.insert(PillarName::Ethics, {
            let mut r = AgentResult::default();
            r.metrics.insert("refusal_accuracy".to_string(), 1.0);
            r
        });

        let verdict = crate::gate::synthesize(&profile().thresholds, &results);
        store.finalize_run(&handle, &profile(), &results, &verdict).unwrap();

        assert!(handle.dir.join("metrics.json").exists());
        assert!(handle.dir.join("gate.json").exists());
        assert!(handle.dir.join("verdict.json").exists());
        assert!(handle.dir.join("run.json").exists());
        assert!(!handle.dir.join("failures.csv").exists());
        assert!(handle.dir.join("report.md").exists());

        let metrics: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(handle.dir.join("metrics.json")).unwrap()).unwrap();
        assert_eq!(metrics["faithfulness"], 0.9);
        assert_eq!(metrics["secret_findings"], 0.0);

        let gate: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(handle.dir.join("gate.json")).unwrap()).unwrap();
        assert_eq!(gate["blocked"], false);
        assert_eq!(gate["failed"], serde_json::json!([]));

        store.update_latest(&handle).unwrap();
        assert!(dir.path().join("runs/latest/gate.json").exists());

        store.promote_baseline(&handle.run_id, Some("looks good".to_string())).unwrap();
        assert!(dir.path().join("runs/baseline_meta.json").exists());
    }

    #[test]
    fn discover_metrics_respects_depth_and_limit() {
        let value = serde_json::json!({
            "a": { "b": { "c": { "d": 1 } } },
            "list": [1, 2, 3]
        });
        let metrics = discover_metrics(&value, 32);
        assert!(!metrics.contains_key("a.b.c.d"));
        assert!(metrics.contains_key("list[0]"));
    }
}
