//! Evaluator agents: the four pillars (`task_fidelity`, `system_perf`,
//! `security_eval`, `ethics_refusal`), each a plain async function with the
//! contract `run(profile, ...) -> Result<AgentResult, TrustBenchError>`.
//! No panics: every failure mode recognized by the source agents becomes a
//! structured [`crate::model::Failure`] or a propagated [`TrustBenchError`].

pub mod ethics_refusal;
pub mod security_eval;
pub mod system_perf;
pub mod task_fidelity;

use crate::errors::TrustBenchError;
use crate::model::DatasetRecord;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

/// Load newline-delimited JSON records, accepting `input` as an alias for
/// `question` (the shape the recovered datasets use interchangeably).
pub(crate) fn load_jsonl_dataset(path: &Path) -> Result<Vec<DatasetRecord>, TrustBenchError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| TrustBenchError::Config(format!("failed to read dataset {}: {e}", path.display())))?;

    let mut records = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
            TrustBenchError::Config(format!(
                "{}: malformed JSON on line {}: {e}",
                path.display(),
                lineno + 1
            ))
        })?;
        let id = value
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| lineno.to_string());
        let question = value
            .get("question")
            .or_else(|| value.get("input"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let truth = value
            .get("truth")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        records.push(DatasetRecord { id, question, truth });
    }

    if records.is_empty() {
        return Err(TrustBenchError::Config(format!(
            "dataset at {} is empty",
            path.display()
        )));
    }
    Ok(records)
}

/// Load newline-delimited prompt strings, one per line, skipping blanks.
pub(crate) fn load_prompt_lines(path: &Path) -> Result<Vec<String>, TrustBenchError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| TrustBenchError::Config(format!("failed to read prompts {}: {e}", path.display())))?;
    let lines: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        return Err(TrustBenchError::Config(format!(
            "prompt file at {} is empty",
            path.display()
        )));
    }
    Ok(lines)
}

/// Deterministically sample up to `n` records from `records` using `seed`,
/// returning all of them unshuffled when `n >= records.len()`.
pub(crate) fn sample_records(records: &[DatasetRecord], n: usize, seed: u64) -> Vec<DatasetRecord> {
    if n >= records.len() {
        return records.to_vec();
    }
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    records
        .choose_multiple(&mut rng, n)
        .cloned()
        .collect()
}
