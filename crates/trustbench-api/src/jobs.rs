//! Disk-backed job metadata tracking for repository analyses. Grounded on
//! the recovered `trust_bench_studio/services/job_store.py`: a mutex-guarded
//! in-memory cache, hydrated from `{root}/{id}/status.json` on startup, with
//! a disk refresh on every read so a second process's writes are visible.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// High-level job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Cloning,
    Analyzing,
    Evaluating,
    Reporting,
    Complete,
    Failed,
}

/// Granular stage used for progress displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Init,
    Cloning,
    Analysis,
    Evaluation,
    Reporting,
    Complete,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn clamp_progress(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Normalized snapshot of repository analysis work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: String,
    pub repo_url: String,
    pub state: JobState,
    pub stage: JobStage,
    pub progress: f64,
    pub message: String,
    pub profile: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub error: Option<String>,
    #[serde(default)]
    pub artifacts: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl JobStatus {
    fn new(id: String, repo_url: String, profile: Option<String>, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        let created_at = now();
        Self {
            id,
            repo_url,
            state: JobState::Queued,
            stage: JobStage::Init,
            progress: 0.0,
            message: String::new(),
            profile,
            created_at: created_at.clone(),
            updated_at: created_at,
            error: None,
            artifacts: serde_json::Map::new(),
            metadata,
        }
    }
}

/// Fields that may be changed by [`JobStore::update_job`]; `None` leaves the
/// field untouched.
#[derive(Debug, Default)]
pub struct JobUpdate {
    pub state: Option<JobState>,
    pub stage: Option<JobStage>,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub artifacts: Option<serde_json::Map<String, serde_json::Value>>,
    pub metadata_update: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Error returned when a job id is unknown to the store.
#[derive(Debug, thiserror::Error)]
#[error("unknown job id '{0}'")]
pub struct UnknownJob(pub String);

/// Read/write interface for job metadata stored on disk.
pub struct JobStore {
    root: PathBuf,
    jobs: Mutex<HashMap<String, JobStatus>>,
}

const STATUS_FILENAME: &str = "status.json";

impl JobStore {
    /// Open (creating if necessary) a job store rooted at `root`, hydrating
    /// any jobs already persisted on disk.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let store = Self {
            root,
            jobs: Mutex::new(HashMap::new()),
        };
        store.hydrate_existing();
        Ok(store)
    }

    fn hydrate_existing(&self) {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return;
        };
        let mut jobs = self.jobs.lock().unwrap();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(job) = read_status(&entry.path()) {
                jobs.insert(job.id.clone(), job);
            }
        }
    }

    /// Create a new job and persist its initial status immediately.
    pub fn create_job(
        &self,
        repo_url: String,
        profile: Option<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> std::io::Result<JobStatus> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let job = JobStatus::new(id.clone(), repo_url, profile, metadata);
        self.persist(&job)?;
        self.jobs.lock().unwrap().insert(id, job.clone());
        Ok(job)
    }

    /// Fetch a job, refreshing from disk first in case another process
    /// updated it.
    pub fn get_job(&self, job_id: &str) -> Option<JobStatus> {
        self.refresh_job_from_disk(job_id);
        self.jobs.lock().unwrap().get(job_id).cloned()
    }

    /// List all known jobs.
    pub fn list_jobs(&self) -> Vec<JobStatus> {
        self.jobs.lock().unwrap().values().cloned().collect()
    }

    /// Apply `update` to `job_id`, persisting the result.
    pub fn update_job(&self, job_id: &str, update: JobUpdate) -> Result<JobStatus, UnknownJob> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(job_id).ok_or_else(|| UnknownJob(job_id.to_string()))?;

        if let Some(state) = update.state {
            job.state = state;
        }
        if let Some(stage) = update.stage {
            job.stage = stage;
        }
        if let Some(progress) = update.progress {
            job.progress = clamp_progress(progress);
        }
        if let Some(message) = update.message {
            job.message = message;
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }
        if let Some(artifacts) = update.artifacts {
            job.artifacts.extend(artifacts);
        }
        if let Some(metadata_update) = update.metadata_update {
            job.metadata.extend(metadata_update);
        }

        if matches!(job.state, JobState::Complete | JobState::Failed) {
            job.stage = JobStage::Complete;
            if matches!(job.state, JobState::Complete) {
                job.progress = 1.0;
            }
        }
        job.updated_at = now();

        let snapshot = job.clone();
        drop(jobs);
        let _ = self.persist(&snapshot);
        Ok(snapshot)
    }

    fn refresh_job_from_disk(&self, job_id: &str) {
        let status_path = self.root.join(job_id).join(STATUS_FILENAME);
        if let Some(job) = read_status_file(&status_path) {
            self.jobs.lock().unwrap().insert(job.id.clone(), job);
        }
    }

    fn persist(&self, job: &JobStatus) -> std::io::Result<()> {
        let job_dir = self.root.join(&job.id);
        std::fs::create_dir_all(&job_dir)?;
        let status_path = job_dir.join(STATUS_FILENAME);
        let body = serde_json::to_string_pretty(job)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&job_dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&status_path)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Ok(())
    }
}

fn read_status(job_dir: &Path) -> Option<JobStatus> {
    read_status_file(&job_dir.join(STATUS_FILENAME))
}

fn read_status_file(status_path: &Path) -> Option<JobStatus> {
    let data = std::fs::read_to_string(status_path).ok()?;
    serde_json::from_str(&data).ok()
}
