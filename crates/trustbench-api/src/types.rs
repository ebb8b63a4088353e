//! Request/response bodies for the HTTP API.

use crate::jobs::JobStatus;
use serde::{Deserialize, Serialize};

/// `POST /analyze` body.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequestBody {
    /// Repository to stage and evaluate.
    pub repo_url: String,
    /// Path to the evaluation profile to run against the staged repo.
    pub profile_path: String,
    /// Optional free-form metadata carried alongside the job.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Envelope shared by `POST /analyze` and `GET /{id}/status`.
#[derive(Debug, Serialize)]
pub struct JobEnvelope {
    pub job: JobStatus,
}

/// `POST /baseline/promote` body. `run_id` defaults to `latest` when omitted.
#[derive(Debug, Deserialize)]
pub struct PromoteBaselineRequestBody {
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// `POST /baseline/promote` response.
#[derive(Debug, Serialize)]
pub struct PromoteBaselineResponse {
    pub promoted: bool,
    pub run_id: String,
}
