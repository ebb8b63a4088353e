//! Route handlers. Grounded on
//! `ThirdKeyAI-Symbiont::crates::runtime::src::api::routes.rs`'s
//! `State<Arc<...>>` extractor + `Result<Json<T>, (StatusCode, Json<ErrorResponse>)>`
//! handler shape.

use crate::errors::ErrorResponse;
use crate::job_manager::AnalyzeRequest;
use crate::state::AppState;
use crate::types::{AnalyzeRequestBody, JobEnvelope, PromoteBaselineRequestBody, PromoteBaselineResponse};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use std::sync::Arc;
use trustbench_core::manifest;

type ApiError = (StatusCode, Json<ErrorResponse>);

const GITHUB_URL_PREFIX: &str = "https://github.com/";

fn internal(code: &str, error: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(code, error)))
}

/// `POST /analyze`: queue a repository for cloning and evaluation.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequestBody>,
) -> Result<Json<JobEnvelope>, ApiError> {
    if !request.repo_url.starts_with(GITHUB_URL_PREFIX) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "INVALID_URL",
                format!("repo_url must begin with '{GITHUB_URL_PREFIX}'"),
            )),
        ));
    }

    let job = state
        .job_store
        .create_job(request.repo_url.clone(), Some(request.profile_path.clone()), request.metadata)
        .map_err(|e| internal("JOB_CREATE_FAILED", e))?;

    let enqueued = state.job_manager.enqueue(AnalyzeRequest {
        job_id: job.id.clone(),
        repo_url: request.repo_url,
        profile_path: request.profile_path.into(),
    });
    if enqueued.is_err() {
        return Err(internal("JOB_QUEUE_CLOSED", "job worker is no longer accepting work"));
    }

    Ok(Json(JobEnvelope { job }))
}

/// `GET /{id}/status`: fetch a job's current lifecycle state.
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobEnvelope>, ApiError> {
    match state.job_store.get_job(&job_id) {
        Some(job) => Ok(Json(JobEnvelope { job })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("JOB_NOT_FOUND", format!("no job with id '{job_id}'"))),
        )),
    }
}

/// `GET /verdict`: the latest run's full verdict, or `{decision: "unknown"}`
/// when no run has completed yet.
pub async fn verdict(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let path = state.run_store.run_dir("latest").join("verdict.json");
    let value = std::fs::read_to_string(&path)
        .ok()
        .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
        .unwrap_or_else(|| serde_json::json!({ "decision": "unknown" }));
    Json(serde_json::json!({ "verdict": value }))
}

/// `GET /run/latest`: the most recently completed run's manifest, artifact
/// directory, and flattened metrics summary.
pub async fn run_latest(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let dir = state.run_store.run_dir("latest");
    let run_body = std::fs::read_to_string(dir.join("run.json")).map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("RUN_NOT_FOUND", "no completed run yet")),
        )
    })?;
    let run: serde_json::Value = serde_json::from_str(&run_body).map_err(|e| internal("RUN_ARTIFACT_CORRUPT", e))?;

    // Missing metrics.json degrades to an empty summary rather than raising.
    let summary = std::fs::read_to_string(dir.join("metrics.json"))
        .ok()
        .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
        .unwrap_or_else(|| serde_json::json!({}));

    Ok(Json(serde_json::json!({
        "run": run,
        "path": dir.display().to_string(),
        "summary": summary,
    })))
}

/// `GET /agents`: the Athena/Helios/Aegis/Eidos identity manifest.
pub async fn agents() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "agents": manifest::manifest() }))
}

/// `POST /baseline/promote`: promote the `latest` run to the baseline.
pub async fn promote_baseline(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PromoteBaselineRequestBody>,
) -> Result<Json<PromoteBaselineResponse>, ApiError> {
    let run_id = request.run_id.unwrap_or_else(|| "latest".to_string());
    state
        .run_store
        .promote_baseline(&run_id, request.note)
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("BASELINE_PROMOTE_FAILED", e)),
            )
        })?;

    Ok(Json(PromoteBaselineResponse {
        promoted: true,
        run_id,
    }))
}

/// `GET /healthz`: liveness probe.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
