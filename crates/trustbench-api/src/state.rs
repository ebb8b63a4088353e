//! Shared state handed to every axum handler via `State<Arc<AppState>>`.

use crate::job_manager::JobManager;
use crate::jobs::JobStore;
use std::sync::Arc;
use trustbench_core::config::EnvConfig;
use trustbench_core::store::RunStore;

/// Everything a route handler needs to serve a request.
pub struct AppState {
    pub job_store: Arc<JobStore>,
    pub run_store: Arc<RunStore>,
    pub job_manager: JobManager,
    pub env: Arc<EnvConfig>,
}

impl AppState {
    /// Build the application state, spawning the background job worker.
    pub fn new(env: EnvConfig) -> std::io::Result<Self> {
        let env = Arc::new(env);
        let job_store = Arc::new(JobStore::new(&env.jobs_root)?);
        let run_store = Arc::new(
            RunStore::new(&env.runs_root)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?,
        );
        let job_manager = JobManager::spawn(Arc::clone(&job_store), Arc::clone(&run_store), Arc::clone(&env));
        Ok(Self {
            job_store,
            run_store,
            job_manager,
            env,
        })
    }
}
