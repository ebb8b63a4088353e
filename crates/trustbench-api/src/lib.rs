//! Job manager and HTTP API: turns a repository URL into a queued,
//! pollable evaluation job backed by `trustbench-core`'s orchestrator.

pub mod errors;
pub mod job_manager;
pub mod jobs;
pub mod routes;
pub mod server;
pub mod state;
pub mod types;

pub use state::AppState;
