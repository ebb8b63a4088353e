//! Axum router assembly and server bootstrap.

use crate::routes;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/analyze", post(routes::analyze))
        .route("/:id/status", get(routes::job_status))
        .route("/verdict", get(routes::verdict))
        .route("/run/latest", get(routes::run_latest))
        .route("/agents", get(routes::agents))
        .route("/baseline/promote", post(routes::promote_baseline))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve the router at `addr`, running until the process is killed.
pub async fn serve(state: Arc<AppState>, addr: std::net::SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "trustbench-api listening");
    axum::serve(listener, app).await
}
