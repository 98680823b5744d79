use axum::{extract::State, Json};
use crate::{models::HealthResponse, services::AppState};
use std::sync::Arc;
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        locked_projects: None,
    })
}

/// Readiness check endpoint: the projects directory must be reachable
pub async fn ready_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    let locked_projects = Some(state.locks.locked_projects().await);
    match tokio::fs::metadata(state.store.root()).await {
        Ok(meta) if meta.is_dir() => Json(HealthResponse {
            status: "ok".to_string(),
            message: "Service is ready".to_string(),
            locked_projects,
        }),
        _ => Json(HealthResponse {
            status: "unavailable".to_string(),
            message: format!("Projects directory {} is not available", state.store.root().display()),
            locked_projects,
        }),
    }
}
