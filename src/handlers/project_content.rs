use crate::{models::{ProjectContentResponse, ProjectQuery}, services::AppState};
use axum::{extract::{Query, State}, Json};
use std::sync::Arc;
use tracing::warn;

/// Current content of a project, without touching the edit lock
pub async fn project_content(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectQuery>,
) -> Json<ProjectContentResponse> {
    match state.store.read(&query.project_name).await {
        Ok(content) => Json(ProjectContentResponse {
            success: true,
            error: None,
            content,
        }),
        Err(e) => {
            warn!("Failed to read project '{}': {}", query.project_name, e);
            Json(ProjectContentResponse::failure(e.to_string()))
        }
    }
}
