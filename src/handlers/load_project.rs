use crate::{models::{LoadProjectResponse, ProjectQuery}, services::{auth_service::Principal, AppState}};
use axum::{extract::{Extension, Query, State}, Json};
use std::sync::Arc;
use tracing::{debug, error};

/// Open a project: return its content and join its edit lock
pub async fn load_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ProjectQuery>,
) -> Json<LoadProjectResponse> {

    let content = match state.store.read(&query.project_name).await {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to load project '{}' for {}: {}", query.project_name, principal.username, e);
            return Json(LoadProjectResponse::failure(e.to_string()));
        }
    };

    let project = query.project_name.trim();
    let has_rights = state.can_edit(project, &principal).await;
    let decision = state.locks
        .join(project, &principal.username, has_rights)
        .await;
    debug!("{} opened '{}': {:?}", principal.username, project, decision);

    Json(LoadProjectResponse {
        success: true,
        error: None,
        content,
        access: decision.into(),
    })
}
