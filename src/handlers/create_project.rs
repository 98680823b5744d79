use crate::{models::{CreateProjectResponse, ProjectForm}, services::{auth_service::Principal, AppState}};
use axum::{extract::{Extension, State}, Form, Json};
use std::sync::Arc;
use tracing::warn;

/// Create an empty project. Viewers may not create projects.
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<ProjectForm>,
) -> Json<CreateProjectResponse> {

    if !principal.can_edit_projects() {
        return Json(CreateProjectResponse {
            success: false,
            error: Some("You do not have permission to create projects".to_string()),
            project: None,
        });
    }

    match state.store.create(&form.project_name).await {
        Ok(project) => Json(CreateProjectResponse {
            success: true,
            error: None,
            project: Some(project),
        }),
        Err(e) => {
            warn!("{} failed to create project '{}': {}", principal.username, form.project_name, e);
            Json(CreateProjectResponse {
                success: false,
                error: Some(e.to_string()),
                project: None,
            })
        }
    }
}
