use crate::{models::{HeartbeatResponse, ProjectForm}, services::{auth_service::Principal, AppState}};
use axum::{extract::{Extension, State}, Form, Json};
use std::sync::Arc;
use tracing::debug;

/// Keep the caller's place as editor or waiter, and report its current access
pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<ProjectForm>,
) -> Json<HeartbeatResponse> {

    let project = form.project_name.trim();
    if project.is_empty() {
        return Json(HeartbeatResponse::failure("Project name required"));
    }

    let has_rights = state.can_edit(project, &principal).await;
    match state.locks.heartbeat(project, &principal.username, has_rights).await {
        Some(decision) => Json(HeartbeatResponse {
            success: true,
            error: None,
            access: decision.into(),
        }),
        None => {
            debug!("Heartbeat from {} for unopened project '{}'", principal.username, project);
            Json(HeartbeatResponse::failure("Project not loaded"))
        }
    }
}
