use crate::{models::{SaveProjectForm, SaveProjectResponse}, services::{auth_service::Principal, project_store::ChunkProgress, AppState}};
use axum::{extract::{Extension, State}, Form, Json};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Store one chunk of a project save. Only the current editor may write.
pub async fn save_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<SaveProjectForm>,
) -> Json<SaveProjectResponse> {

    let project = form.project_name.trim();
    if project.is_empty() {
        return Json(SaveProjectResponse::failure("Project name required"));
    }

    // Missing numbers mean a single-chunk save
    let chunk_number = form.chunk_number.unwrap_or(1);
    let total_chunks = form.total_chunks.unwrap_or(1);

    if !state.can_edit(project, &principal).await {
        warn!("{} tried to save '{}' without edit rights", principal.username, project);
        return Json(SaveProjectResponse::failure("You do not have permission to modify this project"));
    }

    if !state.locks.authorize_save(project, &principal.username).await {
        warn!("{} tried to save '{}' without holding the edit lock", principal.username, project);
        return Json(SaveProjectResponse::failure("Someone else is working on the project!"));
    }

    match state.store.write_chunk(project, &principal.username, chunk_number, total_chunks, &form.content).await {
        Ok(ChunkProgress::Partial { received, total }) => {
            debug!("Chunk {}/{} of '{}' stored", received, total, project);
            Json(SaveProjectResponse::ok())
        }
        Ok(ChunkProgress::Complete) => Json(SaveProjectResponse::ok()),
        Err(e) => {
            error!("Failed to save chunk {}/{} of '{}': {}", chunk_number, total_chunks, project, e);
            Json(SaveProjectResponse::failure(e.to_string()))
        }
    }
}
