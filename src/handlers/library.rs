use crate::{
    models::{
        ActionResponse, FavoriteAction, FavoriteForm, FavoritesResponse, ProjectForm, RenameProjectForm,
        RenameProjectResponse, SearchProjectsResponse, SearchQuery,
    },
    services::{auth_service::Principal, visibility::can_see_project, AppState},
};
use axum::{extract::{Extension, Query, State}, Form, Json};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Rename a project. The edit lock and favorites follow the new name.
pub async fn rename_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<RenameProjectForm>,
) -> Json<RenameProjectResponse> {

    let old_name = form.old_name.trim();
    let allowed = principal.can_edit_projects()
        && (old_name.is_empty() || state.can_edit(old_name, &principal).await);
    if !allowed {
        return Json(RenameProjectResponse {
            success: false,
            error: Some("You do not have permission to modify this project".to_string()),
            new_name: None,
        });
    }

    match state.store.rename(&form.old_name, &form.new_name).await {
        Ok(new_name) => {
            state.locks.rename(old_name, &new_name).await;
            info!("{} renamed '{}' to '{}'", principal.username, old_name, new_name);
            Json(RenameProjectResponse {
                success: true,
                error: None,
                new_name: Some(new_name),
            })
        }
        Err(e) => {
            warn!("{} failed to rename '{}': {}", principal.username, form.old_name, e);
            Json(RenameProjectResponse {
                success: false,
                error: Some(e.to_string()),
                new_name: None,
            })
        }
    }
}

/// Delete a project for good. Admins only.
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<ProjectForm>,
) -> Json<ActionResponse> {

    if !principal.is_admin() {
        warn!("{} tried to delete '{}'", principal.username, form.project_name);
        return Json(ActionResponse::failure("Access denied"));
    }

    let project = form.project_name.trim();
    if project.is_empty() {
        return Json(ActionResponse::failure("Project name required"));
    }

    match state.store.delete(project).await {
        Ok(()) => {
            state.locks.forget(project).await;
            info!("{} deleted '{}'", principal.username, project);
            Json(ActionResponse::ok(format!("Project '{}' deleted", project)))
        }
        Err(e) => {
            warn!("Failed to delete '{}': {}", project, e);
            Json(ActionResponse::failure(e.to_string()))
        }
    }
}

/// Add a project to the shared favorites or remove it
pub async fn favorite_project(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<FavoriteForm>,
) -> Json<FavoritesResponse> {

    if !principal.can_edit_projects() {
        return Json(FavoritesResponse::failure("You do not have permission to change favorites"));
    }

    let action = match form.action.as_deref() {
        Some("add") => FavoriteAction::Add,
        Some("remove") => FavoriteAction::Remove,
        _ => return Json(FavoritesResponse::failure("Invalid parameters")),
    };
    if form.project_name.trim().is_empty() {
        return Json(FavoritesResponse::failure("Invalid parameters"));
    }

    match state.store.set_favorite(&form.project_name, action).await {
        Ok(favorites) => Json(FavoritesResponse { success: true, error: None, favorites }),
        Err(e) => {
            warn!("Failed to {} favorite '{}': {}", action.as_str(), form.project_name, e);
            Json(FavoritesResponse::failure(e.to_string()))
        }
    }
}

pub async fn load_favorites(State(state): State<Arc<AppState>>) -> Json<FavoritesResponse> {
    match state.store.favorites().await {
        Ok(favorites) => Json(FavoritesResponse { success: true, error: None, favorites }),
        Err(e) => {
            warn!("Failed to read favorites: {}", e);
            Json(FavoritesResponse::failure(e.to_string()))
        }
    }
}

/// Page through the projects the caller may see, filtered by a name substring
pub async fn search_projects(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchProjectsResponse> {

    let names = match state.store.list().await {
        Ok(names) => names,
        Err(e) => {
            warn!("Failed to list projects: {}", e);
            return Json(SearchProjectsResponse {
                success: false,
                error: Some(e.to_string()),
                projects: Vec::new(),
            });
        }
    };

    let needle = query.query.trim().to_lowercase();
    let mut visible = Vec::new();
    for name in names.into_iter().filter(|n| n.to_lowercase().contains(&needle)) {
        match state.store.visibility(&name).await {
            Ok(rules) if can_see_project(&principal, &rules) => visible.push(name),
            Ok(_) => {}
            Err(e) => warn!("Skipping '{}' in search: {}", name, e),
        }
    }

    let projects = visible
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
        .collect();
    Json(SearchProjectsResponse { success: true, error: None, projects })
}
