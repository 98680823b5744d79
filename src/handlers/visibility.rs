use crate::{
    models::{ActionResponse, VisibilityForm, VisibilityQuery, VisibilityResponse, VisibilityRule},
    services::{auth_service::{Principal, Role}, AppState},
};
use axum::{extract::{Extension, Query, State}, Form, Json};
use std::sync::Arc;
use tracing::{info, warn};

/// Visibility rules of a project
pub async fn list_visibility(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<VisibilityQuery>,
) -> Json<VisibilityResponse> {

    if !principal.can_edit_projects() {
        return Json(VisibilityResponse {
            success: false,
            error: Some("Access denied".to_string()),
            visibilities: Vec::new(),
        });
    }

    match state.store.visibility(&query.project_name).await {
        Ok(visibilities) => Json(VisibilityResponse { success: true, error: None, visibilities }),
        Err(e) => Json(VisibilityResponse {
            success: false,
            error: Some(e.to_string()),
            visibilities: Vec::new(),
        }),
    }
}

/// Grant a user access, or set the role-wide visibility when no user is given
pub async fn add_visibility(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<VisibilityForm>,
) -> Json<ActionResponse> {

    let rule = match authorize_change(&state, &principal, &form).await {
        Ok(rule) => rule,
        Err(denied) => return Json(denied),
    };

    match state.store.add_visibility(&form.project_name, rule.clone()).await {
        Ok(()) => {
            info!("{} set visibility of '{}': {:?}", principal.username, form.project_name.trim(), rule);
            Json(ActionResponse::ok("Access assigned"))
        }
        Err(e) => {
            warn!("Failed to add visibility to '{}': {}", form.project_name, e);
            Json(ActionResponse::failure(e.to_string()))
        }
    }
}

/// Remove exactly one visibility record
pub async fn remove_visibility(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<VisibilityForm>,
) -> Json<ActionResponse> {

    let rule = match authorize_change(&state, &principal, &form).await {
        Ok(rule) => rule,
        Err(denied) => return Json(denied),
    };

    match state.store.remove_visibility(&form.project_name, &rule).await {
        Ok(()) => {
            info!("{} removed visibility {:?} from '{}'", principal.username, rule, form.project_name.trim());
            Json(ActionResponse::ok("Access removed"))
        }
        Err(e) => Json(ActionResponse::failure(e.to_string())),
    }
}

// Only callers with edit rights on the project may change who else has them
async fn authorize_change(
    state: &AppState,
    principal: &Principal,
    form: &VisibilityForm,
) -> Result<VisibilityRule, ActionResponse> {
    let project = form.project_name.trim();
    if project.is_empty() {
        return Err(ActionResponse::failure("Project name required"));
    }
    if !principal.can_edit_projects() || !state.can_edit(project, principal).await {
        return Err(ActionResponse::failure("Access denied"));
    }
    let Some(role) = Role::parse(form.role.trim()) else {
        return Err(ActionResponse::failure("Invalid role"));
    };
    Ok(match form.user.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(user) => VisibilityRule::for_user(role, user),
        None => VisibilityRule::for_role(role),
    })
}
