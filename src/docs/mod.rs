use utoipa::OpenApi;
use crate::models::*;
use crate::services::auth_service::Role;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Open a project and join its edit lock
#[utoipa::path(
    get,
    path = "/load_project",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Project content and edit access", body = LoadProjectResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn load_project_doc() {}

/// Read the current project content without touching the edit lock
#[utoipa::path(
    get,
    path = "/get_project_content",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Project content", body = ProjectContentResponse)
    )
)]
#[allow(dead_code)]
pub async fn project_content_doc() {}

/// Poll edit access and keep the caller's place
#[utoipa::path(
    post,
    path = "/heartbeat",
    request_body(content = ProjectForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Current edit access", body = HeartbeatResponse)
    )
)]
#[allow(dead_code)]
pub async fn heartbeat_doc() {}

/// Store one chunk of a project save
#[utoipa::path(
    post,
    path = "/save_project",
    request_body(content = SaveProjectForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Chunk acknowledgement", body = SaveProjectResponse)
    )
)]
#[allow(dead_code)]
pub async fn save_project_doc() {}

/// Create an empty project
#[utoipa::path(
    post,
    path = "/create_project",
    request_body(content = ProjectForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Created project name", body = CreateProjectResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_project_doc() {}

/// Rename a project
#[utoipa::path(
    post,
    path = "/rename_project",
    request_body(content = RenameProjectForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "New project name", body = RenameProjectResponse)
    )
)]
#[allow(dead_code)]
pub async fn rename_project_doc() {}

/// Delete a project (admins only)
#[utoipa::path(
    post,
    path = "/delete_project",
    request_body(content = ProjectForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Deletion result", body = ActionResponse)
    )
)]
#[allow(dead_code)]
pub async fn delete_project_doc() {}

/// Add or remove a favorite project
#[utoipa::path(
    post,
    path = "/favorite_project",
    request_body(content = FavoriteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Favorites after the change", body = FavoritesResponse)
    )
)]
#[allow(dead_code)]
pub async fn favorite_project_doc() {}

/// List favorite projects
#[utoipa::path(
    get,
    path = "/load_favorites",
    responses(
        (status = 200, description = "Favorite project names", body = FavoritesResponse)
    )
)]
#[allow(dead_code)]
pub async fn load_favorites_doc() {}

/// Search the projects visible to the caller
#[utoipa::path(
    get,
    path = "/search_projects",
    params(SearchQuery),
    responses(
        (status = 200, description = "One page of project names", body = SearchProjectsResponse)
    )
)]
#[allow(dead_code)]
pub async fn search_projects_doc() {}

/// Visibility rules of a project
#[utoipa::path(
    get,
    path = "/visibility",
    params(VisibilityQuery),
    responses(
        (status = 200, description = "Visibility records", body = VisibilityResponse)
    )
)]
#[allow(dead_code)]
pub async fn list_visibility_doc() {}

/// Add a visibility record
#[utoipa::path(
    post,
    path = "/visibility",
    request_body(content = VisibilityForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Change result", body = ActionResponse)
    )
)]
#[allow(dead_code)]
pub async fn add_visibility_doc() {}

/// Remove a visibility record
#[utoipa::path(
    delete,
    path = "/visibility",
    request_body(content = VisibilityForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Change result", body = ActionResponse)
    )
)]
#[allow(dead_code)]
pub async fn remove_visibility_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        load_project_doc,
        project_content_doc,
        heartbeat_doc,
        save_project_doc,
        create_project_doc,
        rename_project_doc,
        delete_project_doc,
        favorite_project_doc,
        load_favorites_doc,
        search_projects_doc,
        list_visibility_doc,
        add_visibility_doc,
        remove_visibility_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            AccessFields,
            LoadProjectResponse,
            ProjectContentResponse,
            HeartbeatResponse,
            ProjectForm,
            SaveProjectForm,
            SaveProjectResponse,
            CreateProjectResponse,
            RenameProjectForm,
            RenameProjectResponse,
            ActionResponse,
            FavoriteAction,
            FavoriteForm,
            FavoritesResponse,
            SearchProjectsResponse,
            Role,
            VisibilityRule,
            VisibilityForm,
            VisibilityResponse,
        )
    ),
    tags(
        (name = "workshop", description = "Project editing endpoints")
    )
)]
pub struct ApiDoc;
