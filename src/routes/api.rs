use crate::{handlers::*, routes::auth_middleware::auth_middleware, services::AppState};
use axum::{routing::{get, post}, Router, middleware};
use std::sync::Arc;

/// Routes of the editing protocol. All of them require an authenticated caller.
pub fn create_project_routes(state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/load_project", get(load_project))
        .route("/get_project_content", get(project_content))
        .route("/heartbeat", post(heartbeat))
        .route("/save_project", post(save_project))
        .route("/create_project", post(create_project))
        .route("/rename_project", post(rename_project))
        .route("/delete_project", post(delete_project))
        .route("/favorite_project", post(favorite_project))
        .route("/load_favorites", get(load_favorites))
        .route("/search_projects", get(search_projects))
        .route("/visibility", get(list_visibility).post(add_visibility).delete(remove_visibility))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)) // Applies to all routes added above
        .with_state(state)
}

/// Unauthenticated service routes, mounted under `/api`
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .with_state(state)
}

/// Full application router
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(create_project_routes(state.clone()))
        .nest("/api", create_api_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::auth_service::{mint_token, Role};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    const SECRET: &str = "router-secret";

    fn app(dir: &tempfile::TempDir) -> Router {
        let config = Config {
            projects_dir: dir.path().to_string_lossy().into_owned(),
            auth_jwt_secret: Some(SECRET.to_string()),
            ..Config::default()
        };
        create_app(AppState::from_config(&config))
    }

    fn bearer(user: &str, role: Role) -> String {
        let token = mint_token(SECRET, user, role, chrono::Duration::minutes(5)).unwrap();
        format!("Bearer {}", token)
    }

    fn get(uri: &str, auth: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .unwrap()
    }

    fn post_form(uri: &str, auth: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn delete_form(uri: &str, auth: &str, body: &str) -> Request<Body> {
        Request::delete(uri)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn project_routes_require_a_valid_token() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);

        let req = Request::get("/load_project?project_name=Notes").body(Body::empty()).unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);

        let (status, _) = call(&app, get("/load_project?project_name=Notes", "Bearer nonsense")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::get("/api/health").body(Body::empty()).unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn second_user_queues_and_cannot_save() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let alice = bearer("alice", Role::User);
        let bob = bearer("bob", Role::User);

        let (_, body) = call(&app, post_form("/create_project", &alice, "project_name=Notes")).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["project"], "Notes");

        let (_, body) = call(&app, get("/load_project?project_name=Notes", &alice)).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["can_edit"], true);

        let (_, body) = call(&app, get("/load_project?project_name=Notes", &bob)).await;
        assert_eq!(body["can_edit"], false);
        assert_eq!(body["in_queue"], true);
        assert_eq!(body["notify"], true);
        assert_eq!(body["editor"], "alice");

        let (_, body) = call(&app, post_form("/save_project", &bob, "project_name=Notes&content=hijack")).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Someone else is working on the project!");

        let (_, body) = call(&app, post_form("/heartbeat", &bob, "project_name=Notes")).await;
        assert_eq!(body["in_queue"], true);
        assert_eq!(body["notify"], false);
    }

    #[tokio::test]
    async fn editor_saves_in_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let alice = bearer("alice", Role::Admin);

        call(&app, post_form("/create_project", &alice, "project_name=Notes")).await;
        call(&app, get("/load_project?project_name=Notes", &alice)).await;

        let (_, body) = call(&app, post_form("/save_project", &alice, "project_name=Notes&content=Hello%2C+&chunk_number=1&total_chunks=2")).await;
        assert_eq!(body["success"], true);
        let (_, body) = call(&app, post_form("/save_project", &alice, "project_name=Notes&content=world&chunk_number=2&total_chunks=2")).await;
        assert_eq!(body["success"], true);

        let (_, body) = call(&app, get("/get_project_content?project_name=Notes", &alice)).await;
        assert_eq!(body["content"], "Hello, world");
    }

    #[tokio::test]
    async fn viewer_reads_but_never_edits() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let alice = bearer("alice", Role::User);
        let vera = bearer("vera", Role::Viewer);

        call(&app, post_form("/create_project", &alice, "project_name=Notes")).await;

        let (_, body) = call(&app, post_form("/create_project", &vera, "project_name=Other")).await;
        assert_eq!(body["success"], false);

        let (_, body) = call(&app, get("/load_project?project_name=Notes", &vera)).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["can_edit"], false);
        assert_eq!(body["in_queue"], false);

        let (_, body) = call(&app, get("/load_project?project_name=Missing", &alice)).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Project not found");
    }

    #[tokio::test]
    async fn admin_rule_locks_users_out_of_editing() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let root = bearer("root", Role::Admin);
        let alice = bearer("alice", Role::User);

        call(&app, post_form("/create_project", &root, "project_name=Board")).await;
        let (_, body) = call(&app, post_form("/visibility", &root, "project_name=Board&role=admin")).await;
        assert_eq!(body["success"], true);

        let (_, body) = call(&app, get("/load_project?project_name=Board", &alice)).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["can_edit"], false);
        assert_eq!(body["in_queue"], false);

        let (_, body) = call(&app, post_form("/heartbeat", &alice, "project_name=Board")).await;
        assert_eq!(body["success"], false);

        let (_, body) = call(&app, post_form("/save_project", &alice, "project_name=Board&content=x")).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "You do not have permission to modify this project");

        // users locked out cannot lift the rule themselves
        let (_, body) = call(&app, delete_form("/visibility", &alice, "project_name=Board&role=admin")).await;
        assert_eq!(body["error"], "Access denied");

        let (_, body) = call(&app, get("/search_projects", &alice)).await;
        assert_eq!(body["projects"], serde_json::json!([]));

        let (_, body) = call(&app, delete_form("/visibility", &root, "project_name=Board&role=admin")).await;
        assert_eq!(body["success"], true);
        let (_, body) = call(&app, get("/load_project?project_name=Board", &alice)).await;
        assert_eq!(body["can_edit"], true);
    }

    #[tokio::test]
    async fn individual_grant_lets_a_viewer_edit() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let alice = bearer("alice", Role::User);
        let vera = bearer("vera", Role::Viewer);

        call(&app, post_form("/create_project", &alice, "project_name=Notes")).await;
        let (_, body) = call(&app, post_form("/visibility", &alice, "project_name=Notes&role=viewer&user=vera")).await;
        assert_eq!(body["success"], true);
        let (_, body) = call(&app, post_form("/visibility", &alice, "project_name=Notes&role=viewer&user=vera")).await;
        assert_eq!(body["error"], "Such access is already assigned");
        let (_, body) = call(&app, post_form("/visibility", &alice, "project_name=Notes&role=owner")).await;
        assert_eq!(body["error"], "Invalid role");

        let (_, body) = call(&app, get("/visibility?project_name=Notes", &alice)).await;
        assert_eq!(body["visibilities"], serde_json::json!([{"role": "viewer", "user": "vera"}]));

        let (_, body) = call(&app, get("/load_project?project_name=Notes", &vera)).await;
        assert_eq!(body["can_edit"], true);
        let (_, body) = call(&app, post_form("/save_project", &vera, "project_name=Notes&content=granted")).await;
        assert_eq!(body["success"], true);

        let (_, body) = call(&app, delete_form("/visibility", &alice, "project_name=Notes&role=user&user=vera")).await;
        assert_eq!(body["error"], "Such access not found");
    }

    #[tokio::test]
    async fn library_rename_favorites_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let alice = bearer("alice", Role::User);
        let root = bearer("root", Role::Admin);

        for name in ["Alpha", "Beta", "alphabet"] {
            call(&app, post_form("/create_project", &alice, &format!("project_name={}", name))).await;
        }
        call(&app, get("/load_project?project_name=Alpha", &alice)).await;

        let (_, body) = call(&app, post_form("/favorite_project", &alice, "project_name=Alpha&action=add")).await;
        assert_eq!(body["favorites"], serde_json::json!(["Alpha"]));
        let (_, body) = call(&app, post_form("/favorite_project", &alice, "project_name=Alpha&action=star")).await;
        assert_eq!(body["error"], "Invalid parameters");

        let (_, body) = call(&app, post_form("/rename_project", &alice, "old_name=Alpha&new_name=Beta")).await;
        assert_eq!(body["error"], "A project with this name already exists");
        let (_, body) = call(&app, post_form("/rename_project", &alice, "old_name=Alpha&new_name=Gam%2Fma")).await;
        assert_eq!(body["error"], "Invalid characters. Allowed: letters, numbers, spaces, - and _");
        let (_, body) = call(&app, post_form("/rename_project", &alice, "old_name=Alpha&new_name=Gamma")).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["new_name"], "Gamma");

        // the lock and the favorite moved with the project
        let (_, body) = call(&app, post_form("/save_project", &alice, "project_name=Gamma&content=moved")).await;
        assert_eq!(body["success"], true);
        let (_, body) = call(&app, get("/load_favorites", &alice)).await;
        assert_eq!(body["favorites"], serde_json::json!(["Gamma"]));

        let (_, body) = call(&app, get("/search_projects?query=ALPHA", &alice)).await;
        assert_eq!(body["projects"], serde_json::json!(["alphabet"]));
        let (_, body) = call(&app, get("/search_projects?offset=1&limit=1", &alice)).await;
        assert_eq!(body["projects"], serde_json::json!(["Gamma"]));

        let (_, body) = call(&app, post_form("/delete_project", &alice, "project_name=Gamma")).await;
        assert_eq!(body["error"], "Access denied");
        let (_, body) = call(&app, post_form("/delete_project", &root, "project_name=Gamma")).await;
        assert_eq!(body["success"], true);
        let (_, body) = call(&app, post_form("/delete_project", &root, "project_name=Gamma")).await;
        assert_eq!(body["error"], "Project not found");

        let (_, body) = call(&app, get("/load_favorites", &alice)).await;
        assert_eq!(body["favorites"], serde_json::json!([]));
    }
}
