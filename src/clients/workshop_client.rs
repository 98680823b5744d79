use chrono::Duration;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::{ClientConfig, ConfigError};
use crate::models::*;
use crate::services::auth_service::{mint_token, Role};
use crate::session::{ApiError, ProjectApi, SaveChunk};

/// [`ProjectApi`] over HTTP against a workshop server
#[derive(Debug, Clone)]
pub struct HttpProjectApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpProjectApi {
    pub fn new(base_url: &str, token: String, timeout: std::time::Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let token = resolve_token(config)?;
        Self::new(&config.server_url, token, config.request_timeout())
            .map_err(|e| ConfigError::Client(e.to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get<Q: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, query: &Q) -> Result<T, ApiError> {
        debug!("GET /{}", path);
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn post<F: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, form: &F) -> Result<T, ApiError> {
        debug!("POST /{}", path);
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

impl ProjectApi for HttpProjectApi {
    async fn load_project(&self, project: &str) -> Result<LoadProjectResponse, ApiError> {
        self.get("load_project", &[("project_name", project)]).await
    }

    async fn project_content(&self, project: &str) -> Result<ProjectContentResponse, ApiError> {
        self.get("get_project_content", &[("project_name", project)]).await
    }

    async fn heartbeat(&self, project: &str) -> Result<HeartbeatResponse, ApiError> {
        self.post("heartbeat", &[("project_name", project)]).await
    }

    async fn save_chunk(&self, chunk: SaveChunk<'_>) -> Result<SaveProjectResponse, ApiError> {
        let chunk_number = chunk.chunk_number.to_string();
        let total_chunks = chunk.total_chunks.to_string();
        let form = [
            ("project_name", chunk.project),
            ("content", chunk.content),
            ("chunk_number", chunk_number.as_str()),
            ("total_chunks", total_chunks.as_str()),
        ];
        self.post("save_project", &form).await
    }

    async fn create_project(&self, project: &str) -> Result<CreateProjectResponse, ApiError> {
        self.post("create_project", &[("project_name", project)]).await
    }

    async fn rename_project(&self, old_name: &str, new_name: &str) -> Result<RenameProjectResponse, ApiError> {
        self.post("rename_project", &[("old_name", old_name), ("new_name", new_name)]).await
    }

    async fn delete_project(&self, project: &str) -> Result<ActionResponse, ApiError> {
        self.post("delete_project", &[("project_name", project)]).await
    }

    async fn favorite_project(&self, project: &str, action: FavoriteAction) -> Result<FavoritesResponse, ApiError> {
        self.post("favorite_project", &[("project_name", project), ("action", action.as_str())]).await
    }

    async fn load_favorites(&self) -> Result<FavoritesResponse, ApiError> {
        self.get("load_favorites", &[] as &[(&str, &str)]).await
    }

    async fn search_projects(&self, query: &str, offset: usize, limit: usize) -> Result<SearchProjectsResponse, ApiError> {
        let query = SearchQuery {
            query: query.to_string(),
            offset: Some(offset),
            limit: Some(limit),
        };
        self.get("search_projects", &query).await
    }
}

/// Bearer token for the client: the configured one, or one minted from the shared secret
pub fn resolve_token(config: &ClientConfig) -> Result<String, ConfigError> {
    if let Some(token) = config.auth_token.as_ref().filter(|t| !t.trim().is_empty()) {
        return Ok(token.trim().to_string());
    }
    let (Some(user), Some(secret)) = (&config.user, &config.jwt_secret) else {
        return Err(ConfigError::MissingCredentials);
    };
    let role = Role::parse(&config.role).ok_or_else(|| ConfigError::Client(format!("Unknown role '{}'", config.role)))?;
    mint_token(secret, user, role, Duration::hours(12)).map_err(|e| ConfigError::Client(e.to_string()))
}
