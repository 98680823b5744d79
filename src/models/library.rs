use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Form body of `POST /rename_project`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct RenameProjectForm {
    #[serde(default)]
    pub old_name: String,
    #[serde(default)]
    pub new_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct RenameProjectResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
}

/// Plain acknowledgement for delete and visibility changes
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, error: None, message: Some(message.into()) }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), message: None }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteAction {
    Add,
    Remove,
}

impl FavoriteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            FavoriteAction::Add => "add",
            FavoriteAction::Remove => "remove",
        }
    }
}

/// Form body of `POST /favorite_project`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct FavoriteForm {
    #[serde(default)]
    pub project_name: String,
    /// `add` or `remove`; anything else is rejected
    #[serde(default)]
    pub action: Option<String>,
}

/// Response of the favorites endpoints: the full list after the change
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct FavoritesResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub favorites: Vec<String>,
}

impl FavoritesResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), favorites: Vec::new() }
    }
}

/// Query of `GET /search_projects`
#[derive(Serialize, Deserialize, Debug, Clone, Default, IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive substring of the project name; empty lists everything
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct SearchProjectsResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub projects: Vec<String>,
}
