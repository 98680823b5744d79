use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query carrying the project a request is about
#[derive(Serialize, Deserialize, Debug, Clone, IntoParams)]
pub struct ProjectQuery {
    pub project_name: String,
}

/// Form body of `POST /heartbeat`, `POST /create_project` and `POST /delete_project`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ProjectForm {
    pub project_name: String,
}

/// Form body of `POST /save_project`, one per chunk
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct SaveProjectForm {
    pub project_name: String,
    #[serde(default)]
    pub content: String,
    pub chunk_number: Option<u32>,
    pub total_chunks: Option<u32>,
}

/// Edit-access fields shared by load and heartbeat responses
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
pub struct AccessFields {
    #[serde(default)]
    pub can_edit: bool,
    /// User currently holding the edit lock
    #[serde(default)]
    pub editor: Option<String>,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub in_queue: bool,
    #[serde(default)]
    pub became_editor_after_queue: bool,
}

/// Response of `GET /load_project`
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct LoadProjectResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub access: AccessFields,
}

impl LoadProjectResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Response of `POST /heartbeat`
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct HeartbeatResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub access: AccessFields,
}

impl HeartbeatResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Response of `GET /get_project_content`
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct ProjectContentResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl ProjectContentResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            content: String::new(),
        }
    }
}

/// Per-chunk acknowledgement of `POST /save_project`
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct SaveProjectResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveProjectResponse {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()) }
    }
}

/// Response of `POST /create_project`
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct CreateProjectResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}
