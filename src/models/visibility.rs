use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::services::auth_service::Role;

/// One visibility record of a project.
///
/// With `user` set it grants that user access; without it, it sets the
/// role-wide visibility of the project. A project has at most one role-wide
/// record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct VisibilityRule {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl VisibilityRule {
    pub fn for_role(role: Role) -> Self {
        Self { role, user: None }
    }

    pub fn for_user(role: Role, user: &str) -> Self {
        Self { role, user: Some(user.to_string()) }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, IntoParams)]
pub struct VisibilityQuery {
    pub project_name: String,
}

/// Form body of `POST /visibility` and `DELETE /visibility`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct VisibilityForm {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub role: String,
    /// Username for an individual grant; empty or missing for the role-wide record
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct VisibilityResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub visibilities: Vec<VisibilityRule>,
}
