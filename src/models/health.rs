use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API response for health and readiness checks
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// Projects that currently have an edit lock record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_projects: Option<usize>,
}
