use std::future::Future;

use crate::models::{
    ActionResponse, CreateProjectResponse, FavoriteAction, FavoritesResponse, HeartbeatResponse, LoadProjectResponse,
    ProjectContentResponse, RenameProjectResponse, SaveProjectResponse, SearchProjectsResponse,
};
use super::error::ApiError;

/// One piece of a chunked save. `chunk_number` counts from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveChunk<'a> {
    pub project: &'a str,
    pub content: &'a str,
    pub chunk_number: usize,
    pub total_chunks: usize,
}

/// Requests the session core makes against the workshop server
pub trait ProjectApi: Send + Sync + 'static {
    fn load_project(&self, project: &str) -> impl Future<Output = Result<LoadProjectResponse, ApiError>> + Send;

    fn project_content(&self, project: &str) -> impl Future<Output = Result<ProjectContentResponse, ApiError>> + Send;

    fn heartbeat(&self, project: &str) -> impl Future<Output = Result<HeartbeatResponse, ApiError>> + Send;

    fn save_chunk(&self, chunk: SaveChunk<'_>) -> impl Future<Output = Result<SaveProjectResponse, ApiError>> + Send;

    fn create_project(&self, project: &str) -> impl Future<Output = Result<CreateProjectResponse, ApiError>> + Send;

    fn rename_project(&self, old_name: &str, new_name: &str) -> impl Future<Output = Result<RenameProjectResponse, ApiError>> + Send;

    fn delete_project(&self, project: &str) -> impl Future<Output = Result<ActionResponse, ApiError>> + Send;

    fn favorite_project(&self, project: &str, action: FavoriteAction) -> impl Future<Output = Result<FavoritesResponse, ApiError>> + Send;

    fn load_favorites(&self) -> impl Future<Output = Result<FavoritesResponse, ApiError>> + Send;

    fn search_projects(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<SearchProjectsResponse, ApiError>> + Send;
}
