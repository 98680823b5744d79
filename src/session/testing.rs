//! Scripted server and recording editor for session tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use super::api::{ProjectApi, SaveChunk};
use super::error::ApiError;
use super::surface::{EditorSurface, Notice};
use crate::models::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Load(String),
    Content(String),
    Heartbeat(String),
    Save { project: String, chunk_number: usize, total_chunks: usize, content: String },
    Create(String),
    Rename { from: String, to: String },
    Delete(String),
    Favorite(String, FavoriteAction),
    Favorites,
    Search { query: String, offset: usize, limit: usize },
}

pub fn access(can_edit: bool, in_queue: bool, editor: &str) -> AccessFields {
    AccessFields {
        can_edit,
        editor: Some(editor.to_string()),
        notify: false,
        in_queue,
        became_editor_after_queue: false,
    }
}

pub fn heartbeat_ok(access: AccessFields) -> Result<HeartbeatResponse, ApiError> {
    Ok(HeartbeatResponse { success: true, error: None, access })
}

#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<Call>>,
    projects: Mutex<HashMap<String, LoadProjectResponse>>,
    unreachable: Mutex<HashSet<String>>,
    contents: Mutex<HashMap<String, String>>,
    heartbeats: Mutex<VecDeque<Result<HeartbeatResponse, ApiError>>>,
    last_heartbeat: Mutex<Option<Result<HeartbeatResponse, ApiError>>>,
    save_failures: Mutex<HashMap<usize, String>>,
    save_gate: Mutex<Option<Arc<Semaphore>>>,
    load_gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    favorites: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_project(&self, name: &str, content: &str, access: AccessFields) {
        self.projects.lock().unwrap().insert(name.to_string(), LoadProjectResponse {
            success: true,
            error: None,
            content: content.to_string(),
            access,
        });
        self.set_content(name, content);
    }

    pub fn set_content(&self, name: &str, content: &str) {
        self.contents.lock().unwrap().insert(name.to_string(), content.to_string());
    }

    pub fn remove_content(&self, name: &str) {
        self.contents.lock().unwrap().remove(name);
    }

    pub fn make_unreachable(&self, name: &str) {
        self.unreachable.lock().unwrap().insert(name.to_string());
    }

    pub fn queue_heartbeat(&self, response: Result<HeartbeatResponse, ApiError>) {
        self.heartbeats.lock().unwrap().push_back(response);
    }

    pub fn fail_chunk(&self, chunk_number: usize, error: &str) {
        self.save_failures.lock().unwrap().insert(chunk_number, error.to_string());
    }

    /// Hold every save chunk until a permit is added to the returned semaphore
    pub fn gate_saves(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.save_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold loads of `name` until a permit is added to the returned semaphore
    pub fn hold_load(&self, name: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.load_gates.lock().unwrap().insert(name.to_string(), gate.clone());
        gate
    }

    pub fn has_project(&self, name: &str) -> bool {
        self.projects.lock().unwrap().contains_key(name)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn saves(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| matches!(c, Call::Save { .. })).collect()
    }

    pub fn heartbeat_count(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::Heartbeat(_))).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ProjectApi for FakeApi {
    async fn load_project(&self, project: &str) -> Result<LoadProjectResponse, ApiError> {
        self.record(Call::Load(project.to_string()));
        let gate = self.load_gates.lock().unwrap().get(project).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if self.unreachable.lock().unwrap().contains(project) {
            return Err(ApiError::Transport("connection refused".to_string()));
        }
        Ok(self
            .projects
            .lock()
            .unwrap()
            .get(project)
            .cloned()
            .unwrap_or_else(|| LoadProjectResponse::failure("Project not found")))
    }

    async fn project_content(&self, project: &str) -> Result<ProjectContentResponse, ApiError> {
        self.record(Call::Content(project.to_string()));
        match self.contents.lock().unwrap().get(project) {
            Some(content) => Ok(ProjectContentResponse { success: true, error: None, content: content.clone() }),
            None => Ok(ProjectContentResponse::failure("Project not found")),
        }
    }

    async fn heartbeat(&self, project: &str) -> Result<HeartbeatResponse, ApiError> {
        self.record(Call::Heartbeat(project.to_string()));
        let scripted = self.heartbeats.lock().unwrap().pop_front();
        let mut last = self.last_heartbeat.lock().unwrap();
        match scripted {
            Some(response) => {
                *last = Some(response.clone());
                response
            }
            None => match last.clone() {
                Some(response) => response,
                None => {
                    let access = self
                        .projects
                        .lock()
                        .unwrap()
                        .get(project)
                        .map(|p| p.access.clone())
                        .unwrap_or_default();
                    heartbeat_ok(access)
                }
            },
        }
    }

    async fn save_chunk(&self, chunk: SaveChunk<'_>) -> Result<SaveProjectResponse, ApiError> {
        self.record(Call::Save {
            project: chunk.project.to_string(),
            chunk_number: chunk.chunk_number,
            total_chunks: chunk.total_chunks,
            content: chunk.content.to_string(),
        });
        let gate = self.save_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        match self.save_failures.lock().unwrap().get(&chunk.chunk_number) {
            Some(error) => Ok(SaveProjectResponse::failure(error.clone())),
            None => Ok(SaveProjectResponse::ok()),
        }
    }

    async fn create_project(&self, project: &str) -> Result<CreateProjectResponse, ApiError> {
        self.record(Call::Create(project.to_string()));
        let name = project.trim().to_string();
        if self.projects.lock().unwrap().contains_key(&name) {
            return Ok(CreateProjectResponse {
                success: false,
                error: Some("Project already exists".to_string()),
                project: None,
            });
        }
        self.with_project(&name, "<body></body>", access(true, false, "me"));
        Ok(CreateProjectResponse { success: true, error: None, project: Some(name) })
    }

    async fn rename_project(&self, old_name: &str, new_name: &str) -> Result<RenameProjectResponse, ApiError> {
        self.record(Call::Rename { from: old_name.to_string(), to: new_name.to_string() });
        let failure = |error: &str| RenameProjectResponse { success: false, error: Some(error.to_string()), new_name: None };
        let new_name = new_name.trim().to_string();
        let mut projects = self.projects.lock().unwrap();
        if projects.contains_key(&new_name) {
            return Ok(failure("A project with this name already exists"));
        }
        let Some(project) = projects.remove(old_name) else {
            return Ok(failure("Source project not found"));
        };
        projects.insert(new_name.clone(), project);
        let mut contents = self.contents.lock().unwrap();
        if let Some(content) = contents.remove(old_name) {
            contents.insert(new_name.clone(), content);
        }
        for favorite in self.favorites.lock().unwrap().iter_mut().filter(|f| *f == old_name) {
            *favorite = new_name.clone();
        }
        Ok(RenameProjectResponse { success: true, error: None, new_name: Some(new_name) })
    }

    async fn delete_project(&self, project: &str) -> Result<ActionResponse, ApiError> {
        self.record(Call::Delete(project.to_string()));
        if self.projects.lock().unwrap().remove(project).is_none() {
            return Ok(ActionResponse::failure("Project not found"));
        }
        self.contents.lock().unwrap().remove(project);
        self.favorites.lock().unwrap().retain(|f| f != project);
        Ok(ActionResponse::ok("deleted"))
    }

    async fn favorite_project(&self, project: &str, action: FavoriteAction) -> Result<FavoritesResponse, ApiError> {
        self.record(Call::Favorite(project.to_string(), action));
        let mut favorites = self.favorites.lock().unwrap();
        favorites.retain(|f| f != project);
        if action == FavoriteAction::Add {
            favorites.push(project.to_string());
        }
        Ok(FavoritesResponse { success: true, error: None, favorites: favorites.clone() })
    }

    async fn load_favorites(&self) -> Result<FavoritesResponse, ApiError> {
        self.record(Call::Favorites);
        let favorites = self.favorites.lock().unwrap().clone();
        Ok(FavoritesResponse { success: true, error: None, favorites })
    }

    async fn search_projects(&self, query: &str, offset: usize, limit: usize) -> Result<SearchProjectsResponse, ApiError> {
        self.record(Call::Search { query: query.to_string(), offset, limit });
        let needle = query.to_lowercase();
        let mut names: Vec<String> = self
            .projects
            .lock()
            .unwrap()
            .keys()
            .filter(|n| n.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        names.sort();
        let projects = names.into_iter().skip(offset).take(limit).collect();
        Ok(SearchProjectsResponse { success: true, error: None, projects })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Show { project: String, content: String },
    Replace(String),
    Writable(bool),
    Notice(Notice),
}

#[derive(Default)]
pub struct RecordingSurface {
    content: Mutex<String>,
    events: Mutex<Vec<Event>>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn type_text(&self, text: &str) {
        self.content.lock().unwrap().push_str(text);
    }

    pub fn set_text(&self, text: &str) {
        *self.content.lock().unwrap() = text.to_string();
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn is_writable(&self) -> bool {
        self.events()
            .iter()
            .rev()
            .find_map(|e| match e {
                Event::Writable(w) => Some(*w),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn position(&self, wanted: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == wanted)
    }
}

impl EditorSurface for RecordingSurface {
    fn show_project(&self, project: &str, content: &str) {
        *self.content.lock().unwrap() = content.to_string();
        self.events.lock().unwrap().push(Event::Show {
            project: project.to_string(),
            content: content.to_string(),
        });
    }

    fn replace_content(&self, content: &str) {
        *self.content.lock().unwrap() = content.to_string();
        self.events.lock().unwrap().push(Event::Replace(content.to_string()));
    }

    fn set_writable(&self, writable: bool) {
        self.events.lock().unwrap().push(Event::Writable(writable));
    }

    fn current_content(&self) -> String {
        self.content.lock().unwrap().clone()
    }

    fn notify(&self, notice: Notice) {
        self.events.lock().unwrap().push(Event::Notice(notice));
    }
}
