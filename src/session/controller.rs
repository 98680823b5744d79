use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::models::{AccessFields, FavoriteAction};
use super::access::{transition, AccessState, AccessTransition};
use super::api::ProjectApi;
use super::autosave::{AutosaveScheduler, AutosaveSettings, SessionContext};
use super::error::SessionError;
use super::surface::{EditorSurface, Notice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub heartbeat_interval: Duration,
    /// Read-only content refresh while not editing; `None` disables it
    pub view_refresh: Option<Duration>,
    pub autosave: AutosaveSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(3),
            view_refresh: None,
            autosave: AutosaveSettings::default(),
        }
    }
}

impl From<&ClientConfig> for SessionSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(config.heartbeat_interval_ms),
            view_refresh: config.view_refresh_ms.map(Duration::from_millis),
            autosave: AutosaveSettings {
                delay: Duration::from_millis(config.autosave_delay_ms),
                chunk_size: config.chunk_size,
            },
        }
    }
}

/// The open project. Replaced on every switch.
#[derive(Debug, Clone)]
struct Session {
    id: Uuid,
    project: String,
    access: AccessState,
    // Promotion seen but not yet announced, e.g. because the refresh failed
    announce_pending: bool,
}

#[derive(Debug, Default)]
struct Timers {
    heartbeat: Option<JoinHandle<()>>,
    refresh: Option<JoinHandle<()>>,
}

impl Timers {
    fn stop_refresh(&mut self) {
        if let Some(task) = self.refresh.take() {
            task.abort();
        }
    }

    fn stop_all(&mut self) {
        if let Some(task) = self.heartbeat.take() {
            task.abort();
        }
        self.stop_refresh();
    }
}

#[derive(Debug, Default)]
struct State {
    // Last session that opened successfully; kept while a switch is loading
    session: Option<Session>,
    timers: Timers,
    generation: u64,
    // A switch cancelled autosave for `session` before its edits reached the server
    unsaved: bool,
}

struct Inner<A, S> {
    api: Arc<A>,
    surface: Arc<S>,
    settings: SessionSettings,
    context: watch::Sender<SessionContext>,
    autosave: AutosaveScheduler<A, S>,
    state: Mutex<State>,
}

/// Drives one editor tab: which project is open, whether it may be edited,
/// the heartbeat loop, and autosave.
///
/// Cheap to clone; all clones drive the same session. Call [`close`](Self::close)
/// before dropping the last handle, the background loops hold a handle too.
pub struct SessionController<A, S> {
    inner: Arc<Inner<A, S>>,
}

impl<A, S> Clone for SessionController<A, S> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<A: ProjectApi, S: EditorSurface> SessionController<A, S> {
    pub fn new(api: Arc<A>, surface: Arc<S>, settings: SessionSettings) -> Self {
        let (context, context_rx) = watch::channel(SessionContext::default());
        let autosave = AutosaveScheduler::new(api.clone(), surface.clone(), context_rx, settings.autosave);
        Self {
            inner: Arc::new(Inner {
                api,
                surface,
                settings,
                context,
                autosave,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn current_project(&self) -> Option<String> {
        self.inner.context.borrow().project.clone()
    }

    pub fn can_edit(&self) -> bool {
        self.inner.context.borrow().can_edit
    }

    /// Access of the open session. While a switch is loading this is still
    /// the access of the project it switches away from.
    pub async fn access(&self) -> Option<AccessState> {
        self.inner.state.lock().await.session.as_ref().map(|s| s.access.clone())
    }

    /// Switch to `project`.
    ///
    /// The previous project's autosave and loops are stopped before the first
    /// request goes out. If loading fails, the last session that opened
    /// successfully is restored, and autosave is re-armed for edits the switch
    /// had cancelled.
    pub async fn open_project(&self, project: &str) -> Result<AccessState, SessionError> {
        let project = project.trim().to_string();
        let cancelled = self.inner.autosave.cancel_pending().await;

        let generation = {
            let mut state = self.inner.state.lock().await;
            state.timers.stop_all();
            state.generation += 1;
            state.unsaved |= cancelled;
            state.generation
        };
        self.inner.context.send_replace(SessionContext {
            project: Some(project.clone()),
            generation,
            can_edit: false,
        });
        info!("Opening project '{}'", project);

        let loaded = match self.inner.api.load_project(&project).await {
            Ok(response) if response.success => Ok(response),
            Ok(response) => Err(SessionError::server(response.error, "Failed to load project")),
            Err(e) => Err(SessionError::NetworkFailure(e)),
        };

        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            debug!("Load of '{}' finished after another switch, ignoring it", project);
            return Err(SessionError::StaleResult { project });
        }

        let response = match loaded {
            Ok(response) => response,
            Err(e) => {
                warn!("Opening '{}' failed: {}", project, e);
                self.restore(&mut state);
                let rearm = std::mem::take(&mut state.unsaved)
                    && state.session.as_ref().is_some_and(|s| s.access.can_edit());
                drop(state);
                if rearm {
                    debug!("Re-arming autosave for edits made before the failed switch");
                    self.inner.autosave.on_content_changed().await;
                }
                let notice = match &e {
                    SessionError::NetworkFailure(_) => Notice::OpenFailed {
                        project: project.clone(),
                        reason: e.to_string(),
                    },
                    _ => Notice::ServerError(e.to_string()),
                };
                self.inner.surface.notify(notice);
                return Err(e);
            }
        };

        let access = AccessState::from_fields(&response.access);
        let session = Session {
            id: Uuid::new_v4(),
            project: project.clone(),
            access: access.clone(),
            announce_pending: false,
        };
        info!("Session {} opened '{}' as {:?}", session.id, project, access);

        self.inner.surface.show_project(&project, &response.content);
        self.inner.surface.set_writable(access.can_edit());
        self.inner.context.send_modify(|ctx| ctx.can_edit = access.can_edit());
        match &access {
            AccessState::Editor if response.access.became_editor_after_queue => {
                self.inner.surface.notify(Notice::PromotedFromQueue);
            }
            AccessState::Queued { editor } => {
                self.inner.surface.notify(Notice::Queued { editor: editor.clone() });
            }
            _ => {}
        }

        state.session = Some(session);
        state.unsaved = false;
        state.timers.heartbeat = Some(self.spawn_heartbeat(generation));
        if !access.can_edit() {
            self.start_view_refresh(&mut state.timers, generation);
        }
        Ok(access)
    }

    /// Create `project` on the server and open it
    pub async fn create_project(&self, project: &str) -> Result<AccessState, SessionError> {
        let response = self.inner.api.create_project(project).await.map_err(|e| self.report(e.into()))?;
        match response.project {
            Some(created) if response.success => self.open_project(&created).await,
            _ => Err(self.report(SessionError::server(response.error, "Failed to create project"))),
        }
    }

    /// Rename a project. The open project is saved first and reopened under its new name.
    pub async fn rename_project(&self, old_name: &str, new_name: &str) -> Result<String, SessionError> {
        let old_name = old_name.trim();
        let is_open = self.current_project().as_deref() == Some(old_name);
        if is_open && self.can_edit() && !self.inner.autosave.is_idle().await {
            self.save_now().await?;
        }

        let response = self
            .inner
            .api
            .rename_project(old_name, new_name)
            .await
            .map_err(|e| self.report(e.into()))?;
        let renamed = match response.new_name {
            Some(renamed) if response.success => renamed,
            _ => return Err(self.report(SessionError::server(response.error, "Failed to rename project"))),
        };
        info!("Project '{}' renamed to '{}'", old_name, renamed);
        if is_open && self.current_project().as_deref() == Some(old_name) {
            self.open_project(&renamed).await?;
        }
        Ok(renamed)
    }

    /// Delete a project on the server, closing it first when it is open
    pub async fn delete_project(&self, project: &str) -> Result<(), SessionError> {
        let project = project.trim();
        let response = self.inner.api.delete_project(project).await.map_err(|e| self.report(e.into()))?;
        if !response.success {
            return Err(self.report(SessionError::server(response.error, "Failed to delete project")));
        }
        if self.current_project().as_deref() == Some(project) {
            self.close().await;
        }
        Ok(())
    }

    pub async fn search_projects(&self, query: &str, offset: usize, limit: usize) -> Result<Vec<String>, SessionError> {
        let response = self
            .inner
            .api
            .search_projects(query, offset, limit)
            .await
            .map_err(|e| self.report(e.into()))?;
        if !response.success {
            return Err(self.report(SessionError::server(response.error, "Search failed")));
        }
        Ok(response.projects)
    }

    pub async fn favorites(&self) -> Result<Vec<String>, SessionError> {
        let response = self.inner.api.load_favorites().await.map_err(|e| self.report(e.into()))?;
        if !response.success {
            return Err(self.report(SessionError::server(response.error, "Failed to load favorites")));
        }
        Ok(response.favorites)
    }

    /// Bookmark or un-bookmark a project. Returns the updated favorites.
    pub async fn set_favorite(&self, project: &str, action: FavoriteAction) -> Result<Vec<String>, SessionError> {
        let response = self
            .inner
            .api
            .favorite_project(project.trim(), action)
            .await
            .map_err(|e| self.report(e.into()))?;
        if !response.success {
            return Err(self.report(SessionError::server(response.error, "Failed to update favorites")));
        }
        Ok(response.favorites)
    }

    /// Poll access for the open project once.
    ///
    /// Failures are returned for the caller to inspect but never change the session.
    pub async fn send_heartbeat(&self) -> Result<AccessTransition, SessionError> {
        let generation = self.inner.context.borrow().generation;
        self.heartbeat_once(generation).await
    }

    /// The editor content changed. Arms autosave while this tab may edit.
    pub async fn content_changed(&self) {
        if self.can_edit() {
            self.inner.autosave.on_content_changed().await;
        }
    }

    /// Save immediately, reporting the result to the surface
    pub async fn save_now(&self) -> Result<(), SessionError> {
        let result = self.inner.autosave.save_now().await;
        if let Err(e @ (SessionError::NoProject | SessionError::ReadOnly)) = &result {
            self.inner.surface.notify(Notice::ServerError(e.to_string()));
        }
        result
    }

    /// Stop every loop and forget the open project
    pub async fn close(&self) {
        self.inner.autosave.cancel_pending().await;
        let mut state = self.inner.state.lock().await;
        state.timers.stop_all();
        state.generation += 1;
        state.unsaved = false;
        if let Some(session) = state.session.take() {
            info!("Session {} for '{}' closed", session.id, session.project);
        }
        self.inner.context.send_replace(SessionContext {
            generation: state.generation,
            ..SessionContext::default()
        });
    }

    fn report(&self, e: SessionError) -> SessionError {
        self.inner.surface.notify(Notice::ServerError(e.to_string()));
        e
    }

    // Put the last good session back in place after a failed switch
    fn restore(&self, state: &mut State) {
        state.generation += 1;
        let generation = state.generation;
        match &state.session {
            Some(session) => {
                let can_edit = session.access.can_edit();
                self.inner.context.send_replace(SessionContext {
                    project: Some(session.project.clone()),
                    generation,
                    can_edit,
                });
                debug!("Session {} for '{}' restored", session.id, session.project);
                state.timers.heartbeat = Some(self.spawn_heartbeat(generation));
                if !can_edit {
                    self.start_view_refresh(&mut state.timers, generation);
                }
            }
            None => {
                self.inner.context.send_replace(SessionContext {
                    generation,
                    ..SessionContext::default()
                });
            }
        }
    }

    fn spawn_heartbeat(&self, generation: u64) -> JoinHandle<()> {
        let controller = self.clone();
        let period = self.inner.settings.heartbeat_interval;
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match controller.heartbeat_once(generation).await {
                    Ok(AccessTransition::Unchanged) => {}
                    Ok(change) => debug!("Heartbeat changed access: {:?}", change),
                    Err(SessionError::StaleResult { .. }) => return,
                    Err(e) => debug!("Heartbeat ignored: {}", e),
                }
            }
        })
    }

    fn start_view_refresh(&self, timers: &mut Timers, generation: u64) {
        let Some(period) = self.inner.settings.view_refresh else {
            return;
        };
        if timers.refresh.is_some() {
            return;
        }
        let controller = self.clone();
        timers.refresh = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !controller.refresh_view(generation).await {
                    return;
                }
            }
        }));
    }

    // One read-only refresh. Returns false once the loop has no reason to go on.
    async fn refresh_view(&self, generation: u64) -> bool {
        let project = {
            let ctx = self.inner.context.borrow();
            if ctx.generation != generation || ctx.can_edit {
                return false;
            }
            match ctx.project.clone() {
                Some(project) => project,
                None => return false,
            }
        };
        match self.inner.api.project_content(&project).await {
            Ok(response) if response.success => {
                let ctx = self.inner.context.borrow().clone();
                if ctx.is_current(&project, generation) && !ctx.can_edit {
                    self.inner.surface.replace_content(&response.content);
                }
            }
            Ok(response) => debug!("View refresh of '{}' failed: {:?}", project, response.error),
            Err(e) => debug!("View refresh of '{}' failed: {}", project, e),
        }
        true
    }

    async fn heartbeat_once(&self, generation: u64) -> Result<AccessTransition, SessionError> {
        let project = {
            let ctx = self.inner.context.borrow();
            match &ctx.project {
                Some(project) if ctx.generation == generation => project.clone(),
                Some(project) => return Err(SessionError::StaleResult { project: project.clone() }),
                None => return Err(SessionError::NoProject),
            }
        };

        let response = self.inner.api.heartbeat(&project).await?;
        if !response.success {
            return Err(SessionError::server(response.error, "Heartbeat rejected"));
        }
        self.apply_access(&project, generation, &response.access).await
    }

    async fn apply_access(&self, project: &str, generation: u64, fields: &AccessFields) -> Result<AccessTransition, SessionError> {
        let stale = || SessionError::StaleResult { project: project.to_string() };

        let change = {
            let mut guard = self.inner.state.lock().await;
            let state = &mut *guard;
            if state.generation != generation {
                return Err(stale());
            }
            let session = state.session.as_mut().ok_or_else(stale)?;
            let change = transition(&session.access, fields);
            match &change {
                AccessTransition::Unchanged => {
                    session.access = AccessState::from_fields(fields);
                }
                AccessTransition::Promote { announce } => {
                    // stays read-only until the refresh below lands
                    session.announce_pending |= *announce;
                    state.timers.stop_refresh();
                }
                AccessTransition::HolderChanged { .. } => {
                    session.access = AccessState::from_fields(fields);
                }
                AccessTransition::EnterQueue { .. } | AccessTransition::Demote => {
                    session.access = AccessState::from_fields(fields);
                    self.inner.context.send_modify(|ctx| ctx.can_edit = false);
                    self.start_view_refresh(&mut state.timers, generation);
                }
            }
            change
        };

        match &change {
            AccessTransition::Unchanged => {}
            AccessTransition::Promote { .. } => self.enable_editing(project, generation).await?,
            AccessTransition::EnterQueue { editor } => {
                info!("Edit lock on '{}' held by {:?}, waiting in queue", project, editor);
                self.inner.autosave.cancel_pending().await;
                self.inner.surface.set_writable(false);
                self.inner.surface.notify(Notice::Queued { editor: editor.clone() });
            }
            AccessTransition::HolderChanged { editor } => {
                info!("Edit lock on '{}' moved to {:?}, still waiting", project, editor);
                self.inner.surface.notify(Notice::Queued { editor: editor.clone() });
            }
            AccessTransition::Demote => {
                info!("Edit access to '{}' lost", project);
                self.inner.autosave.cancel_pending().await;
                self.inner.surface.set_writable(false);
            }
        }
        Ok(change)
    }

    // Pull the latest content first so concurrent edits are not clobbered, then unlock the editor
    async fn enable_editing(&self, project: &str, generation: u64) -> Result<(), SessionError> {
        let fetched = self.inner.api.project_content(project).await;

        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            return Err(SessionError::StaleResult { project: project.to_string() });
        }
        let content = match fetched {
            Ok(response) if response.success => response.content,
            Ok(response) => {
                warn!("Refreshing '{}' before editing failed: {:?}", project, response.error);
                self.start_view_refresh(&mut state.timers, generation);
                return Err(SessionError::server(response.error, "Failed to refresh project"));
            }
            Err(e) => {
                warn!("Refreshing '{}' before editing failed: {}", project, e);
                self.start_view_refresh(&mut state.timers, generation);
                return Err(SessionError::NetworkFailure(e));
            }
        };
        let Some(session) = state.session.as_mut() else {
            return Err(SessionError::StaleResult { project: project.to_string() });
        };

        self.inner.surface.replace_content(&content);
        self.inner.surface.set_writable(true);
        session.access = AccessState::Editor;
        self.inner.context.send_modify(|ctx| ctx.can_edit = true);
        info!("Session {} may now edit '{}'", session.id, project);
        if std::mem::take(&mut session.announce_pending) {
            self.inner.surface.notify(Notice::PromotedFromQueue);
        }
        Ok(())
    }
}
