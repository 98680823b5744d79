pub mod auth_service;
pub mod edit_lock_service;
pub mod project_store;
pub mod visibility;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use auth_service::Principal;
use edit_lock_service::EditLockService;
use project_store::ProjectStore;

/// Shared server state handed to every handler
#[derive(Debug)]
pub struct AppState {
    pub store: ProjectStore,
    pub locks: EditLockService,
    pub jwt_secret: Option<String>,
    janitor_interval: Duration,
}

impl AppState {
    pub fn from_config(config: &Config) -> Arc<Self> {
        Arc::new(Self {
            store: ProjectStore::new(&config.projects_dir).with_upload_timeout(config.edit_timeout()),
            locks: EditLockService::new(config.edit_timeout()),
            jwt_secret: config.auth_jwt_secret.clone(),
            janitor_interval: config.edit_timeout(),
        })
    }

    /// Edit rights of `principal` on `project`: token role combined with the project's visibility rules
    pub async fn can_edit(&self, project: &str, principal: &Principal) -> bool {
        if principal.is_admin() {
            return true;
        }
        match self.store.visibility(project).await {
            Ok(rules) => visibility::can_edit_project(principal, &rules),
            Err(e) => {
                warn!("Failed to read visibility of '{}': {}", project, e);
                false
            }
        }
    }

    /// Periodically drop idle lock records and abandoned uploads
    pub fn spawn_janitor(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(state.janitor_interval.max(Duration::from_secs(1)));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let locks = state.locks.prune().await;
                let uploads = state.store.prune_stale_uploads(Instant::now()).await;
                if locks + uploads > 0 {
                    debug!("Janitor dropped {} lock record(s) and {} upload(s)", locks, uploads);
                }
            }
        })
    }
}
