use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::api::{ProjectApi, SaveChunk};
use super::error::SessionError;
use super::surface::{EditorSurface, Notice};

/// Session facts shared with the scheduler, published by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub project: Option<String>,
    /// Bumped on every project switch; results carrying an older value are stale
    pub generation: u64,
    pub can_edit: bool,
}

impl SessionContext {
    pub fn is_current(&self, project: &str, generation: u64) -> bool {
        self.generation == generation && self.project.as_deref() == Some(project)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveSettings {
    pub delay: Duration,
    /// Maximum characters per chunk
    pub chunk_size: usize,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            chunk_size: 100 * 1024,
        }
    }
}

/// Split `content` into pieces of at most `chunk_size` characters, in order.
///
/// Never splits a character. Empty content yields one empty chunk.
pub fn split_chunks(content: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    if content.is_empty() {
        return vec![String::new()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in content.chars() {
        current.push(ch);
        count += 1;
        if count == chunk_size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// A content snapshot on its way to the server
#[derive(Debug)]
pub struct PendingSave {
    pub project: String,
    pub generation: u64,
    pub chunks: Vec<String>,
    /// Index of the next chunk to send
    pub cursor: usize,
    token: CancellationToken,
}

impl PendingSave {
    pub fn new(project: String, generation: u64, content: &str, chunk_size: usize, token: CancellationToken) -> Self {
        Self {
            project,
            generation,
            chunks: split_chunks(content, chunk_size),
            cursor: 0,
            token,
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Send the remaining chunks strictly in order, each after the previous one was acknowledged.
    pub async fn send<A: ProjectApi>(&mut self, api: &A) -> Result<(), SessionError> {
        let token = self.token.clone();
        let total_chunks = self.total_chunks();

        while self.cursor < total_chunks {
            if token.is_cancelled() {
                return Err(SessionError::Cancelled);
            }
            let chunk = SaveChunk {
                project: &self.project,
                content: &self.chunks[self.cursor],
                chunk_number: self.cursor + 1,
                total_chunks,
            };
            let ack = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(SessionError::Cancelled),
                ack = api.save_chunk(chunk) => ack?,
            };
            if !ack.success {
                return Err(SessionError::server(ack.error, "Save failed"));
            }
            debug!("Chunk {}/{} of '{}' acknowledged", self.cursor + 1, total_chunks, self.project);
            self.cursor += 1;
        }
        Ok(())
    }
}

struct Armed {
    id: u64,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Armed {
    fn cancel(self) {
        self.token.cancel();
        if let Some(task) = self.task {
            task.abort();
        }
    }
}

#[derive(Default)]
struct Slots {
    timer: Option<Armed>,
    in_flight: Option<Armed>,
}

fn take_if(slot: &mut Option<Armed>, id: u64) -> Option<Armed> {
    if slot.as_ref().is_some_and(|armed| armed.id == id) {
        slot.take()
    } else {
        None
    }
}

/// Debounced, cancellable autosave.
///
/// At most one debounce timer and one in-flight save exist at a time. A
/// firing timer supersedes the in-flight save; cancelling clears both.
pub struct AutosaveScheduler<A, S> {
    api: Arc<A>,
    surface: Arc<S>,
    context: watch::Receiver<SessionContext>,
    settings: AutosaveSettings,
    slots: Arc<Mutex<Slots>>,
    next_id: Arc<AtomicU64>,
}

impl<A, S> Clone for AutosaveScheduler<A, S> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            surface: self.surface.clone(),
            context: self.context.clone(),
            settings: self.settings,
            slots: self.slots.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<A: ProjectApi, S: EditorSurface> AutosaveScheduler<A, S> {
    pub fn new(api: Arc<A>, surface: Arc<S>, context: watch::Receiver<SessionContext>, settings: AutosaveSettings) -> Self {
        Self {
            api,
            surface,
            context,
            settings,
            slots: Arc::new(Mutex::new(Slots::default())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// (Re)start the debounce timer. An in-flight save keeps running until the timer fires.
    pub async fn on_content_changed(&self) {
        let mut slots = self.slots.lock().await;
        if let Some(previous) = slots.timer.take() {
            previous.cancel();
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let task = tokio::spawn(self.clone().run_cycle(id, token.clone()));
        slots.timer = Some(Armed { id, token, task: Some(task) });
    }

    /// Clear the pending timer and abort the in-flight save. Nothing cancelled here reports back.
    ///
    /// Returns whether there was anything to cancel, i.e. edits that are not on the server yet.
    pub async fn cancel_pending(&self) -> bool {
        let mut slots = self.slots.lock().await;
        let mut cancelled = false;
        if let Some(timer) = slots.timer.take() {
            debug!("Autosave timer {} cleared", timer.id);
            timer.cancel();
            cancelled = true;
        }
        if let Some(save) = slots.in_flight.take() {
            debug!("In-flight save {} aborted", save.id);
            save.cancel();
            cancelled = true;
        }
        cancelled
    }

    /// True when neither a timer nor a save is live
    pub async fn is_idle(&self) -> bool {
        let slots = self.slots.lock().await;
        slots.timer.is_none() && slots.in_flight.is_none()
    }

    /// Save the full current content right away, bypassing the debounce.
    pub async fn save_now(&self) -> Result<(), SessionError> {
        let context = self.context.borrow().clone();
        let project = context.project.ok_or(SessionError::NoProject)?;
        if !context.can_edit {
            return Err(SessionError::ReadOnly);
        }
        self.cancel_pending().await;

        let content = self.surface.current_content();

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let mut pending = PendingSave::new(project, context.generation, &content, self.settings.chunk_size, token.clone());
        {
            let mut slots = self.slots.lock().await;
            slots.in_flight = Some(Armed { id, token, task: None });
        }

        info!("Saving '{}' ({} chunk(s))", pending.project, pending.total_chunks());
        let result = pending.send(&*self.api).await;
        take_if(&mut self.slots.lock().await.in_flight, id);
        self.report(&pending, result, true)
    }

    async fn run_cycle(self, id: u64, token: CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(self.settings.delay) => {}
        }

        let mut pending = {
            let mut slots = self.slots.lock().await;
            if token.is_cancelled() {
                return;
            }
            let armed = take_if(&mut slots.timer, id);

            let context = self.context.borrow().clone();
            let project = match context.project {
                Some(project) if context.can_edit => project,
                _ => return,
            };
            let content = self.surface.current_content();
            if content.trim().is_empty() {
                debug!("Skipping autosave of empty content for '{}'", project);
                return;
            }

            if let Some(previous) = slots.in_flight.take() {
                debug!("Save {} superseded by save {}", previous.id, id);
                previous.cancel();
            }
            slots.in_flight = armed;
            PendingSave::new(project, context.generation, &content, self.settings.chunk_size, token)
        };

        let result = pending.send(&*self.api).await;
        take_if(&mut self.slots.lock().await.in_flight, id);
        let _ = self.report(&pending, result, false);
    }

    // Apply a save outcome only when its project is still the active one
    fn report(&self, pending: &PendingSave, result: Result<(), SessionError>, manual: bool) -> Result<(), SessionError> {
        if matches!(result, Err(SessionError::Cancelled)) {
            debug!("Save of '{}' cancelled", pending.project);
            return result;
        }
        if !self.context.borrow().is_current(&pending.project, pending.generation) {
            debug!("Save result for outdated project '{}' ignored", pending.project);
            return Err(SessionError::StaleResult { project: pending.project.clone() });
        }

        match &result {
            Ok(()) => {
                info!("Autosave complete for '{}'", pending.project);
                if manual {
                    self.surface.notify(Notice::Saved { project: pending.project.clone() });
                }
            }
            Err(e) => {
                warn!("Saving '{}' failed after {} of {} chunk(s): {}", pending.project, pending.cursor, pending.total_chunks(), e);
                self.surface.notify(Notice::SaveFailed {
                    project: pending.project.clone(),
                    reason: e.to_string(),
                });
            }
        }
        result
    }
}
