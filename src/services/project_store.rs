use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::{FavoriteAction, VisibilityRule};

const INDEX_FILE: &str = "index.html";
const STAGING_FILE: &str = "index.html.part";
const VISIBILITY_FILE: &str = ".visibility.json";
const FAVORITES_FILE: &str = ".favorites.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project name required")]
    EmptyName,
    #[error("Invalid project name '{0}'")]
    InvalidName(String),
    #[error("Project not found")]
    NotFound,
    #[error("Project already exists")]
    AlreadyExists,
    #[error("Invalid chunk {chunk} of {total}")]
    InvalidChunk { chunk: u32, total: u32 },
    #[error("Chunk received out of order")]
    OutOfOrder,
    #[error("Both names are required")]
    MissingNames,
    #[error("Invalid characters. Allowed: letters, numbers, spaces, - and _")]
    InvalidCharacters,
    #[error("Source project not found")]
    SourceNotFound,
    #[error("A project with this name already exists")]
    NameTaken,
    #[error("Such access is already assigned")]
    RuleExists,
    #[error("Such access not found")]
    RuleNotFound,
    #[error("Corrupt metadata file: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of writing one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkProgress {
    Partial { received: u32, total: u32 },
    Complete,
}

#[derive(Debug)]
struct Upload {
    user: String,
    next_chunk: u32,
    total: u32,
    touched: Instant,
}

/// Projects on disk, one directory per project with an `index.html` document.
///
/// Per-project visibility rules sit next to the document; the shared
/// favorites list sits in the root.
#[derive(Debug)]
pub struct ProjectStore {
    root: PathBuf,
    uploads: Mutex<HashMap<String, Upload>>,
    upload_timeout: Duration,
    // serializes read-modify-write of the metadata files
    meta: Mutex<()>,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            uploads: Mutex::new(HashMap::new()),
            upload_timeout: Duration::from_secs(30),
            meta: Mutex::new(()),
        }
    }

    /// Unfinished uploads idle for this long are dropped by [`prune_stale_uploads`](Self::prune_stale_uploads)
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub async fn read(&self, name: &str) -> Result<String, StoreError> {
        let name = validate_name(name)?;
        match fs::read_to_string(self.project_dir(&name).join(INDEX_FILE)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a project with an empty HTML skeleton. Returns the normalized name.
    pub async fn create(&self, name: &str) -> Result<String, StoreError> {
        let name = validate_name(name)?;
        let dir = self.project_dir(&name);
        if fs::try_exists(&dir).await? {
            return Err(StoreError::AlreadyExists);
        }
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(INDEX_FILE), skeleton_document(&name)).await?;
        info!("Created project '{}'", name);
        Ok(name)
    }

    /// Write chunk `chunk` of `total` for `name`.
    ///
    /// Chunks land in a staging file; the last one replaces the document in a
    /// single rename. Chunk 1 always starts a fresh upload, any other chunk must
    /// directly follow the previous one from the same user.
    pub async fn write_chunk(
        &self,
        name: &str,
        user: &str,
        chunk: u32,
        total: u32,
        content: &str,
    ) -> Result<ChunkProgress, StoreError> {
        let name = validate_name(name)?;
        if chunk == 0 || total == 0 || chunk > total {
            return Err(StoreError::InvalidChunk { chunk, total });
        }

        let dir = self.project_dir(&name);
        let staging = dir.join(STAGING_FILE);
        let mut uploads = self.uploads.lock().await;

        if chunk == 1 {
            if uploads.remove(&name).is_some() {
                debug!("Upload for '{}' superseded by a new save", name);
            }
            fs::create_dir_all(&dir).await?;
            fs::write(&staging, content).await?;
        } else {
            let in_sequence = matches!(
                uploads.get(&name),
                Some(upload) if upload.user == user && upload.next_chunk == chunk && upload.total == total
            );
            if !in_sequence {
                warn!("Chunk {}/{} for '{}' from {} is out of order, discarding upload", chunk, total, name, user);
                uploads.remove(&name);
                let _ = fs::remove_file(&staging).await;
                return Err(StoreError::OutOfOrder);
            }
            let mut file = fs::OpenOptions::new().append(true).open(&staging).await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
        }

        if chunk == total {
            uploads.remove(&name);
            fs::rename(&staging, dir.join(INDEX_FILE)).await?;
            info!("Saved project '{}' ({} chunk(s))", name, total);
            return Ok(ChunkProgress::Complete);
        }

        uploads.insert(name, Upload {
            user: user.to_string(),
            next_chunk: chunk + 1,
            total,
            touched: Instant::now(),
        });
        Ok(ChunkProgress::Partial { received: chunk, total })
    }

    /// Drop unfinished uploads nobody continued within the upload timeout,
    /// together with their staging files. Returns how many were dropped.
    pub async fn prune_stale_uploads(&self, now: Instant) -> usize {
        let mut uploads = self.uploads.lock().await;
        let stale: Vec<String> = uploads
            .iter()
            .filter(|(_, upload)| now.saturating_duration_since(upload.touched) >= self.upload_timeout)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &stale {
            uploads.remove(name);
            debug!("Dropping abandoned upload for '{}'", name);
            let _ = fs::remove_file(self.project_dir(name).join(STAGING_FILE)).await;
        }
        stale.len()
    }

    /// Rename a project directory, carrying its document and visibility rules along
    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<String, StoreError> {
        if old_name.trim().is_empty() || new_name.trim().is_empty() {
            return Err(StoreError::MissingNames);
        }
        let new_name = new_name.trim();
        if !new_name.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | ' ' | '-')) {
            return Err(StoreError::InvalidCharacters);
        }
        let old_name = validate_name(old_name)?;
        let new_name = validate_name(new_name)?;

        let old_dir = self.project_dir(&old_name);
        let new_dir = self.project_dir(&new_name);
        if !fs::try_exists(&old_dir).await? {
            return Err(StoreError::SourceNotFound);
        }
        if fs::try_exists(&new_dir).await? {
            return Err(StoreError::NameTaken);
        }

        let mut uploads = self.uploads.lock().await;
        fs::rename(&old_dir, &new_dir).await?;
        if uploads.remove(&old_name).is_some() {
            let _ = fs::remove_file(new_dir.join(STAGING_FILE)).await;
        }
        drop(uploads);

        let _meta = self.meta.lock().await;
        let mut favorites = self.read_favorites().await?;
        if favorites.iter().any(|f| *f == old_name) {
            for favorite in favorites.iter_mut().filter(|f| **f == old_name) {
                *favorite = new_name.clone();
            }
            self.write_json(&self.root.join(FAVORITES_FILE), &favorites).await?;
        }
        info!("Renamed project '{}' to '{}'", old_name, new_name);
        Ok(new_name)
    }

    /// Remove a project with everything in its directory
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let name = validate_name(name)?;
        let dir = self.project_dir(&name);
        if !fs::try_exists(&dir).await? {
            return Err(StoreError::NotFound);
        }

        self.uploads.lock().await.remove(&name);
        fs::remove_dir_all(&dir).await?;

        let _meta = self.meta.lock().await;
        let mut favorites = self.read_favorites().await?;
        let before = favorites.len();
        favorites.retain(|f| *f != name);
        if favorites.len() != before {
            self.write_json(&self.root.join(FAVORITES_FILE), &favorites).await?;
        }
        info!("Deleted project '{}'", name);
        Ok(())
    }

    /// Project names in the root, sorted. Hidden entries are skipped.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.file_type().await?.is_dir() {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    pub async fn favorites(&self) -> Result<Vec<String>, StoreError> {
        let _meta = self.meta.lock().await;
        self.read_favorites().await
    }

    /// Add or remove a favorite. Returns the updated list.
    pub async fn set_favorite(&self, name: &str, action: FavoriteAction) -> Result<Vec<String>, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }

        let _meta = self.meta.lock().await;
        let mut favorites = self.read_favorites().await?;
        let listed = favorites.iter().any(|f| f == name);
        match action {
            FavoriteAction::Add if !listed => favorites.push(name.to_string()),
            FavoriteAction::Remove if listed => favorites.retain(|f| f != name),
            _ => return Ok(favorites),
        }
        self.write_json(&self.root.join(FAVORITES_FILE), &favorites).await?;
        Ok(favorites)
    }

    /// Visibility rules of a project; none when it has no rules file
    pub async fn visibility(&self, name: &str) -> Result<Vec<VisibilityRule>, StoreError> {
        let name = validate_name(name)?;
        Ok(self
            .read_json(&self.project_dir(&name).join(VISIBILITY_FILE))
            .await?
            .unwrap_or_default())
    }

    /// Add a visibility rule.
    ///
    /// An individual grant is added next to the existing rules; a role-wide
    /// rule replaces the previous role-wide one.
    pub async fn add_visibility(&self, name: &str, rule: VisibilityRule) -> Result<(), StoreError> {
        let name = validate_name(name)?;
        let dir = self.project_dir(&name);
        if !fs::try_exists(dir.join(INDEX_FILE)).await? {
            return Err(StoreError::NotFound);
        }

        let _meta = self.meta.lock().await;
        let path = dir.join(VISIBILITY_FILE);
        let mut rules: Vec<VisibilityRule> = self.read_json(&path).await?.unwrap_or_default();
        if rule.user.is_some() {
            if rules.contains(&rule) {
                return Err(StoreError::RuleExists);
            }
        } else {
            rules.retain(|r| r.user.is_some());
        }
        debug!("Visibility of '{}' gains {:?}", name, rule);
        rules.push(rule);
        self.write_json(&path, &rules).await
    }

    /// Remove exactly matching rule
    pub async fn remove_visibility(&self, name: &str, rule: &VisibilityRule) -> Result<(), StoreError> {
        let name = validate_name(name)?;
        let _meta = self.meta.lock().await;
        let path = self.project_dir(&name).join(VISIBILITY_FILE);
        let mut rules: Vec<VisibilityRule> = self.read_json(&path).await?.unwrap_or_default();
        let Some(idx) = rules.iter().position(|r| r == rule) else {
            return Err(StoreError::RuleNotFound);
        };
        rules.remove(idx);
        self.write_json(&path, &rules).await
    }

    fn project_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    async fn read_favorites(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read_json(&self.root.join(FAVORITES_FILE)).await?.unwrap_or_default())
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        fs::write(path, serde_json::to_vec_pretty(value)?).await?;
        Ok(())
    }
}

/// Trim a project name and reject anything that could escape the projects
/// directory or collide with the hidden metadata files
pub fn validate_name(name: &str) -> Result<String, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyName);
    }
    let forbidden = trimmed.starts_with('.')
        || trimmed.contains(['/', '\\'])
        || trimmed.chars().any(char::is_control);
    if forbidden {
        return Err(StoreError::InvalidName(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

fn skeleton_document(name: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset='UTF-8'>\n  <title>{}</title>\n</head>\n<body>\n  <!-- Project content -->\n</body>\n</html>",
        name
    )
}
