//! File-backed persistence for [`Session`] snapshots — separate from the
//! append-only [`crate::transcript`] audit log.

use crate::model::Session;
use async_trait::async_trait;
use codi_core::{CodiError, CodiResult};
use std::path::PathBuf;
use uuid::Uuid;

/// Persistence backend for whole-session snapshots.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a new session.
    async fn create(&self, session: &Session) -> CodiResult<()>;
    /// Loads a session by id, if present.
    async fn get(&self, id: Uuid) -> CodiResult<Option<Session>>;
    /// Overwrites a session's persisted state.
    async fn update(&self, session: &Session) -> CodiResult<()>;
    /// Removes a session's persisted state.
    async fn delete(&self, id: Uuid) -> CodiResult<()>;
    /// Lists every persisted session id.
    async fn list(&self) -> CodiResult<Vec<Uuid>>;
}

/// File-system-backed [`SessionStore`]: one JSON file per session. Adequate
/// for single-process deployments; not a substitute for a real database.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub async fn new(dir: PathBuf) -> CodiResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create(&self, session: &Session) -> CodiResult<()> {
        let path = self.session_path(session.id);
        let json = serde_json::to_string_pretty(session)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CodiResult<Option<Session>> {
        let path = self.session_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(path).await?;
        let session: Session =
            serde_json::from_str(&data).map_err(|e| CodiError::Session(format!("failed to parse session: {e}")))?;
        Ok(Some(session))
    }

    async fn update(&self, session: &Session) -> CodiResult<()> {
        self.create(session).await
    }

    async fn delete(&self, id: Uuid) -> CodiResult<()> {
        let path = self.session_path(id);
        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn list(&self) -> CodiResult<Vec<Uuid>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(stem) = name.strip_suffix(".json") {
                    if let Ok(id) = Uuid::parse_str(stem) {
                        ids.push(id);
                    }
                }
            }
        }
        Ok(ids)
    }
}
