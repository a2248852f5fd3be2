//! The artifact store: a project's single source of truth for working
//! artifacts during a run.

use crate::model::{Artifact, ArtifactStatus, ArtifactType};
use codi_core::{CodiError, CodiResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A project's in-memory + on-disk artifact cache.
///
/// Instances are never reached through a process-global singleton: the
/// executor constructs one per project at bootstrap and threads it
/// explicitly to every agent and the evaluator. Multiple concurrent turns
/// for the same project share the same store instance.
pub struct ArtifactStore {
    project_id: String,
    artifacts_dir: Option<PathBuf>,
    cache: RwLock<HashMap<Uuid, Artifact>>,
}

impl ArtifactStore {
    /// Creates a store scoped to `project_id`. When `project_path` is given,
    /// file-type artifacts are additionally persisted under
    /// `<project_path>/.codi/artifacts/<id>.json`.
    pub fn new(project_id: impl Into<String>, project_path: Option<PathBuf>) -> Self {
        Self {
            project_id: project_id.into(),
            artifacts_dir: project_path.map(|p| p.join(".codi").join("artifacts")),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The project this store is scoped to.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Persists an artifact: caches it, writes file-type artifacts to disk,
    /// and returns it back to the caller.
    pub async fn persist(&self, mut artifact: Artifact) -> CodiResult<Artifact> {
        if artifact.project_id.is_empty() {
            artifact.project_id = self.project_id.clone();
        }

        if artifact.artifact_type == ArtifactType::File {
            self.persist_to_fs(&artifact).await?;
        }

        let mut cache = self.cache.write().await;
        cache.insert(artifact.id, artifact.clone());
        tracing::debug!(artifact_id = %artifact.id, artifact_type = ?artifact.artifact_type, "persisted artifact");
        Ok(artifact)
    }

    /// Persists several artifacts in order.
    pub async fn persist_batch(&self, artifacts: Vec<Artifact>) -> CodiResult<Vec<Artifact>> {
        let mut out = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            out.push(self.persist(artifact).await?);
        }
        Ok(out)
    }

    /// Looks up an artifact by id, checking the cache and then disk.
    pub async fn get(&self, id: Uuid) -> Option<Artifact> {
        if let Some(artifact) = self.cache.read().await.get(&id).cloned() {
            return Some(artifact);
        }
        let loaded = self.load_from_fs(id).await?;
        self.cache.write().await.insert(id, loaded.clone());
        Some(loaded)
    }

    /// Returns artifacts of a type, optionally filtered by status, sorted by
    /// `created_at` descending and capped at `limit`.
    pub async fn get_by_type(
        &self,
        artifact_type: ArtifactType,
        status: Option<ArtifactStatus>,
        limit: usize,
    ) -> Vec<Artifact> {
        let cache = self.cache.read().await;
        let mut matches: Vec<Artifact> = cache
            .values()
            .filter(|a| a.artifact_type == artifact_type)
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit);
        matches
    }

    /// Returns artifacts written by a producer, optionally filtered by type.
    pub async fn get_by_producer(
        &self,
        producer: &str,
        artifact_type: Option<ArtifactType>,
        limit: usize,
    ) -> Vec<Artifact> {
        let cache = self.cache.read().await;
        let mut matches: Vec<Artifact> = cache
            .values()
            .filter(|a| a.producer == producer)
            .filter(|a| artifact_type.map_or(true, |t| a.artifact_type == t))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit);
        matches
    }

    /// Returns the most recent active artifact of a type, optionally
    /// filtered by producer.
    pub async fn get_latest(&self, artifact_type: ArtifactType, producer: Option<&str>) -> Option<Artifact> {
        let matches = self.get_by_type(artifact_type, Some(ArtifactStatus::Active), usize::MAX).await;
        matches.into_iter().find(|a| producer.map_or(true, |p| a.producer == p))
    }

    /// Whether an artifact matching the criteria exists.
    pub async fn exists(
        &self,
        artifact_type: ArtifactType,
        producer: Option<&str>,
        status: ArtifactStatus,
    ) -> bool {
        let matches = self.get_by_type(artifact_type, Some(status), 1).await;
        matches.into_iter().any(|a| producer.map_or(true, |p| a.producer == p))
    }

    /// Marks `id` superseded and persists a new active artifact replacing it.
    /// Returns `None` without error if `id` is unknown — the original
    /// Python store treats this as a no-op, not a failure.
    pub async fn supersede(
        &self,
        id: Uuid,
        new_content: crate::model::ArtifactContent,
        extra_metadata: HashMap<String, serde_json::Value>,
    ) -> CodiResult<Option<Artifact>> {
        let Some(mut old) = self.get(id).await else {
            return Ok(None);
        };
        let next = old.supersede(new_content, extra_metadata);
        old.status = ArtifactStatus::Superseded;
        self.persist(old).await?;
        let persisted = self.persist(next).await?;
        Ok(Some(persisted))
    }

    /// Marks an artifact invalid. Returns whether it existed.
    pub async fn invalidate(&self, id: Uuid) -> CodiResult<bool> {
        let Some(mut artifact) = self.get(id).await else {
            return Ok(false);
        };
        artifact.status = ArtifactStatus::Invalid;
        self.persist(artifact).await?;
        Ok(true)
    }

    async fn persist_to_fs(&self, artifact: &Artifact) -> CodiResult<()> {
        let Some(dir) = &self.artifacts_dir else {
            return Ok(());
        };
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.json", artifact.id));
        let json = serde_json::to_string_pretty(artifact)
            .map_err(|e| CodiError::Artifact(format!("failed to encode artifact: {e}")))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn load_from_fs(&self, id: Uuid) -> Option<Artifact> {
        let dir = self.artifacts_dir.as_ref()?;
        let path = dir.join(format!("{id}.json"));
        let raw = tokio::fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                tracing::warn!(artifact_id = %id, error = %e, "failed to load artifact from fs");
                None
            }
        }
    }
}

/// Explicit, non-singleton registry of per-project artifact stores.
///
/// Replaces the module-level `_stores`/`get_artifact_store` registry
/// anti-pattern: the executor constructs exactly one registry at bootstrap
/// and hands it to whatever needs to look up or create a project's store.
pub struct ArtifactStoreRegistry {
    stores: RwLock<HashMap<String, Arc<ArtifactStore>>>,
}

impl ArtifactStoreRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the store for `project_id`, creating it if absent.
    pub async fn get_or_create(&self, project_id: &str, project_path: Option<PathBuf>) -> Arc<ArtifactStore> {
        if let Some(store) = self.stores.read().await.get(project_id) {
            return Arc::clone(store);
        }
        let mut stores = self.stores.write().await;
        let entry = stores
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(ArtifactStore::new(project_id, project_path)));
        Arc::clone(entry)
    }
}

impl Default for ArtifactStoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}
