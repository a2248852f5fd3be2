//! File-backed [`PersistencePort`]: append-only JSONL logs, one per
//! project for operation logs and one shared file for task state.
//!
//! Adequate for a single-process deployment; not a substitute for a real
//! relational store. The core runs correctly with no persistence port
//! configured at all — this is the optional, concrete implementation a
//! process wires in when it wants durability across restarts.

use async_trait::async_trait;
use codi_core::ports::PersistencePort;
use codi_core::{CodiError, CodiResult};
use serde_json::Value;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends operation-log and task-state records to JSONL files under a
/// root directory.
pub struct FilePersistence {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePersistence {
    /// Opens (creating if needed) a persistence backend rooted at `root`.
    pub async fn new(root: PathBuf) -> CodiResult<Self> {
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root, write_lock: Mutex::new(()) })
    }

    fn operation_log_path(&self, project_id: &str) -> PathBuf {
        self.root.join(format!("{project_id}.operations.jsonl"))
    }

    fn task_state_path(&self) -> PathBuf {
        self.root.join("agent_tasks.jsonl")
    }

    async fn append_line(&self, path: &PathBuf, line: &str) -> CodiResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl PersistencePort for FilePersistence {
    async fn insert_operation_log(&self, project_id: &str, entry: Value) -> CodiResult<()> {
        let line = serde_json::to_string(&entry).map_err(CodiError::from)?;
        self.append_line(&self.operation_log_path(project_id), &line).await
    }

    async fn upsert_agent_task(&self, task_id: &str, state: Value) -> CodiResult<()> {
        let record = serde_json::json!({ "task_id": task_id, "state": state, "updated_at": chrono::Utc::now() });
        let line = serde_json::to_string(&record).map_err(CodiError::from)?;
        self.append_line(&self.task_state_path(), &line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_operation_log_appends_a_jsonl_line() {
        let tmp = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(tmp.path().to_path_buf()).await.unwrap();

        persistence.insert_operation_log("proj-1", serde_json::json!({"operation_type": "file_write"})).await.unwrap();
        persistence.insert_operation_log("proj-1", serde_json::json!({"operation_type": "build"})).await.unwrap();

        let contents = tokio::fs::read_to_string(tmp.path().join("proj-1.operations.jsonl")).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[tokio::test]
    async fn upsert_agent_task_appends_to_shared_task_log() {
        let tmp = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(tmp.path().to_path_buf()).await.unwrap();

        persistence.upsert_agent_task("task-1", serde_json::json!({"status": "running"})).await.unwrap();
        let contents = tokio::fs::read_to_string(tmp.path().join("agent_tasks.jsonl")).await.unwrap();
        assert!(contents.contains("task-1"));
    }

    #[tokio::test]
    async fn operation_logs_are_scoped_per_project() {
        let tmp = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(tmp.path().to_path_buf()).await.unwrap();

        persistence.insert_operation_log("proj-1", serde_json::json!({"a": 1})).await.unwrap();
        persistence.insert_operation_log("proj-2", serde_json::json!({"a": 2})).await.unwrap();

        assert!(tmp.path().join("proj-1.operations.jsonl").exists());
        assert!(tmp.path().join("proj-2.operations.jsonl").exists());
    }
}
