//! In-memory [`PersistencePort`], useful for tests and for processes that
//! want the port satisfied without committing to a storage backend yet.

use async_trait::async_trait;
use codi_core::ports::PersistencePort;
use codi_core::CodiResult;
use serde_json::Value;
use tokio::sync::RwLock;

/// Collects every record passed to it in memory. Nothing survives a
/// process restart.
#[derive(Default)]
pub struct InMemoryPersistence {
    operation_logs: RwLock<Vec<(String, Value)>>,
    agent_tasks: RwLock<Vec<(String, Value)>>,
}

impl InMemoryPersistence {
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation log entry recorded so far, for a given project.
    pub async fn operation_logs_for(&self, project_id: &str) -> Vec<Value> {
        self.operation_logs.read().await.iter().filter(|(p, _)| p == project_id).map(|(_, v)| v.clone()).collect()
    }

    /// The most recent state recorded for a task, if any.
    pub async fn latest_task_state(&self, task_id: &str) -> Option<Value> {
        self.agent_tasks.read().await.iter().rev().find(|(id, _)| id == task_id).map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl PersistencePort for InMemoryPersistence {
    async fn insert_operation_log(&self, project_id: &str, entry: Value) -> CodiResult<()> {
        self.operation_logs.write().await.push((project_id.to_string(), entry));
        Ok(())
    }

    async fn upsert_agent_task(&self, task_id: &str, state: Value) -> CodiResult<()> {
        self.agent_tasks.write().await.push((task_id.to_string(), state));
        Ok(())
    }
}
