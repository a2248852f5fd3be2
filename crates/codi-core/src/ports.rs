//! Narrow port traits for the external systems the core talks to.
//!
//! Each trait models the smallest interface the core needs, not the full
//! surface of the backing system. Implementations live in their own crates
//! (`codi-persistence`, `codi-broadcast`) and are wired in at bootstrap —
//! nothing here reaches for a global or a singleton constructor.

use crate::CodiResult;
use async_trait::async_trait;
use serde_json::Value;

/// Durable storage for operation logs and task state.
///
/// Entirely optional: a deployment with no persistence port configured still
/// runs correctly, it just has no durability across restarts.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Appends a line to the append-only operation log.
    async fn insert_operation_log(&self, project_id: &str, entry: Value) -> CodiResult<()>;

    /// Upserts the latest known state of a background task.
    async fn upsert_agent_task(&self, task_id: &str, state: Value) -> CodiResult<()>;
}

/// Outbound bridge to whatever fans messages out to connected clients.
#[async_trait]
pub trait BroadcastPort: Send + Sync {
    /// Publishes a message addressed to every connection watching a project.
    async fn publish(&self, project_id: &str, message: Value) -> CodiResult<()>;

    /// Publishes a signal notification on the project's signal channel.
    async fn send_agent_signal(&self, project_id: &str, signal_type: &str, data: Value) -> CodiResult<()>;
}
