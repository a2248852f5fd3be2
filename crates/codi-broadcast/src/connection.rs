//! Gateway-side per-project connection registry.
//!
//! Transport-agnostic: the gateway crate owns the actual WebSocket and
//! implements [`BroadcastConnection`] around it. This registry only tracks
//! which connections are watching which project and fans messages out.

use async_trait::async_trait;
use codi_core::CodiResult;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One local connection subscribed to a project's broadcast stream.
#[async_trait]
pub trait BroadcastConnection: Send + Sync {
    /// Stable identifier for this connection, used for registry bookkeeping.
    fn id(&self) -> Uuid;

    /// Delivers `message` to this connection. A failure marks the
    /// connection for removal but never fails the broader broadcast.
    async fn send(&self, message: Value) -> CodiResult<()>;
}

/// In-process registry of connections grouped by the project they watch.
///
/// One instance per gateway process. Sends that fail for a particular
/// connection remove that connection but never abort delivery to the rest.
#[derive(Default)]
pub struct ConnectionRegistry {
    by_project: RwLock<HashMap<String, HashSet<Uuid>>>,
    connections: RwLock<HashMap<Uuid, Arc<dyn BroadcastConnection>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connection` as watching `project_id`.
    pub async fn connect(&self, connection: Arc<dyn BroadcastConnection>, project_id: &str) {
        let id = connection.id();
        self.connections.write().await.insert(id, connection);
        self.by_project.write().await.entry(project_id.to_string()).or_default().insert(id);
    }

    /// Removes a connection from every project it was watching.
    pub async fn disconnect(&self, id: Uuid) {
        self.connections.write().await.remove(&id);
        let mut by_project = self.by_project.write().await;
        for set in by_project.values_mut() {
            set.remove(&id);
        }
        by_project.retain(|_, set| !set.is_empty());
    }

    /// Delivers `message` to every connection currently watching
    /// `project_id`. Connections whose send fails are pruned, not retried.
    pub async fn send_to_local_connections(&self, project_id: &str, message: Value) {
        let ids: Vec<Uuid> = self.by_project.read().await.get(project_id).cloned().unwrap_or_default().into_iter().collect();
        if ids.is_empty() {
            return;
        }

        let connections: Vec<(Uuid, Arc<dyn BroadcastConnection>)> = {
            let guard = self.connections.read().await;
            ids.iter().filter_map(|id| guard.get(id).map(|c| (*id, Arc::clone(c)))).collect()
        };

        let mut failed = Vec::new();
        for (id, connection) in connections {
            if let Err(e) = connection.send(message.clone()).await {
                tracing::warn!(connection_id = %id, project_id = %project_id, error = %e, "dropping connection after failed send");
                failed.push(id);
            }
        }

        for id in failed {
            self.disconnect(id).await;
        }
    }

    /// Number of connections currently watching `project_id`.
    pub async fn connection_count(&self, project_id: &str) -> usize {
        self.by_project.read().await.get(project_id).map(HashSet::len).unwrap_or(0)
    }
}
