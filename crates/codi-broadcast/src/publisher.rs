//! Publisher side of the bridge: any process can hand a message to Redis
//! without knowing who, if anyone, is listening.

use crate::channels::{signal_channel, WEBSOCKET_CHANNEL};
use async_trait::async_trait;
use codi_core::ports::BroadcastPort;
use codi_core::{CodiError, CodiResult};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;

/// Publishes progress events and signals onto the shared Redis bus.
///
/// Cheap to clone — `ConnectionManager` multiplexes over a single
/// connection and reconnects transparently.
#[derive(Clone)]
pub struct RedisBroadcastPublisher {
    conn: ConnectionManager,
}

impl RedisBroadcastPublisher {
    /// Connects to `redis_url` and wraps the connection for publishing.
    pub async fn connect(redis_url: &str) -> CodiResult<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| CodiError::Broadcast(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CodiError::Broadcast(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl BroadcastPort for RedisBroadcastPublisher {
    async fn publish(&self, project_id: &str, mut message: Value) -> CodiResult<()> {
        if let Value::Object(map) = &mut message {
            map.entry("timestamp").or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));
        }

        let envelope = serde_json::json!({ "project_id": project_id, "message": message });
        let payload = serde_json::to_string(&envelope).map_err(CodiError::from)?;

        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(WEBSOCKET_CHANNEL, payload)
            .await
            .map_err(|e| CodiError::Broadcast(e.to_string()))
    }

    async fn send_agent_signal(&self, project_id: &str, signal_type: &str, data: Value) -> CodiResult<()> {
        let envelope = serde_json::json!({ "signal_type": signal_type, "data": data });
        let payload = serde_json::to_string(&envelope).map_err(CodiError::from)?;

        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(signal_channel(project_id), payload)
            .await
            .map_err(|e| CodiError::Broadcast(e.to_string()))
    }
}
