//! The gateway's [`codi_broadcast::BroadcastConnection`] implementation:
//! wraps one live WebSocket's outbound channel.

use async_trait::async_trait;
use codi_broadcast::BroadcastConnection;
use codi_core::{CodiError, CodiResult};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

/// One connected WebSocket client, addressable by the connection registry.
pub struct WsConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

impl WsConnection {
    /// Wraps a channel that forwards text frames to a live socket.
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { id: Uuid::new_v4(), tx }
    }
}

#[async_trait]
impl BroadcastConnection for WsConnection {
    fn id(&self) -> Uuid {
        self.id
    }

    async fn send(&self, message: Value) -> CodiResult<()> {
        let text = serde_json::to_string(&message).map_err(CodiError::from)?;
        self.tx.send(text).map_err(|_| CodiError::Gateway("connection closed".to_string()))
    }
}
