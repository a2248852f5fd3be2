//! Gateway-side subscriber: listens on the well-known channel and fans
//! each envelope out to local connections via the [`ConnectionRegistry`].

use crate::channels::WEBSOCKET_CHANNEL;
use crate::connection::ConnectionRegistry;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;

/// Connects to Redis, subscribes to [`WEBSOCKET_CHANNEL`], and dispatches
/// every received envelope to `registry`. Runs until the task is aborted or
/// the connection is irrecoverably lost; a dropped connection is retried
/// after a short backoff rather than ending the listener.
pub async fn start_subscriber(redis_url: String, registry: Arc<ConnectionRegistry>) {
    loop {
        if let Err(e) = listen_once(&redis_url, &registry).await {
            tracing::error!(error = %e, "broadcast subscriber lost connection, retrying");
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn listen_once(redis_url: &str, registry: &Arc<ConnectionRegistry>) -> redis::RedisResult<()> {
    let client = redis::Client::open(redis_url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(WEBSOCKET_CHANNEL).await?;

    tracing::info!(channel = WEBSOCKET_CHANNEL, "broadcast subscriber connected");
    let mut stream = pubsub.on_message();

    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "broadcast message was not a valid payload");
                continue;
            }
        };

        dispatch(&payload, registry).await;
    }

    Ok(())
}

async fn dispatch(payload: &str, registry: &Arc<ConnectionRegistry>) {
    let envelope: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "discarding malformed broadcast envelope");
            return;
        }
    };

    let Some(project_id) = envelope.get("project_id").and_then(|v| v.as_str()) else {
        tracing::warn!("broadcast envelope missing project_id");
        return;
    };
    let Some(message) = envelope.get("message") else {
        tracing::warn!(project_id, "broadcast envelope missing message");
        return;
    };

    registry.send_to_local_connections(project_id, message.clone()).await;
}
