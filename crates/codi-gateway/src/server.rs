//! Gateway server builder: the Axum app exposing the per-project WebSocket
//! surface and wiring it to the workflow executor and broadcast bridge.

use crate::connection::WsConnection;
use crate::router::{InboundMessage, MessageRouter, OutboundMessage};
use crate::ws_approval::WsApprovalChannel;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use codi_broadcast::{BroadcastConnection, ConnectionRegistry};
use codi_executor::WorkflowExecutor;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Shared application state handed to every route handler.
struct AppState {
    router: Arc<MessageRouter>,
    connections: Arc<ConnectionRegistry>,
}

/// Builds the gateway's WebSocket surface.
///
/// No auth, REST, or webhook routes — this is the WebSocket-and-connection-
/// registry surface only; everything else a deployment needs sits in front
/// of or alongside this router.
pub struct GatewayServer;

impl GatewayServer {
    /// Builds the Axum router. `connections` is shared with whatever starts
    /// [`codi_broadcast::start_subscriber`] for this process, so Redis-origin
    /// broadcasts and locally-terminated WebSockets reach the same sockets.
    pub fn build(executor: Arc<WorkflowExecutor>, connections: Arc<ConnectionRegistry>, approvals: Arc<WsApprovalChannel>) -> Router {
        let router = Arc::new(MessageRouter::new(executor, Arc::clone(&connections), approvals));
        let state = Arc::new(AppState { router, connections });

        Router::new().route("/ws/:project_id", get(ws_handler)).route("/health", get(health_handler)).with_state(state)
    }
}

async fn health_handler() -> impl IntoResponse {
    serde_json::json!({"status": "ok", "service": "codi"}).to_string()
}

async fn ws_handler(ws: WebSocketUpgrade, Path(project_id): Path<String>, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, project_id, state))
}

async fn handle_socket(socket: WebSocket, project_id: String, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let connection = Arc::new(WsConnection::new(tx.clone()));
    let connection_id = connection.id();
    state.connections.connect(connection, &project_id).await;
    info!(connection_id = %connection_id, project_id = %project_id, "websocket connected");

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(WsMessage::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    let router = Arc::clone(&state.router);
    let reply_tx = tx;
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                WsMessage::Text(text) => {
                    let inbound: InboundMessage = match serde_json::from_str(&text) {
                        Ok(m) => m,
                        Err(e) => {
                            warn!(error = %e, "dropping unparseable inbound message");
                            continue;
                        }
                    };
                    let reply_tx = reply_tx.clone();
                    router
                        .handle_message(inbound, &move |out: OutboundMessage| {
                            if let Ok(json) = serde_json::to_string(&out) {
                                let _ = reply_tx.send(json);
                            }
                        })
                        .await;
                }
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.connections.disconnect(connection_id).await;
    info!(connection_id = %connection_id, project_id = %project_id, "websocket disconnected");
}
