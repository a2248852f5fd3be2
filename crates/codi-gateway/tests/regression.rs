#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Regression tests for codi-gateway: connection isolation across projects
//! and WebSocket disconnect cleanup.

use codi_artifacts::ArtifactStoreRegistry;
use codi_broadcast::ConnectionRegistry;
use codi_executor::{TurnBudgets, WorkflowExecutor};
use codi_gateway::{GatewayServer, WsApprovalChannel};
use codi_sessions::SessionManager;
use codi_signals::SignalEngine;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

async fn start_test_server() -> (String, Arc<ConnectionRegistry>) {
    let connections = Arc::new(ConnectionRegistry::new());
    let executor = WorkflowExecutor::with_budgets(
        SessionManager::new(),
        Arc::new(ArtifactStoreRegistry::new()),
        Arc::new(SignalEngine::new()),
        None,
        TurnBudgets { timeout: Duration::from_millis(200), poll_interval: Duration::from_millis(5), max_iterations: 10 },
    );
    let approvals = Arc::new(WsApprovalChannel::default_timeout(Arc::clone(&connections)));
    let app = GatewayServer::build(executor, Arc::clone(&connections), approvals);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("127.0.0.1:{}", addr.port()), connections)
}

#[tokio::test]
async fn connecting_registers_under_the_path_project_id() {
    let (addr, connections) = start_test_server().await;
    let (_ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/proj-a")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(connections.connection_count("proj-a").await, 1);
    assert_eq!(connections.connection_count("proj-b").await, 0);
}

#[tokio::test]
async fn a_message_sent_to_one_project_never_reaches_another() {
    let (addr, connections) = start_test_server().await;
    let (mut ws_a, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/proj-a")).await.unwrap();
    let (mut ws_b, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/proj-b")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    connections.send_to_local_connections("proj-a", serde_json::json!({"type": "agent_status", "status": "completed", "summary": "done"})).await;

    let received = ws_a.next().await.unwrap().unwrap();
    let received: serde_json::Value = serde_json::from_str(received.to_text().unwrap()).unwrap();
    assert_eq!(received["status"], "completed");

    ws_b.send(Message::Text(serde_json::json!({"type": "ping"}).to_string())).await.unwrap();
    let pong = ws_b.next().await.unwrap().unwrap();
    let pong: serde_json::Value = serde_json::from_str(pong.to_text().unwrap()).unwrap();
    assert_eq!(pong["type"], "pong");
}

#[tokio::test]
async fn disconnecting_drops_the_connection_from_the_registry() {
    let (addr, connections) = start_test_server().await;
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/proj-c")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connections.connection_count("proj-c").await, 1);

    drop(ws);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(connections.connection_count("proj-c").await, 0);
}
