//! WebSocket-based human approval channel for human-in-the-loop workflows.
//!
//! Sends approval requests to every connection watching the request's
//! project as a `user_input_required` message and waits for a matching
//! `user_input_response` to arrive back through [`WsApprovalChannel::handle_approval_response`].

use crate::router::OutboundMessage;
use async_trait::async_trait;
use codi_broadcast::ConnectionRegistry;
use codi_core::approval::{ApprovalChannel, ApprovalDecision, ApprovalRequest};
use codi_core::CodiResult;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tracing::{info, warn};

/// Routes approval requests to connected clients over the shared connection
/// registry and resolves them against responses routed in by the router.
pub struct WsApprovalChannel {
    connections: Arc<ConnectionRegistry>,
    pending: RwLock<HashMap<String, oneshot::Sender<ApprovalDecision>>>,
    timeout: Duration,
}

impl WsApprovalChannel {
    /// Builds a channel with an explicit reviewer-response timeout.
    pub fn new(connections: Arc<ConnectionRegistry>, timeout: Duration) -> Self {
        Self { connections, pending: RwLock::new(HashMap::new()), timeout }
    }

    /// Builds a channel with a 5-minute default timeout.
    pub fn default_timeout(connections: Arc<ConnectionRegistry>) -> Self {
        Self::new(connections, Duration::from_secs(300))
    }

    /// Delivers a reviewer's decision to the pending request it answers, if
    /// any is still waiting. Silently drops responses with no match — the
    /// request may already have timed out.
    pub async fn handle_approval_response(&self, task_id: &str, decision: ApprovalDecision) {
        let mut pending = self.pending.write().await;
        if let Some(tx) = pending.remove(task_id) {
            if tx.send(decision).is_err() {
                warn!(task_id = %task_id, "approval response delivered but receiver dropped");
            } else {
                info!(task_id = %task_id, "approval response delivered");
            }
        } else {
            warn!(task_id = %task_id, "no pending approval for this task_id");
        }
    }

    /// Number of approval requests still awaiting a reviewer decision.
    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}

#[async_trait]
impl ApprovalChannel for WsApprovalChannel {
    async fn request_approval(&self, request: ApprovalRequest) -> CodiResult<ApprovalDecision> {
        let task_id = request.task_id.clone();
        let (tx, rx) = oneshot::channel();
        self.pending.write().await.insert(task_id.clone(), tx);

        let message = OutboundMessage::UserInputRequired {
            task_id: task_id.clone(),
            description: request.description,
            risk_level: request.risk_level,
            context: request.context,
            timestamp: chrono::Utc::now(),
        };
        info!(task_id = %task_id, project_id = %request.project_id, "broadcasting approval request");
        self.connections.send_to_local_connections(&request.project_id, message.to_value()).await;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(decision)) => {
                info!(task_id = %task_id, approved = decision.approved, reviewer = %decision.reviewer, "approval decision received");
                Ok(decision)
            }
            Ok(Err(_)) => {
                self.pending.write().await.remove(&task_id);
                Ok(ApprovalDecision { approved: false, reason: Some("approval channel closed unexpectedly".to_string()), reviewer: "system".to_string() })
            }
            Err(_) => {
                self.pending.write().await.remove(&task_id);
                warn!(task_id = %task_id, timeout_secs = self.timeout.as_secs(), "approval timed out");
                Ok(ApprovalDecision { approved: false, reason: Some(format!("timed out after {}s", self.timeout.as_secs())), reviewer: "system".to_string() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codi_core::approval::RiskLevel;

    fn request(task_id: &str) -> ApprovalRequest {
        ApprovalRequest { project_id: "proj-1".to_string(), task_id: task_id.to_string(), description: "deploy prod".to_string(), risk_level: RiskLevel::High, context: String::new() }
    }

    #[tokio::test]
    async fn approval_request_resolves_with_the_delivered_decision() {
        let channel = Arc::new(WsApprovalChannel::new(Arc::new(ConnectionRegistry::new()), Duration::from_secs(5)));

        let ch = Arc::clone(&channel);
        let handle = tokio::spawn(async move { ch.request_approval(request("task-1")).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        channel.handle_approval_response("task-1", ApprovalDecision { approved: true, reason: Some("looks good".to_string()), reviewer: "admin".to_string() }).await;

        let result = handle.await.unwrap().unwrap();
        assert!(result.approved);
        assert_eq!(result.reviewer, "admin");
    }

    #[tokio::test]
    async fn approval_request_times_out_when_no_response_arrives() {
        let channel = WsApprovalChannel::new(Arc::new(ConnectionRegistry::new()), Duration::from_millis(50));
        let result = channel.request_approval(request("task-timeout")).await.unwrap();
        assert!(!result.approved);
        assert!(result.reason.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn response_with_no_matching_request_is_silently_dropped() {
        let channel = WsApprovalChannel::new(Arc::new(ConnectionRegistry::new()), Duration::from_secs(5));
        channel.handle_approval_response("nonexistent", ApprovalDecision { approved: true, reason: None, reviewer: "ghost".to_string() }).await;
        assert_eq!(channel.pending_count().await, 0);
    }

    #[tokio::test]
    async fn two_pending_requests_resolve_independently() {
        let channel = Arc::new(WsApprovalChannel::new(Arc::new(ConnectionRegistry::new()), Duration::from_secs(5)));

        let ch1 = Arc::clone(&channel);
        let h1 = tokio::spawn(async move { ch1.request_approval(request("t1")).await });
        let ch2 = Arc::clone(&channel);
        let h2 = tokio::spawn(async move { ch2.request_approval(request("t2")).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(channel.pending_count().await, 2);

        channel.handle_approval_response("t2", ApprovalDecision { approved: false, reason: Some("no".to_string()), reviewer: "r2".to_string() }).await;
        channel.handle_approval_response("t1", ApprovalDecision { approved: true, reason: None, reviewer: "r1".to_string() }).await;

        let r1 = h1.await.unwrap().unwrap();
        let r2 = h2.await.unwrap().unwrap();
        assert!(r1.approved);
        assert!(!r2.approved);
    }
}
