//! Inbound/outbound WebSocket message shapes and the dispatcher that turns
//! inbound frames into executor turns, pongs, or approval responses.

use crate::ws_approval::WsApprovalChannel;
use chrono::{DateTime, Utc};
use codi_broadcast::ConnectionRegistry;
use codi_core::approval::{ApprovalDecision, RiskLevel};
use codi_executor::{TurnInput, WorkflowExecutor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// A message received from a connected client.
///
/// Only the three inbound types the WebSocket surface accepts are modeled —
/// anything else fails to deserialize and is rejected by the caller.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Liveness check; answered with [`OutboundMessage::Pong`] directly to
    /// the sender.
    Ping,
    /// Submits a new user turn for a project.
    UserMessage {
        /// Project the turn is scoped to.
        project_id: String,
        /// User submitting the turn.
        user_id: String,
        /// Caller-supplied task id for correlating the turn.
        task_id: String,
        /// The message text.
        content: String,
    },
    /// Fulfils a pending human-in-the-loop approval request.
    UserInputResponse {
        /// The task id the original request named.
        task_id: String,
        /// Whether the reviewer approved the action.
        approved: bool,
        /// Optional reviewer-supplied reason.
        reason: Option<String>,
        /// Identifier of the reviewer.
        reviewer: String,
    },
}

/// A message the gateway itself constructs and sends to a client.
///
/// Other message types in the closed outbound vocabulary (`tool_execution`,
/// `file_operation`, `git_operation`, `build_status`, `build_progress`,
/// `deployment_complete`, `review_progress`, `review_issue`) originate in
/// worker processes and arrive pre-built over the broadcast bridge; the
/// gateway relays those verbatim rather than constructing them itself.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Reply to [`InboundMessage::Ping`].
    Pong {
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
    /// Acknowledges a submitted turn before the convergence loop runs.
    TaskSubmitted {
        /// The task id that was submitted.
        task_id: String,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
    /// Reports the outcome of a completed or cancelled turn.
    AgentStatus {
        /// `completed`, `blocked`, or `cancelled`.
        status: String,
        /// The executor's human-readable summary.
        summary: String,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
    /// Reports a turn that failed outright (rejected, not just unsatisfied).
    AgentError {
        /// Human-readable error message.
        message: String,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
    /// Asks a connected reviewer to approve or reject a pending action.
    UserInputRequired {
        /// The task id awaiting a decision.
        task_id: String,
        /// Human-readable description of the action.
        description: String,
        /// Assessed risk level.
        risk_level: RiskLevel,
        /// Additional context for the reviewer.
        context: String,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
}

impl OutboundMessage {
    /// Serializes to the JSON value the broadcast bridge and sockets expect.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"type": "agent_error", "message": "failed to encode message"}))
    }
}

/// Routes inbound WebSocket frames to the workflow executor or the
/// human-in-the-loop approval channel.
pub struct MessageRouter {
    executor: Arc<WorkflowExecutor>,
    connections: Arc<ConnectionRegistry>,
    approvals: Arc<WsApprovalChannel>,
}

impl MessageRouter {
    /// Builds a router over an executor, the connection registry it reports
    /// turn outcomes through, and the approval channel pending decisions
    /// are routed to.
    pub fn new(executor: Arc<WorkflowExecutor>, connections: Arc<ConnectionRegistry>, approvals: Arc<WsApprovalChannel>) -> Self {
        Self { executor, connections, approvals }
    }

    /// Dispatches one inbound message. `reply` answers request/response
    /// messages (`ping`) straight back to the originating connection;
    /// `user_message` outcomes instead fan out to every connection watching
    /// the project, since more than one client may be following along.
    pub async fn handle_message(&self, msg: InboundMessage, reply: &dyn Fn(OutboundMessage)) {
        match msg {
            InboundMessage::Ping => reply(OutboundMessage::Pong { timestamp: Utc::now() }),
            InboundMessage::UserMessage { project_id, user_id, task_id, content } => {
                self.submit_turn(project_id, user_id, task_id, content).await;
            }
            InboundMessage::UserInputResponse { task_id, approved, reason, reviewer } => {
                self.approvals.handle_approval_response(&task_id, ApprovalDecision { approved, reason, reviewer }).await;
            }
        }
    }

    async fn submit_turn(&self, project_id: String, user_id: String, task_id: String, content: String) {
        info!(project_id = %project_id, task_id = %task_id, "submitting turn");
        self.connections
            .send_to_local_connections(&project_id, OutboundMessage::TaskSubmitted { task_id: task_id.clone(), timestamp: Utc::now() }.to_value())
            .await;

        let executor = Arc::clone(&self.executor);
        let connections = Arc::clone(&self.connections);
        tokio::spawn(async move {
            let input = TurnInput { project_id: project_id.clone(), user_id, task_id, user_message: content, project_folder: None };
            let outcome = match executor.run_turn(input).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(project_id = %project_id, error = %e, "turn failed");
                    connections
                        .send_to_local_connections(&project_id, OutboundMessage::AgentError { message: e.to_string(), timestamp: Utc::now() }.to_value())
                        .await;
                    return;
                }
            };

            let status = if outcome.cancelled {
                "cancelled"
            } else if outcome.all_satisfied {
                "completed"
            } else {
                "blocked"
            };
            connections
                .send_to_local_connections(&project_id, OutboundMessage::AgentStatus { status: status.to_string(), summary: outcome.summary, timestamp: Utc::now() }.to_value())
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codi_artifacts::ArtifactStoreRegistry;
    use codi_sessions::SessionManager;
    use codi_signals::SignalEngine;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn make_router() -> MessageRouter {
        let executor = WorkflowExecutor::new(SessionManager::new(), Arc::new(ArtifactStoreRegistry::new()), Arc::new(SignalEngine::new()));
        let connections = Arc::new(ConnectionRegistry::new());
        let approvals = Arc::new(WsApprovalChannel::default_timeout(Arc::clone(&connections)));
        MessageRouter::new(executor, connections, approvals)
    }

    #[tokio::test]
    async fn ping_replies_directly_with_pong() {
        let router = make_router();
        let replies = Arc::new(std::sync::Mutex::new(Vec::new()));
        let replies_clone = Arc::clone(&replies);

        router.handle_message(InboundMessage::Ping, &move |msg| replies_clone.lock().unwrap().push(msg)).await;

        let replies = replies.lock().unwrap();
        assert!(matches!(replies.as_slice(), [OutboundMessage::Pong { .. }]));
    }

    #[tokio::test]
    async fn user_message_acknowledges_with_task_submitted() {
        let router = make_router();
        let seen = Arc::new(AtomicUsize::new(0));

        struct Probe {
            id: uuid::Uuid,
            seen: Arc<AtomicUsize>,
        }
        #[async_trait::async_trait]
        impl codi_broadcast::BroadcastConnection for Probe {
            fn id(&self) -> uuid::Uuid {
                self.id
            }
            async fn send(&self, _message: serde_json::Value) -> codi_core::CodiResult<()> {
                self.seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
        router.connections.connect(Arc::new(Probe { id: uuid::Uuid::new_v4(), seen: Arc::clone(&seen) }), "proj-1").await;

        router
            .handle_message(
                InboundMessage::UserMessage { project_id: "proj-1".to_string(), user_id: "user-1".to_string(), task_id: "task-1".to_string(), content: "hi".to_string() },
                &|_| {},
            )
            .await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.load(Ordering::SeqCst) >= 1);
    }
}
