//! Session data model.

use codi_core::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use chrono::{DateTime, Utc};

/// Where a session stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Actively receiving messages; never pruned by TTL.
    Active,
    /// Not currently active but recent; eligible for pruning once stale.
    Idle,
    /// Reached a terminal state.
    Completed,
}

/// Conversational state for one agent invocation, with parent/child lineage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// The session that spawned this one, if any.
    pub parent_id: Option<Uuid>,
    /// Name of the agent running this session.
    pub agent: String,
    /// Project this session belongs to, if scoped to one.
    pub project_id: Option<String>,
    /// User who owns this session, if attributable to one.
    pub user_id: Option<String>,
    /// Background task this session backs, if launched as one.
    pub task_id: Option<Uuid>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last mutated.
    pub updated_at: DateTime<Utc>,
    /// Optional human-readable title.
    pub title: Option<String>,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Conversation history, bounded by the manager's message cap.
    pub messages: Vec<Message>,
    /// Skills made available within this session.
    pub active_skills: Vec<String>,
    /// Optional grouping category.
    pub category: Option<String>,
    /// Arbitrary metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Input to [`crate::manager::SessionManager::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateSessionInput {
    /// Parent session, if this is a subagent session.
    pub parent_id: Option<Uuid>,
    /// Agent name running this session.
    pub agent: String,
    /// Project scope.
    pub project_id: Option<String>,
    /// Owning user.
    pub user_id: Option<String>,
    /// Backing background task, if any.
    pub task_id: Option<Uuid>,
    /// Optional title.
    pub title: Option<String>,
    /// Optional category.
    pub category: Option<String>,
    /// Skills to make available.
    pub active_skills: Vec<String>,
}

/// Filters accepted by [`crate::manager::SessionManager::list_sessions`].
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Restrict to a project.
    pub project_id: Option<String>,
    /// Restrict to a user.
    pub user_id: Option<String>,
    /// Restrict to a status.
    pub status: Option<SessionStatus>,
}

impl SessionFilter {
    fn matches(&self, session: &Session) -> bool {
        if let Some(project_id) = &self.project_id {
            if session.project_id.as_deref() != Some(project_id.as_str()) {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            if session.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if session.status != status {
                return false;
            }
        }
        true
    }

    pub(crate) fn filter<'a>(&self, sessions: impl Iterator<Item = &'a Session>) -> Vec<&'a Session> {
        sessions.filter(|s| self.matches(s)).collect()
    }
}
