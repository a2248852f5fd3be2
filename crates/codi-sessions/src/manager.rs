//! The session manager: lifecycle, lineage, message-cap eviction, and TTL
//! pruning for conversational sessions.

use crate::model::{CreateSessionInput, Session, SessionFilter, SessionStatus};
use codi_core::{CodiError, CodiResult, Message, Role};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// How long a non-active session may go unmodified before it is eligible
/// for pruning.
pub const DEFAULT_TTL: StdDuration = StdDuration::from_secs(2 * 60 * 60);

/// Maximum number of non-`system` messages retained per session.
pub const DEFAULT_MAX_MESSAGES: usize = 50;

/// Tunable limits for a [`SessionManager`].
#[derive(Debug, Clone, Copy)]
pub struct SessionManagerConfig {
    /// Sessions idle longer than this become eligible for pruning.
    pub ttl: StdDuration,
    /// Cap on non-`system` messages retained per session.
    pub max_messages: usize,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL, max_messages: DEFAULT_MAX_MESSAGES }
    }
}

/// Holds conversational state for ongoing and recently completed agent
/// invocations. Constructed explicitly — never a lazily-initialized global.
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Session>>,
    config: SessionManagerConfig,
}

impl SessionManager {
    /// Builds a manager with the default TTL and message cap.
    pub fn new() -> Arc<Self> {
        Self::with_config(SessionManagerConfig::default())
    }

    /// Builds a manager with explicit limits.
    pub fn with_config(config: SessionManagerConfig) -> Arc<Self> {
        Arc::new(Self { sessions: RwLock::new(HashMap::new()), config })
    }

    /// Creates a new session.
    pub async fn create(&self, input: CreateSessionInput) -> Session {
        let now = chrono::Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            parent_id: input.parent_id,
            agent: input.agent,
            project_id: input.project_id,
            user_id: input.user_id,
            task_id: input.task_id,
            created_at: now,
            updated_at: now,
            title: input.title,
            status: SessionStatus::Active,
            messages: Vec::new(),
            active_skills: input.active_skills,
            category: input.category,
            metadata: HashMap::new(),
        };
        self.sessions.write().await.insert(session.id, session.clone());
        session
    }

    /// Looks up a session by id.
    pub async fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Finds the active root session (no parent) scoped to `(project_id,
    /// user_id, agent)`, or creates one if none exists.
    pub async fn get_or_create(&self, project_id: &str, user_id: &str, agent: &str) -> Session {
        {
            let sessions = self.sessions.read().await;
            if let Some(existing) = sessions.values().find(|s| {
                s.parent_id.is_none()
                    && s.status == SessionStatus::Active
                    && s.project_id.as_deref() == Some(project_id)
                    && s.user_id.as_deref() == Some(user_id)
                    && s.agent == agent
            }) {
                return existing.clone();
            }
        }
        self.create(CreateSessionInput {
            agent: agent.to_string(),
            project_id: Some(project_id.to_string()),
            user_id: Some(user_id.to_string()),
            ..Default::default()
        })
        .await
    }

    /// Direct children of `parent_id`.
    pub async fn get_children(&self, parent_id: Uuid) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.parent_id == Some(parent_id))
            .cloned()
            .collect()
    }

    /// All sessions currently marked active.
    pub async fn get_active_sessions(&self) -> Vec<Session> {
        self.sessions.read().await.values().filter(|s| s.status == SessionStatus::Active).cloned().collect()
    }

    /// Whether `id` names a session with a parent (i.e. a subagent session).
    pub async fn is_subagent_session(&self, id: Uuid) -> bool {
        self.sessions.read().await.get(&id).is_some_and(|s| s.parent_id.is_some())
    }

    /// Appends a message, enforcing the message-cap eviction policy: when
    /// appending exceeds the cap, the oldest non-`system` messages are
    /// dropped first. `system` messages are never evicted.
    pub async fn add_message(
        &self,
        id: Uuid,
        role: Role,
        content: impl Into<String>,
        agent: Option<String>,
        tool_calls: Vec<codi_core::ToolCall>,
    ) -> CodiResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| CodiError::SessionNotFound(id.to_string()))?;

        let mut message = Message::new(role, content, id);
        message.agent = agent;
        message.tool_calls = tool_calls;
        session.messages.push(message);
        session.updated_at = chrono::Utc::now();

        enforce_message_cap(session, self.config.max_messages);
        Ok(())
    }

    /// Updates a session's lifecycle status.
    pub async fn update_status(&self, id: Uuid, status: SessionStatus) -> CodiResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| CodiError::SessionNotFound(id.to_string()))?;
        session.status = status;
        session.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Removes a session outright.
    pub async fn delete(&self, id: Uuid) -> CodiResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id).ok_or_else(|| CodiError::SessionNotFound(id.to_string()))?;
        Ok(())
    }

    /// Removes non-active sessions idle past the TTL, except those with a
    /// remaining descendant. Returns the number of sessions removed.
    pub async fn prune_stale_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = chrono::Utc::now();

        let parents_with_children: HashSet<Uuid> =
            sessions.values().filter_map(|s| s.parent_id).collect();

        let stale: Vec<Uuid> = sessions
            .values()
            .filter(|s| {
                s.status != SessionStatus::Active
                    && now.signed_duration_since(s.updated_at).to_std().map(|d| d > self.config.ttl).unwrap_or(false)
                    && !parents_with_children.contains(&s.id)
            })
            .map(|s| s.id)
            .collect();

        for id in &stale {
            sessions.remove(id);
        }
        stale.len()
    }

    /// The session's own messages prefixed by its ancestors' messages, root
    /// first. Guards against cycles by tracking visited ids.
    pub async fn get_session_context(&self, id: Uuid) -> CodiResult<Vec<Message>> {
        let sessions = self.sessions.read().await;
        let mut chain = Vec::new();
        let mut current = Some(id);
        let mut visited = HashSet::new();

        while let Some(current_id) = current {
            if !visited.insert(current_id) {
                break;
            }
            let session = sessions.get(&current_id).ok_or_else(|| CodiError::SessionNotFound(current_id.to_string()))?;
            chain.push(session);
            current = session.parent_id;
        }

        chain.reverse();
        Ok(chain.into_iter().flat_map(|s| s.messages.clone()).collect())
    }

    /// Lists sessions matching `filter`, most recently updated first,
    /// capped at `limit`.
    pub async fn list_sessions(&self, filter: &SessionFilter, limit: usize) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        let mut matched: Vec<Session> = filter.filter(sessions.values()).into_iter().cloned().collect();
        matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matched.truncate(limit);
        matched
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self { sessions: RwLock::new(HashMap::new()), config: SessionManagerConfig::default() }
    }
}

fn enforce_message_cap(session: &mut Session, max_messages: usize) {
    let system_count = session.messages.iter().filter(|m| m.role == Role::System).count();
    let budget = max_messages.max(system_count);
    if session.messages.len() <= budget {
        return;
    }

    let overflow = session.messages.len() - budget;
    let mut dropped = 0;
    session.messages.retain(|m| {
        if dropped >= overflow || m.role == Role::System {
            true
        } else {
            dropped += 1;
            false
        }
    });
}
