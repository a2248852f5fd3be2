//! The typed context threaded explicitly through worker calls.
//!
//! Replaces the dynamic-attribute-lookup pattern ("get `project_id` off
//! `self.context` if present, else a default") with an explicit value
//! object every call site has to pass.

use std::sync::Arc;

/// Everything a worker needs to know about the run it's participating in.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// The project this worker call is scoped to.
    pub project_id: String,
    /// The session this worker call belongs to, if any.
    pub session_id: Option<String>,
    /// The agent name acting in this call.
    pub agent_name: Arc<str>,
}

impl WorkerContext {
    /// Builds a context for `agent_name` acting on `project_id`.
    pub fn new(project_id: impl Into<String>, agent_name: impl Into<Arc<str>>) -> Self {
        Self {
            project_id: project_id.into(),
            session_id: None,
            agent_name: agent_name.into(),
        }
    }

    /// Attaches a session id.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
