//! Background task data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length each truncated result/error field is capped at.
pub const TRUNCATION_LIMIT: usize = 1000;

/// Truncates `s` to [`TRUNCATION_LIMIT`] characters, respecting UTF-8
/// boundaries.
pub fn truncate(s: &str) -> String {
    if s.chars().count() <= TRUNCATION_LIMIT {
        return s.to_string();
    }
    s.chars().take(TRUNCATION_LIMIT).collect()
}

/// Where a background task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Registered but not yet scheduled.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error, including a timeout.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

/// Progress metadata a running worker reports back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Number of tool invocations observed so far.
    pub tool_calls: u32,
    /// Name of the most recently invoked tool.
    pub last_tool: Option<String>,
    /// When progress was last updated.
    pub last_update: Option<DateTime<Utc>>,
}

/// A long-running agent invocation tracked out-of-band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundTask {
    /// Unique task identifier.
    pub id: Uuid,
    /// The session created to run this task.
    pub session_id: Uuid,
    /// The session that launched this task.
    pub parent_session_id: Uuid,
    /// Agent name executing the task.
    pub agent: String,
    /// Human-readable description.
    pub description: String,
    /// The prompt handed to the agent.
    pub prompt: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// When the task started running.
    pub started_at: DateTime<Utc>,
    /// When the task reached a terminal status, if it has.
    pub completed_at: Option<DateTime<Utc>>,
    /// Truncated error message, if the task failed.
    pub error: Option<String>,
    /// Truncated result payload, if the task completed.
    pub result: Option<String>,
    /// Progress reported by the running worker.
    pub progress: TaskProgress,
    /// Optional concurrency key; at most one running task may hold a given key.
    pub concurrency_key: Option<String>,
    /// Optional category tag, for grouping/reporting.
    pub category: Option<String>,
    /// Skills the task was launched with.
    pub skills: Vec<String>,
}

/// Input to [`crate::manager::BackgroundTaskManager::launch`].
#[derive(Debug, Clone)]
pub struct LaunchInput {
    /// Human-readable description.
    pub description: String,
    /// The prompt handed to the agent.
    pub prompt: String,
    /// Agent name to execute the task.
    pub agent: String,
    /// The session that is launching this task.
    pub parent_session_id: Uuid,
    /// Optional category tag.
    pub category: Option<String>,
    /// Skills to make available to the task.
    pub skills: Vec<String>,
    /// Optional concurrency key.
    pub concurrency_key: Option<String>,
}

/// Input to [`crate::manager::BackgroundTaskManager::resume`].
#[derive(Debug, Clone)]
pub struct ResumeInput {
    /// The existing session to resume.
    pub session_id: Uuid,
    /// New prompt to continue the session with.
    pub prompt: String,
    /// The session that is requesting the resume.
    pub parent_session_id: Uuid,
}
