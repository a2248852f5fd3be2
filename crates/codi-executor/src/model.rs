//! Input and outcome shapes for one workflow-executor turn.

use std::path::PathBuf;

/// One user turn submitted to the executor.
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// Project this turn is scoped to.
    pub project_id: String,
    /// User submitting the turn.
    pub user_id: String,
    /// Caller-supplied id for correlating this turn with external state.
    pub task_id: String,
    /// The user's message text.
    pub user_message: String,
    /// Project checkout on disk, if artifacts should persist to the filesystem.
    pub project_folder: Option<PathBuf>,
}

/// Result of driving one turn's convergence loop to completion or exhaustion.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Root session the turn ran against.
    pub session_id: uuid::Uuid,
    /// Whether every attractor was satisfied before the loop exited.
    pub all_satisfied: bool,
    /// Whether the turn was stopped by an external cancellation request.
    pub cancelled: bool,
    /// Attractor names still `blocked` or `unsatisfied` at loop exit.
    pub outstanding: Vec<String>,
    /// Active error messages at loop exit, if any.
    pub errors: Vec<String>,
    /// Assistant-facing summary appended to the session.
    pub summary: String,
}
