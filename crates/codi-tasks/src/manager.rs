//! The background task manager: launch, track, cancel, and report on
//! long-running agent invocations.

use crate::model::{truncate, BackgroundTask, LaunchInput, ResumeInput, TaskProgress, TaskStatus};
use codi_core::{CodiError, CodiResult};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A cooperative cancellation signal handed to a running task's work.
///
/// Workers poll this at well-defined suspension points — between tool
/// invocations, between LLM calls — rather than being forcibly killed.
#[derive(Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The outcome of a task's work.
pub type TaskOutcome = Result<String, String>;
type TaskFuture = Pin<Box<dyn Future<Output = TaskOutcome> + Send>>;

/// Builds the future a launched task runs, given its cancellation flag.
pub type WorkFactory = Box<dyn FnOnce(CancellationFlag) -> TaskFuture + Send>;

/// Maximum wall-clock duration a task may run before being cancelled and
/// marked failed with a timeout error.
const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(900);

struct TaskEntry {
    task: BackgroundTask,
    cancel_flag: CancellationFlag,
}

/// Launches, tracks, cancels, and reports on background agent invocations.
///
/// Constructed once per process (or per test) and held behind an `Arc` so
/// spawned task futures can call back into it to record completion.
pub struct BackgroundTaskManager {
    tasks: RwLock<HashMap<Uuid, TaskEntry>>,
    running: RwLock<HashSet<Uuid>>,
    by_concurrency_key: RwLock<HashMap<String, Uuid>>,
    task_timeout: Duration,
}

impl BackgroundTaskManager {
    /// Creates a manager using the default task timeout.
    pub fn new() -> Arc<Self> {
        Self::with_timeout(DEFAULT_TASK_TIMEOUT)
    }

    /// Creates a manager with an explicit per-task timeout.
    pub fn with_timeout(task_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            tasks: RwLock::new(HashMap::new()),
            running: RwLock::new(HashSet::new()),
            by_concurrency_key: RwLock::new(HashMap::new()),
            task_timeout,
        })
    }

    /// Launches a task: validates the concurrency key is free, registers the
    /// task as running, then schedules `work` onto the async runtime.
    ///
    /// Concurrency-key validation and registration happen under the same
    /// lock acquisition — read the key, decide, and write the reservation
    /// before releasing — so two concurrent launches can never both win the
    /// same key.
    pub async fn launch(self: &Arc<Self>, input: LaunchInput, work: WorkFactory) -> CodiResult<BackgroundTask> {
        if let Some(key) = &input.concurrency_key {
            let mut by_key = self.by_concurrency_key.write().await;
            if by_key.contains_key(key) {
                return Err(CodiError::ConcurrencyKeyBusy(key.clone()));
            }
            let task_id = Uuid::new_v4();
            by_key.insert(key.clone(), task_id);
            drop(by_key);
            return self.register_and_schedule(task_id, input, work).await;
        }

        let task_id = Uuid::new_v4();
        self.register_and_schedule(task_id, input, work).await
    }

    async fn register_and_schedule(
        self: &Arc<Self>,
        task_id: Uuid,
        input: LaunchInput,
        work: WorkFactory,
    ) -> CodiResult<BackgroundTask> {
        let cancel_flag = CancellationFlag::default();
        let task = BackgroundTask {
            id: task_id,
            session_id: Uuid::new_v4(),
            parent_session_id: input.parent_session_id,
            agent: input.agent,
            description: input.description,
            prompt: input.prompt,
            status: TaskStatus::Running,
            started_at: chrono::Utc::now(),
            completed_at: None,
            error: None,
            result: None,
            progress: TaskProgress::default(),
            concurrency_key: input.concurrency_key.clone(),
            category: input.category,
            skills: input.skills,
        };

        {
            let mut tasks = self.tasks.write().await;
            tasks.insert(task_id, TaskEntry { task: task.clone(), cancel_flag: cancel_flag.clone() });
        }
        self.running.write().await.insert(task_id);

        tracing::info!(task_id = %task_id, agent = %task.agent, "launched background task");

        let manager = Arc::clone(self);
        let timeout = self.task_timeout;
        tokio::spawn(async move {
            let outcome = tokio::time::timeout(timeout, work(cancel_flag.clone())).await;
            match outcome {
                Ok(Ok(result)) => manager.complete(task_id, Ok(result)).await,
                Ok(Err(err)) if cancel_flag.is_requested() => manager.complete_cancelled(task_id, err).await,
                Ok(Err(err)) => manager.complete(task_id, Err(err)).await,
                Err(_) => manager.complete(task_id, Err("task exceeded its maximum wall clock".to_string())).await,
            }
        });

        Ok(task)
    }

    /// Re-invokes an existing session with new input. The session must
    /// exist and must not already be completed or cancelled.
    pub async fn resume(&self, input: ResumeInput) -> CodiResult<BackgroundTask> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks
            .values_mut()
            .find(|e| e.task.session_id == input.session_id)
            .ok_or_else(|| CodiError::TaskNotFound(input.session_id.to_string()))?;

        if matches!(entry.task.status, TaskStatus::Completed | TaskStatus::Cancelled) {
            return Err(CodiError::Session(format!(
                "session {} is already {:?}",
                input.session_id, entry.task.status
            )));
        }

        entry.task.prompt = input.prompt;
        entry.task.parent_session_id = input.parent_session_id;
        entry.task.status = TaskStatus::Running;
        Ok(entry.task.clone())
    }

    /// Looks up a task by id.
    pub async fn get_task(&self, id: Uuid) -> Option<BackgroundTask> {
        self.tasks.read().await.get(&id).map(|e| e.task.clone())
    }

    /// Every task currently marked running.
    pub async fn get_running_tasks(&self) -> Vec<BackgroundTask> {
        let running = self.running.read().await;
        let tasks = self.tasks.read().await;
        running.iter().filter_map(|id| tasks.get(id)).map(|e| e.task.clone()).collect()
    }

    /// Requests cancellation of a task. Idempotent — cancelling an already
    /// non-running task is a no-op.
    pub async fn cancel(&self, id: Uuid) -> CodiResult<()> {
        let tasks = self.tasks.read().await;
        let Some(entry) = tasks.get(&id) else {
            return Err(CodiError::TaskNotFound(id.to_string()));
        };
        if entry.task.status == TaskStatus::Running {
            entry.cancel_flag.request();
        }
        Ok(())
    }

    /// Cancels every currently running task, returning how many were signalled.
    pub async fn cancel_all(&self) -> usize {
        let ids: Vec<Uuid> = self.running.read().await.iter().copied().collect();
        let mut count = 0;
        for id in ids {
            if self.cancel(id).await.is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Records progress reported by a running worker.
    pub async fn update_progress(&self, id: Uuid, tool_name: Option<String>, increment_calls: bool) -> CodiResult<()> {
        let mut tasks = self.tasks.write().await;
        let entry = tasks.get_mut(&id).ok_or_else(|| CodiError::TaskNotFound(id.to_string()))?;
        if increment_calls {
            entry.task.progress.tool_calls += 1;
        }
        if let Some(name) = tool_name {
            entry.task.progress.last_tool = Some(name);
        }
        entry.task.progress.last_update = Some(chrono::Utc::now());
        Ok(())
    }

    async fn complete(&self, id: Uuid, outcome: TaskOutcome) {
        self.finish(id, match outcome {
            Ok(result) => (TaskStatus::Completed, Some(truncate(&result)), None),
            Err(err) => (TaskStatus::Failed, None, Some(truncate(&err))),
        })
        .await;
    }

    async fn complete_cancelled(&self, id: Uuid, reason: String) {
        self.finish(id, (TaskStatus::Cancelled, None, Some(truncate(&reason)))).await;
    }

    async fn finish(&self, id: Uuid, (status, result, error): (TaskStatus, Option<String>, Option<String>)) {
        let mut tasks = self.tasks.write().await;
        if let Some(entry) = tasks.get_mut(&id) {
            entry.task.status = status;
            entry.task.result = result;
            entry.task.error = error;
            entry.task.completed_at = Some(chrono::Utc::now());
            if let Some(key) = entry.task.concurrency_key.clone() {
                drop(tasks);
                self.by_concurrency_key.write().await.remove(&key);
                tasks = self.tasks.write().await;
                let _ = tasks.get(&id);
            }
        }
        drop(tasks);
        self.running.write().await.remove(&id);
        tracing::info!(task_id = %id, status = ?status, "background task finished");
    }

    /// Human-readable status summary for a task, suitable for a delegation
    /// tool's return value.
    pub async fn describe(&self, id: Uuid) -> Option<String> {
        let task = self.get_task(id).await?;
        let elapsed = task
            .completed_at
            .unwrap_or_else(chrono::Utc::now)
            .signed_duration_since(task.started_at);
        let duration = format_duration(elapsed.num_seconds().max(0) as u64);

        Some(match task.status {
            TaskStatus::Running => format!(
                "Task {} ({}) running for {duration}. Last tool: {}.",
                task.id,
                task.agent,
                task.progress.last_tool.as_deref().unwrap_or("none yet")
            ),
            TaskStatus::Completed => format!(
                "Task {} ({}) completed in {duration}. Result: {}",
                task.id,
                task.agent,
                task.result.as_deref().unwrap_or("")
            ),
            TaskStatus::Failed => format!(
                "Task {} ({}) failed after {duration}. Error: {}",
                task.id,
                task.agent,
                task.error.as_deref().unwrap_or("unknown error")
            ),
            TaskStatus::Cancelled => format!("Task {} ({}) was cancelled after {duration}.", task.id, task.agent),
            TaskStatus::Pending => format!("Task {} ({}) is pending.", task.id, task.agent),
        })
    }
}

fn format_duration(total_seconds: u64) -> String {
    if total_seconds < 60 {
        return format!("{total_seconds}s");
    }
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if minutes < 60 {
        return format!("{minutes}m{seconds:02}s");
    }
    let hours = minutes / 60;
    let remaining_minutes = minutes % 60;
    format!("{hours}h{remaining_minutes:02}m")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn immediate_success(output: &'static str) -> WorkFactory {
        Box::new(move |_flag| Box::pin(async move { Ok(output.to_string()) }))
    }

    #[tokio::test]
    async fn launch_runs_to_completion() {
        let manager = BackgroundTaskManager::new();
        let task = manager
            .launch(
                LaunchInput {
                    description: "build".to_string(),
                    prompt: "build it".to_string(),
                    agent: "build_deploy".to_string(),
                    parent_session_id: Uuid::new_v4(),
                    category: None,
                    skills: Vec::new(),
                    concurrency_key: None,
                },
                immediate_success("done"),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let fetched = manager.get_task(task.id).await.unwrap();
        assert_eq!(fetched.status, TaskStatus::Completed);
        assert_eq!(fetched.result.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn second_launch_with_same_concurrency_key_is_rejected() {
        let manager = BackgroundTaskManager::new();
        let pending: WorkFactory = Box::new(|_flag| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("late".to_string())
            })
        });

        manager
            .launch(
                LaunchInput {
                    description: "deploy".to_string(),
                    prompt: "deploy it".to_string(),
                    agent: "build_deploy".to_string(),
                    parent_session_id: Uuid::new_v4(),
                    category: None,
                    skills: Vec::new(),
                    concurrency_key: Some("deploy:proj-1".to_string()),
                },
                pending,
            )
            .await
            .unwrap();

        let result = manager
            .launch(
                LaunchInput {
                    description: "deploy again".to_string(),
                    prompt: "deploy it".to_string(),
                    agent: "build_deploy".to_string(),
                    parent_session_id: Uuid::new_v4(),
                    category: None,
                    skills: Vec::new(),
                    concurrency_key: Some("deploy:proj-1".to_string()),
                },
                immediate_success("ok"),
            )
            .await;

        assert!(matches!(result, Err(CodiError::ConcurrencyKeyBusy(_))));
    }

    #[tokio::test]
    async fn cancel_all_signals_every_running_task() {
        let manager = BackgroundTaskManager::new();
        let cooperative: WorkFactory = Box::new(|flag| {
            Box::pin(async move {
                loop {
                    if flag.is_requested() {
                        return Err("cancelled".to_string());
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
        });

        let task = manager
            .launch(
                LaunchInput {
                    description: "long".to_string(),
                    prompt: "work".to_string(),
                    agent: "sage".to_string(),
                    parent_session_id: Uuid::new_v4(),
                    category: None,
                    skills: Vec::new(),
                    concurrency_key: None,
                },
                cooperative,
            )
            .await
            .unwrap();

        let cancelled = manager.cancel_all().await;
        assert_eq!(cancelled, 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let fetched = manager.get_task(task.id).await.unwrap();
        assert_eq!(fetched.status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn describe_reports_completion_summary() {
        let manager = BackgroundTaskManager::new();
        let task = manager
            .launch(
                LaunchInput {
                    description: "analyze".to_string(),
                    prompt: "analyze it".to_string(),
                    agent: "analyst".to_string(),
                    parent_session_id: Uuid::new_v4(),
                    category: None,
                    skills: Vec::new(),
                    concurrency_key: None,
                },
                immediate_success("analysis complete"),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let summary = manager.describe(task.id).await.unwrap();
        assert!(summary.contains("completed"));
        assert!(summary.contains("analysis complete"));
    }
}
