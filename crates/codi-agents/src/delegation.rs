//! The delegation tool: a courtesy path for one worker to invoke another
//! directly. The canonical activation mechanism remains the signal engine —
//! delegation exists for cases where a worker genuinely needs a synchronous
//! answer, or wants to hand work off to run in the background and keep
//! going rather than block on it.

use async_trait::async_trait;
use codi_core::CodiResult;
use codi_tasks::{BackgroundTaskManager, LaunchInput};
use std::sync::Arc;
use uuid::Uuid;

/// The result of a synchronous delegation.
#[derive(Debug, Clone)]
pub struct DelegationResult {
    /// The delegate agent's textual output.
    pub output: String,
}

/// A worker another worker can delegate a task to synchronously.
#[async_trait]
pub trait Delegate: Send + Sync + 'static {
    /// The agent name this delegate acts as.
    fn name(&self) -> &str;

    /// Runs `task` and returns its result synchronously.
    async fn run(&self, task: &str, context_info: &str) -> CodiResult<DelegationResult>;
}

/// Synchronously delegates a task to `delegate`, formatting the result the
/// way a caller would splice it back into its own output.
pub async fn delegate_task_sync(delegate: &dyn Delegate, task: &str, context_info: &str) -> CodiResult<String> {
    let result = delegate.run(task, context_info).await?;
    Ok(format!("## Result from {}\n\n{}", delegate.name(), result.output))
}

/// Asynchronously delegates a task: launches `delegate` as a background
/// task via `tasks` and returns immediately with its id, rather than
/// awaiting completion. The caller polls `tasks` (or subscribes to its
/// progress) to learn the outcome.
pub async fn delegate_task_async(
    tasks: &Arc<BackgroundTaskManager>,
    delegate: Arc<dyn Delegate>,
    task: String,
    context_info: String,
    parent_session_id: Uuid,
) -> CodiResult<Uuid> {
    let description = format!("delegated to {}", delegate.name());
    let agent = delegate.name().to_string();
    let launched = tasks
        .launch(
            LaunchInput {
                description,
                prompt: task.clone(),
                agent,
                parent_session_id,
                category: None,
                skills: Vec::new(),
                concurrency_key: None,
            },
            Box::new(move |_cancel_flag| {
                Box::pin(async move {
                    delegate
                        .run(&task, &context_info)
                        .await
                        .map(|r| r.output)
                        .map_err(|e| e.to_string())
                })
            }),
        )
        .await?;
    Ok(launched.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codi_tasks::TaskStatus;
    use std::time::Duration;

    struct EchoDelegate;

    #[async_trait]
    impl Delegate for EchoDelegate {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(&self, task: &str, _context_info: &str) -> CodiResult<DelegationResult> {
            Ok(DelegationResult { output: task.to_string() })
        }
    }

    #[tokio::test]
    async fn delegate_task_sync_formats_the_delegate_name() {
        let formatted = delegate_task_sync(&EchoDelegate, "build the preview", "").await.unwrap();
        assert!(formatted.contains("Result from echo"));
        assert!(formatted.contains("build the preview"));
    }

    #[tokio::test]
    async fn delegate_task_async_returns_immediately_with_a_task_id() {
        let tasks = BackgroundTaskManager::new();
        let task_id = delegate_task_async(&tasks, Arc::new(EchoDelegate), "build the preview".to_string(), String::new(), Uuid::new_v4())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let completed = tasks.get_task(task_id).await.unwrap();
        assert_eq!(completed.status, TaskStatus::Completed);
        assert_eq!(completed.result.as_deref(), Some("build the preview"));
    }
}
