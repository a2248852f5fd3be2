//! The outer loop for one user turn: session bookkeeping, the attractor
//! convergence loop, and the per-project turn-serialization rule.

use crate::intent::parse_explicit_intent;
use crate::model::{TurnInput, TurnOutcome};
use codi_artifacts::{queries, ArtifactStoreRegistry};
use codi_core::ports::PersistencePort;
use codi_core::{CodiError, CodiResult, Role};
use codi_evaluator::{AttractorEvaluator, AttractorStatus, DEFAULT_MAX_ITERATIONS, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use codi_sessions::SessionManager;
use codi_signals::{SignalEngine, SignalPriority};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Tunable budgets for one turn's convergence loop.
#[derive(Debug, Clone, Copy)]
pub struct TurnBudgets {
    /// Wall-clock deadline for the loop.
    pub timeout: Duration,
    /// Sleep between evaluation passes.
    pub poll_interval: Duration,
    /// Hard cap on evaluation passes.
    pub max_iterations: u32,
}

impl Default for TurnBudgets {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, poll_interval: DEFAULT_POLL_INTERVAL, max_iterations: DEFAULT_MAX_ITERATIONS }
    }
}

/// Drives one user turn per call, end to end.
///
/// Holds the shared, explicitly-constructed collaborators a turn touches:
/// the session manager, the per-project artifact store registry, and the
/// signal engine. None of these are process-global singletons — whoever
/// bootstraps the process builds exactly one of each and passes them here.
pub struct WorkflowExecutor {
    sessions: Arc<SessionManager>,
    artifact_stores: Arc<ArtifactStoreRegistry>,
    signals: Arc<SignalEngine>,
    persistence: Option<Arc<dyn PersistencePort>>,
    budgets: TurnBudgets,
    running_turns: StdMutex<HashSet<String>>,
    cancellations: RwLock<HashMap<String, Arc<AtomicBool>>>,
}

impl WorkflowExecutor {
    /// Builds an executor over the given collaborators, with default turn budgets.
    pub fn new(sessions: Arc<SessionManager>, artifact_stores: Arc<ArtifactStoreRegistry>, signals: Arc<SignalEngine>) -> Arc<Self> {
        Self::with_budgets(sessions, artifact_stores, signals, None, TurnBudgets::default())
    }

    /// Builds an executor with an explicit persistence port and turn budgets.
    pub fn with_budgets(
        sessions: Arc<SessionManager>,
        artifact_stores: Arc<ArtifactStoreRegistry>,
        signals: Arc<SignalEngine>,
        persistence: Option<Arc<dyn PersistencePort>>,
        budgets: TurnBudgets,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions,
            artifact_stores,
            signals,
            persistence,
            budgets,
            running_turns: StdMutex::new(HashSet::new()),
            cancellations: RwLock::new(HashMap::new()),
        })
    }

    /// Requests cancellation of the turn currently running for `project_id`,
    /// if any. The loop notices at its next polling step. Returns whether a
    /// running turn was found to flag.
    pub async fn cancel(&self, project_id: &str) -> bool {
        match self.cancellations.read().await.get(project_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Runs one user turn to completion, exhaustion of its budget, or
    /// external cancellation.
    ///
    /// Rejects with [`CodiError::TurnInProgress`] if a turn for the same
    /// project is already running — turns are serialized per project, never
    /// queued.
    pub async fn run_turn(&self, input: TurnInput) -> CodiResult<TurnOutcome> {
        self.begin_turn(&input.project_id)?;
        let _guard = TurnGuard { running: &self.running_turns, project_id: input.project_id.clone() };

        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.cancellations.write().await.insert(input.project_id.clone(), Arc::clone(&cancel_flag));

        let result = self.drive_turn(&input, &cancel_flag).await;

        self.cancellations.write().await.remove(&input.project_id);
        result
    }

    fn begin_turn(&self, project_id: &str) -> CodiResult<()> {
        let mut running = self.running_turns.lock().map_err(|_| CodiError::Evaluator("turn lock poisoned".to_string()))?;
        if running.contains(project_id) {
            return Err(CodiError::TurnInProgress(project_id.to_string()));
        }
        running.insert(project_id.to_string());
        Ok(())
    }

    async fn drive_turn(&self, input: &TurnInput, cancel_flag: &Arc<AtomicBool>) -> CodiResult<TurnOutcome> {
        let session = self.sessions.get_or_create(&input.project_id, &input.user_id, "executor").await;
        self.sessions.add_message(session.id, Role::User, input.user_message.clone(), None, Vec::new()).await?;

        self.log_operation(
            &input.project_id,
            serde_json::json!({
                "operation_type": "agent_task_started",
                "task_id": input.task_id,
                "user_id": input.user_id,
                "session_id": session.id,
            }),
        )
        .await?;

        let store = self.artifact_stores.get_or_create(&input.project_id, input.project_folder.clone()).await;
        let mut evaluator = AttractorEvaluator::new(Arc::clone(&store), Arc::clone(&self.signals), input.project_id.clone());

        if let Some(intent) = parse_explicit_intent(&input.user_message) {
            self.signals
                .emit(intent, input.project_id.clone(), HashMap::new(), "user", SignalPriority::High, Vec::new())
                .await;
        }

        let started_at = Instant::now();
        let evaluation = self.run_until_satisfied_or_cancelled(&mut evaluator, &store, &input.project_id, cancel_flag).await;
        let cancelled = cancel_flag.load(Ordering::SeqCst);

        let outstanding: Vec<String> = evaluation
            .results
            .iter()
            .filter(|r| r.status != AttractorStatus::Satisfied)
            .map(|r| r.name.to_string())
            .collect();
        let errors: Vec<String> = queries::get_active_errors(&store)
            .await
            .into_iter()
            .filter_map(|a| match a.content {
                codi_artifacts::ArtifactContent::Text(text) => Some(text),
                _ => None,
            })
            .collect();

        let summary = if cancelled {
            self.log_operation(
                &input.project_id,
                serde_json::json!({
                    "operation_type": "agent_task_cancelled",
                    "task_id": input.task_id,
                }),
            )
            .await?;
            "Turn cancelled before convergence.".to_string()
        } else if evaluation.all_satisfied {
            let elapsed = started_at.elapsed();
            self.log_operation(
                &input.project_id,
                serde_json::json!({
                    "operation_type": "agent_task_completed",
                    "task_id": input.task_id,
                    "elapsed_ms": elapsed.as_millis(),
                }),
            )
            .await?;
            "All attractors satisfied.".to_string()
        } else {
            format!("Turn ended with outstanding work: {}.", outstanding.join(", "))
        };

        self.sessions.add_message(session.id, Role::Assistant, summary.clone(), Some("executor".to_string()), Vec::new()).await?;

        Ok(TurnOutcome { session_id: session.id, all_satisfied: evaluation.all_satisfied, cancelled, outstanding, errors, summary })
    }

    async fn run_until_satisfied_or_cancelled(
        &self,
        evaluator: &mut AttractorEvaluator,
        store: &codi_artifacts::ArtifactStore,
        project_id: &str,
        cancel_flag: &Arc<AtomicBool>,
    ) -> codi_evaluator::EvaluationResult {
        let deadline = Instant::now() + self.budgets.timeout;
        let mut evaluation = evaluator.evaluate(None).await;

        for _ in 1..self.budgets.max_iterations {
            if evaluation.all_satisfied || cancel_flag.load(Ordering::SeqCst) || Instant::now() >= deadline {
                break;
            }
            let fatal = queries::get_unrecoverable_errors(store).await;
            if !fatal.is_empty() {
                tracing::error!(
                    project_id = %project_id,
                    count = fatal.len(),
                    "convergence loop exiting on unrecoverable error artifact"
                );
                let _ = self
                    .log_operation(
                        project_id,
                        serde_json::json!({
                            "operation_type": "agent_task_failed",
                            "reason": "unrecoverable_error",
                            "error_count": fatal.len(),
                        }),
                    )
                    .await;
                break;
            }
            evaluator.emit_derived_signals(&evaluation).await;
            tokio::time::sleep(self.budgets.poll_interval).await;
            if cancel_flag.load(Ordering::SeqCst) {
                break;
            }
            evaluation = evaluator.evaluate(None).await;
        }

        evaluation
    }

    async fn log_operation(&self, project_id: &str, entry: serde_json::Value) -> CodiResult<()> {
        if let Some(persistence) = &self.persistence {
            persistence.insert_operation_log(project_id, entry).await?;
        }
        Ok(())
    }
}

struct TurnGuard<'a> {
    running: &'a StdMutex<HashSet<String>>,
    project_id: String,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            running.remove(&self.project_id);
        }
    }
}
