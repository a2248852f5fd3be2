//! Drives the convergence loop: evaluate attractor state, emit signals for
//! what's unmet, repeat until satisfied or a budget is exhausted.

use crate::attractor::{Attractor, AttractorResult, AttractorStatus};
use codi_artifacts::ArtifactStore;
use codi_signals::{Signal, SignalEngine, SignalPriority};
use std::collections::HashMap as StdHashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default wall-clock budget for [`AttractorEvaluator::run_until_satisfied`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
/// Default sleep between convergence-loop iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default hard cap on convergence-loop iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// The outcome of one `evaluate()` pass.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// Per-attractor outcome, in evaluation order (priority descending).
    pub results: Vec<AttractorResult>,
    /// Signals to emit, collected from unsatisfied attractors that declare one.
    pub signals_to_emit: Vec<Signal>,
    /// Whether every evaluated attractor is satisfied.
    pub all_satisfied: bool,
    /// When this pass ran.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Evaluates a project's attractor set against its artifact store and
/// drives the signal engine until convergence.
///
/// Owns its own `last_evaluation` cache and is meant to be constructed fresh
/// per workflow-executor turn — never shared or reused across runs, so a
/// stale cache from a previous turn can never leak into a new one.
pub struct AttractorEvaluator {
    attractors: Vec<Box<dyn Attractor>>,
    store: Arc<ArtifactStore>,
    engine: Arc<SignalEngine>,
    project_id: String,
    last_evaluation: Option<EvaluationResult>,
}

impl AttractorEvaluator {
    /// Builds an evaluator over the default attractor set.
    pub fn new(store: Arc<ArtifactStore>, engine: Arc<SignalEngine>, project_id: impl Into<String>) -> Self {
        Self::with_attractors(crate::definitions::default_attractors(), store, engine, project_id)
    }

    /// Builds an evaluator over an explicit attractor set.
    pub fn with_attractors(
        attractors: Vec<Box<dyn Attractor>>,
        store: Arc<ArtifactStore>,
        engine: Arc<SignalEngine>,
        project_id: impl Into<String>,
    ) -> Self {
        Self { attractors, store, engine, project_id: project_id.into(), last_evaluation: None }
    }

    /// The most recent evaluation this instance produced, if any.
    pub fn last_evaluation(&self) -> Option<&EvaluationResult> {
        self.last_evaluation.as_ref()
    }

    /// Runs one evaluation pass over `names` (default: every attractor),
    /// sorted by priority descending. An attractor with an unsatisfied or
    /// errored dependency is reported `blocked` and its predicate is never
    /// invoked; its signal is not emitted.
    pub async fn evaluate(&mut self, names: Option<&[&str]>) -> EvaluationResult {
        let mut ordered: Vec<&Box<dyn Attractor>> = self
            .attractors
            .iter()
            .filter(|a| names.map_or(true, |ns| ns.contains(&a.name())))
            .collect();
        ordered.sort_by(|a, b| b.priority().cmp(&a.priority()));

        let mut statuses: StdHashMap<&'static str, AttractorStatus> = StdHashMap::new();
        let mut results = Vec::with_capacity(ordered.len());
        let mut signals_to_emit = Vec::new();

        for attractor in ordered {
            let blocked = attractor
                .dependencies()
                .iter()
                .any(|dep| !matches!(statuses.get(dep), Some(AttractorStatus::Satisfied)));

            let (status, error) = if blocked {
                (AttractorStatus::Blocked, None)
            } else {
                match attractor.check(&self.store).await {
                    Ok(true) => (AttractorStatus::Satisfied, None),
                    // No fallback signal means no mechanism ever drives this
                    // attractor toward satisfaction on its own (e.g.
                    // `plan_approved` awaiting a human decision) — that's
                    // not "unsatisfied and someone will fix it", it's
                    // blocked on external action.
                    Ok(false) if attractor.fallback_signal().is_none() => (AttractorStatus::Blocked, None),
                    Ok(false) => (AttractorStatus::Unsatisfied, None),
                    Err(e) => (AttractorStatus::Blocked, Some(e.to_string())),
                }
            };

            if status == AttractorStatus::Unsatisfied {
                if let Some(signal) = attractor.fallback_signal() {
                    signals_to_emit.push(signal);
                }
            }

            statuses.insert(attractor.name(), status);
            results.push(AttractorResult { name: attractor.name(), status, error });
        }

        let all_satisfied = results.iter().all(|r| r.status == AttractorStatus::Satisfied);
        let evaluation = EvaluationResult { results, signals_to_emit, all_satisfied, timestamp: chrono::Utc::now() };
        self.last_evaluation = Some(evaluation.clone());
        evaluation
    }

    /// Emits every signal an evaluation collected. Tolerant of duplicates:
    /// a signal already active for this project is still emitted, since
    /// handlers are expected to be idempotent on their artifact reads.
    pub async fn emit_derived_signals(&self, evaluation: &EvaluationResult) {
        for &signal in &evaluation.signals_to_emit {
            self.engine
                .emit(signal, self.project_id.clone(), StdHashMap::new(), "evaluator", SignalPriority::Normal, Vec::new())
                .await;
        }
    }

    /// Repeatedly evaluates and emits derived signals until every attractor
    /// is satisfied, the iteration cap is hit, or the deadline passes.
    /// Returns the last evaluation performed.
    pub async fn run_until_satisfied(
        &mut self,
        names: Option<&[&str]>,
        timeout: Duration,
        poll_interval: Duration,
        max_iterations: u32,
    ) -> EvaluationResult {
        let deadline = Instant::now() + timeout;
        let mut evaluation = self.evaluate(names).await;

        for _ in 1..max_iterations {
            if evaluation.all_satisfied || Instant::now() >= deadline {
                break;
            }
            self.emit_derived_signals(&evaluation).await;
            tokio::time::sleep(poll_interval).await;
            evaluation = self.evaluate(names).await;
        }

        evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codi_artifacts::{queries, Artifact, ArtifactContent, ArtifactType};
    use std::collections::HashMap;

    async fn scaffolded_store() -> Arc<ArtifactStore> {
        let store = Arc::new(ArtifactStore::new("proj-1", None));
        store
            .persist(Artifact::new(ArtifactType::File, "scribe", "proj-1", ArtifactContent::Text("x".into()), HashMap::new()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn evaluate_reports_unsatisfied_scaffold_with_no_artifacts() {
        let store = Arc::new(ArtifactStore::new("proj-1", None));
        let engine = Arc::new(SignalEngine::new());
        let mut evaluator = AttractorEvaluator::new(store, engine, "proj-1");

        let result = evaluator.evaluate(None).await;
        assert!(!result.all_satisfied);
        let scaffold = result.results.iter().find(|r| r.name == "has_scaffold").unwrap();
        assert_eq!(scaffold.status, AttractorStatus::Unsatisfied);
        assert!(result.signals_to_emit.contains(&Signal::NeedsScaffold));
    }

    #[tokio::test]
    async fn dependent_attractor_is_blocked_not_unsatisfied_when_dependency_unmet() {
        let store = scaffolded_store().await;
        let engine = Arc::new(SignalEngine::new());
        let mut evaluator = AttractorEvaluator::new(store, engine, "proj-1");

        let result = evaluator.evaluate(None).await;
        let preview = result.results.iter().find(|r| r.name == "preview_available").unwrap();
        assert_eq!(preview.status, AttractorStatus::Blocked);
        assert!(!result.signals_to_emit.contains(&Signal::NeedsPreview));
    }

    #[tokio::test]
    async fn plan_approved_never_emits_a_signal_when_unmet() {
        let store = scaffolded_store().await;
        let mut pending_meta = HashMap::new();
        pending_meta.insert("status".to_string(), serde_json::json!("pending_review"));
        store
            .persist(Artifact::new(ArtifactType::Plan, "strategist", "proj-1", ArtifactContent::Text("plan".into()), pending_meta))
            .await
            .unwrap();

        let engine = Arc::new(SignalEngine::new());
        let mut evaluator = AttractorEvaluator::new(store, engine, "proj-1");
        let result = evaluator.evaluate(None).await;

        let plan = result.results.iter().find(|r| r.name == "plan_approved").unwrap();
        assert_eq!(plan.status, AttractorStatus::Blocked);
        assert!(!result.signals_to_emit.contains(&Signal::PlanApproved));
        assert!(!result.signals_to_emit.contains(&Signal::PlanRejected));
    }

    #[tokio::test]
    async fn run_until_satisfied_converges_once_build_succeeds() {
        let store = scaffolded_store().await;
        let mut metadata = HashMap::new();
        metadata.insert("success".to_string(), serde_json::json!(true));
        metadata.insert("tests_passed".to_string(), serde_json::json!(true));
        store
            .persist(Artifact::new(ArtifactType::Build, "artisan", "proj-1", ArtifactContent::Text("ok".into()), metadata))
            .await
            .unwrap();

        let engine = Arc::new(SignalEngine::new());
        let mut evaluator = AttractorEvaluator::new(Arc::clone(&store), engine, "proj-1");
        let result = evaluator
            .run_until_satisfied(
                Some(&["has_scaffold", "project_builds", "tests_passing", "no_errors"]),
                Duration::from_secs(1),
                Duration::from_millis(5),
                10,
            )
            .await;

        assert!(result.all_satisfied);
        assert!(queries::build_succeeded(&store).await);
    }

    #[tokio::test]
    async fn emit_derived_signals_fires_even_when_signal_already_active() {
        let store = Arc::new(ArtifactStore::new("proj-1", None));
        let engine = Arc::new(SignalEngine::new());
        engine
            .emit(Signal::NeedsScaffold, "proj-1", HashMap::new(), "system", SignalPriority::Normal, Vec::new())
            .await;

        let mut evaluator = AttractorEvaluator::new(store, Arc::clone(&engine), "proj-1");
        let evaluation = evaluator.evaluate(Some(&["has_scaffold"])).await;
        evaluator.emit_derived_signals(&evaluation).await;

        let history = engine.get_history(Some("proj-1"), Some(Signal::NeedsScaffold), 10).await;
        assert_eq!(history.len(), 2);
    }
}
