//! The signal engine: subscriptions, emission, and signal history.

use crate::types::{incompatible_counterparts, Signal, SignalEvent, SignalPriority};
use async_trait::async_trait;
use codi_core::CodiResult;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A handler notified when a signal it subscribes to is emitted.
///
/// Handler errors are caught by the engine and logged with the failing
/// agent's name; they never prevent other handlers from running.
#[async_trait]
pub trait SignalHandler: Send + Sync {
    /// Invoked with the emitted event.
    async fn handle(&self, event: &SignalEvent) -> CodiResult<()>;
}

struct Subscription {
    agent: String,
    priority: i32,
    handler: Arc<dyn SignalHandler>,
}

struct GlobalHandler {
    priority: i32,
    handler: Arc<dyn SignalHandler>,
}

const MAX_HISTORY: usize = 1000;

/// Central signal routing engine for one process.
///
/// Constructed explicitly by whoever bootstraps the workflow executor —
/// never reached through a process-global singleton. Multiple engines may
/// coexist (e.g. one per test), each with an independent subscription and
/// active-signal state.
pub struct SignalEngine {
    subscriptions: RwLock<HashMap<Signal, Vec<Subscription>>>,
    global_handlers: RwLock<Vec<GlobalHandler>>,
    active: RwLock<HashMap<String, HashSet<Signal>>>,
    history: RwLock<Vec<SignalEvent>>,
}

impl SignalEngine {
    /// Creates an engine with no subscriptions or history.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            global_handlers: RwLock::new(Vec::new()),
            active: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Registers a handler invoked on every emission, regardless of signal.
    /// Runs interleaved with per-signal subscribers in descending priority
    /// order.
    pub async fn register_global_handler(&self, priority: i32, handler: Arc<dyn SignalHandler>) {
        let mut handlers = self.global_handlers.write().await;
        handlers.push(GlobalHandler { priority, handler });
        handlers.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Subscribes an agent to a signal. Subsequent subscriptions for the
    /// same `(agent, signal)` pair are ignored — subscriptions are unique
    /// per pair. Subscriber lists are kept sorted by descending priority.
    pub async fn subscribe(&self, agent: impl Into<String>, signal: Signal, priority: i32, handler: Arc<dyn SignalHandler>) {
        let agent = agent.into();
        let mut subs = self.subscriptions.write().await;
        let entry = subs.entry(signal).or_default();
        if entry.iter().any(|s| s.agent == agent) {
            return;
        }
        entry.push(Subscription { agent, priority, handler });
        entry.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Removes an agent's subscription to a single signal.
    pub async fn unsubscribe(&self, agent: &str, signal: Signal) {
        let mut subs = self.subscriptions.write().await;
        if let Some(list) = subs.get_mut(&signal) {
            list.retain(|s| s.agent != agent);
        }
    }

    /// Removes an agent's subscriptions to every signal.
    pub async fn unsubscribe_all(&self, agent: &str) {
        let mut subs = self.subscriptions.write().await;
        for list in subs.values_mut() {
            list.retain(|s| s.agent != agent);
        }
    }

    /// Agent names currently subscribed to a signal, in dispatch order.
    pub async fn get_subscribers(&self, signal: Signal) -> Vec<String> {
        let subs = self.subscriptions.read().await;
        subs.get(&signal)
            .map(|list| list.iter().map(|s| s.agent.clone()).collect())
            .unwrap_or_default()
    }

    /// Emits a signal: records it to history, removes any active
    /// incompatible counterpart, marks it active, then invokes each
    /// subscriber's handler and each global handler sequentially in
    /// priority order.
    pub async fn emit(
        &self,
        signal: Signal,
        project_id: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
        source: impl Into<String>,
        priority: SignalPriority,
        artifact_ids: Vec<String>,
    ) -> SignalEvent {
        let project_id = project_id.into();
        let correlation_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

        let event = SignalEvent {
            signal,
            project_id: project_id.clone(),
            context,
            source: source.into(),
            priority,
            artifact_ids,
            emitted_at: chrono::Utc::now(),
            correlation_id,
        };

        {
            let mut history = self.history.write().await;
            history.push(event.clone());
            if history.len() > MAX_HISTORY {
                let overflow = history.len() - MAX_HISTORY;
                history.drain(0..overflow);
            }
        }

        {
            let mut active = self.active.write().await;
            let set = active.entry(project_id.clone()).or_default();
            for counterpart in incompatible_counterparts(signal) {
                set.remove(counterpart);
            }
            set.insert(signal);
        }

        let mut dispatch: Vec<(i32, String, Arc<dyn SignalHandler>)> = {
            let subs = self.subscriptions.read().await;
            subs.get(&signal)
                .map(|list| list.iter().map(|s| (s.priority, s.agent.clone(), Arc::clone(&s.handler))).collect::<Vec<_>>())
                .unwrap_or_default()
        };
        {
            let globals = self.global_handlers.read().await;
            dispatch.extend(globals.iter().map(|g| (g.priority, "<global>".to_string(), Arc::clone(&g.handler))));
        }
        dispatch.sort_by(|a, b| b.0.cmp(&a.0));

        tracing::info!(
            signal = ?signal,
            project_id = %project_id,
            source = %event.source,
            subscribers = dispatch.len(),
            "signal emitted"
        );

        for (_, agent, handler) in dispatch {
            if let Err(e) = handler.handle(&event).await {
                tracing::error!(agent = %agent, signal = ?signal, error = %e, "signal handler failed");
            }
        }

        event
    }

    /// Emits several signals in order, returning their events.
    pub async fn emit_batch(
        &self,
        signals: Vec<Signal>,
        project_id: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
        source: impl Into<String>,
    ) -> Vec<SignalEvent> {
        let project_id = project_id.into();
        let source = source.into();
        let mut events = Vec::with_capacity(signals.len());
        for signal in signals {
            events.push(
                self.emit(signal, project_id.clone(), context.clone(), source.clone(), SignalPriority::default(), Vec::new())
                    .await,
            );
        }
        events
    }

    /// Marks a signal resolved (no longer active) for a project.
    pub async fn resolve(&self, signal: Signal, project_id: &str) {
        let mut active = self.active.write().await;
        if let Some(set) = active.get_mut(project_id) {
            set.remove(&signal);
        }
    }

    /// All signals currently active for a project.
    pub async fn get_active(&self, project_id: &str) -> HashSet<Signal> {
        self.active.read().await.get(project_id).cloned().unwrap_or_default()
    }

    /// Whether a signal is currently active for a project.
    pub async fn is_active(&self, signal: Signal, project_id: &str) -> bool {
        self.active
            .read()
            .await
            .get(project_id)
            .map(|set| set.contains(&signal))
            .unwrap_or(false)
    }

    /// Drops the active-signal set for a project.
    pub async fn clear_project(&self, project_id: &str) {
        self.active.write().await.remove(project_id);
    }

    /// Emitted events, most recent last, optionally filtered by project
    /// and/or signal, capped at `limit`.
    pub async fn get_history(&self, project_id: Option<&str>, signal: Option<Signal>, limit: usize) -> Vec<SignalEvent> {
        let history = self.history.read().await;
        let mut matches: Vec<SignalEvent> = history
            .iter()
            .filter(|e| project_id.map_or(true, |p| e.project_id == p))
            .filter(|e| signal.map_or(true, |s| e.signal == s))
            .cloned()
            .collect();
        if matches.len() > limit {
            let drop = matches.len() - limit;
            matches.drain(0..drop);
        }
        matches
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl SignalHandler for CountingHandler {
        async fn handle(&self, _event: &SignalEvent) -> CodiResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(codi_core::CodiError::Signal("boom".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn subscribers_dispatch_in_priority_order() {
        let engine = SignalEngine::new();
        let order = Arc::new(RwLock::new(Vec::<String>::new()));

        struct OrderRecorder {
            name: String,
            order: Arc<RwLock<Vec<String>>>,
        }
        #[async_trait]
        impl SignalHandler for OrderRecorder {
            async fn handle(&self, _event: &SignalEvent) -> CodiResult<()> {
                self.order.write().await.push(self.name.clone());
                Ok(())
            }
        }

        engine
            .subscribe("low", Signal::NeedsBuild, 1, Arc::new(OrderRecorder { name: "low".into(), order: Arc::clone(&order) }))
            .await;
        engine
            .subscribe("high", Signal::NeedsBuild, 10, Arc::new(OrderRecorder { name: "high".into(), order: Arc::clone(&order) }))
            .await;

        engine
            .emit(Signal::NeedsBuild, "proj-1", HashMap::new(), "system", SignalPriority::Normal, Vec::new())
            .await;

        assert_eq!(*order.read().await, vec!["high".to_string(), "low".to_string()]);
    }

    #[tokio::test]
    async fn a_failing_handler_does_not_block_the_others() {
        let engine = SignalEngine::new();
        let calls_a = Arc::new(AtomicUsize::new(0));
        let calls_b = Arc::new(AtomicUsize::new(0));

        engine
            .subscribe("a", Signal::ErrorOccurred, 5, Arc::new(CountingHandler { calls: Arc::clone(&calls_a), fail: true }))
            .await;
        engine
            .subscribe("b", Signal::ErrorOccurred, 1, Arc::new(CountingHandler { calls: Arc::clone(&calls_b), fail: false }))
            .await;

        engine
            .emit(Signal::ErrorOccurred, "proj-1", HashMap::new(), "system", SignalPriority::Critical, Vec::new())
            .await;

        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn emitting_plan_approved_clears_plan_rejected() {
        let engine = SignalEngine::new();
        engine
            .emit(Signal::PlanRejected, "proj-1", HashMap::new(), "system", SignalPriority::Normal, Vec::new())
            .await;
        assert!(engine.is_active(Signal::PlanRejected, "proj-1").await);

        engine
            .emit(Signal::PlanApproved, "proj-1", HashMap::new(), "system", SignalPriority::Normal, Vec::new())
            .await;
        assert!(!engine.is_active(Signal::PlanRejected, "proj-1").await);
        assert!(engine.is_active(Signal::PlanApproved, "proj-1").await);
    }

    #[tokio::test]
    async fn error_resolved_does_not_suppress_a_later_unrelated_error() {
        let engine = SignalEngine::new();
        engine
            .emit(Signal::ErrorOccurred, "proj-1", HashMap::new(), "system", SignalPriority::Normal, Vec::new())
            .await;
        engine
            .emit(Signal::ErrorResolved, "proj-1", HashMap::new(), "system", SignalPriority::Normal, Vec::new())
            .await;
        assert!(!engine.is_active(Signal::ErrorOccurred, "proj-1").await);

        engine
            .emit(Signal::ErrorOccurred, "proj-1", HashMap::new(), "system", SignalPriority::Normal, Vec::new())
            .await;
        assert!(engine.is_active(Signal::ErrorOccurred, "proj-1").await);
    }

    #[tokio::test]
    async fn a_global_handler_runs_for_every_signal_regardless_of_subscription() {
        let engine = SignalEngine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        engine.register_global_handler(0, Arc::new(CountingHandler { calls: Arc::clone(&calls), fail: false })).await;

        engine.emit(Signal::NeedsBuild, "proj-1", HashMap::new(), "system", SignalPriority::Normal, Vec::new()).await;
        engine.emit(Signal::TestsFailing, "proj-1", HashMap::new(), "system", SignalPriority::Normal, Vec::new()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn global_handlers_interleave_with_subscribers_by_priority() {
        let engine = SignalEngine::new();
        let order = Arc::new(RwLock::new(Vec::<String>::new()));

        struct OrderRecorder {
            name: String,
            order: Arc<RwLock<Vec<String>>>,
        }
        #[async_trait]
        impl SignalHandler for OrderRecorder {
            async fn handle(&self, _event: &SignalEvent) -> CodiResult<()> {
                self.order.write().await.push(self.name.clone());
                Ok(())
            }
        }

        engine.subscribe("mid", Signal::NeedsBuild, 5, Arc::new(OrderRecorder { name: "mid".into(), order: Arc::clone(&order) })).await;
        engine.register_global_handler(10, Arc::new(OrderRecorder { name: "global-high".into(), order: Arc::clone(&order) })).await;
        engine.register_global_handler(1, Arc::new(OrderRecorder { name: "global-low".into(), order: Arc::clone(&order) })).await;

        engine.emit(Signal::NeedsBuild, "proj-1", HashMap::new(), "system", SignalPriority::Normal, Vec::new()).await;

        assert_eq!(*order.read().await, vec!["global-high".to_string(), "mid".to_string(), "global-low".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_subscription_is_ignored() {
        let engine = SignalEngine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        engine
            .subscribe("a", Signal::NeedsBuild, 0, Arc::new(CountingHandler { calls: Arc::clone(&calls), fail: false }))
            .await;
        engine
            .subscribe("a", Signal::NeedsBuild, 99, Arc::new(CountingHandler { calls: Arc::clone(&calls), fail: false }))
            .await;
        assert_eq!(engine.get_subscribers(Signal::NeedsBuild).await.len(), 1);
    }

    #[tokio::test]
    async fn history_is_capped_at_max() {
        let engine = SignalEngine::new();
        for _ in 0..(MAX_HISTORY + 10) {
            engine
                .emit(Signal::TaskComplete, "proj-1", HashMap::new(), "system", SignalPriority::Low, Vec::new())
                .await;
        }
        let history = engine.get_history(None, None, usize::MAX).await;
        assert_eq!(history.len(), MAX_HISTORY);
    }
}
