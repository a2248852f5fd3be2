//! The signal-subscriber capability.

use async_trait::async_trait;
use codi_signals::{Signal, SignalEngine, SignalEvent, SignalHandler};
use std::collections::HashMap;
use std::sync::Arc;

/// A worker that reacts to signals fired by the engine.
///
/// `subscribes_to` is a static declaration of the signals this worker
/// handles; `register_signal_handlers`/`unregister_signal_handlers` wire or
/// remove those subscriptions on a concrete [`SignalEngine`].
#[async_trait]
pub trait SignalSubscriber: Send + Sync {
    /// The name this worker registers subscriptions under.
    fn name(&self) -> &str;

    /// Dispatch priority passed to every subscription this worker registers.
    fn signal_priority(&self) -> i32 {
        0
    }

    /// The signals this worker wants to be notified about.
    fn subscribes_to(&self) -> &[Signal];

    /// Invoked when a subscribed signal fires.
    async fn handle_signal(&self, event: &SignalEvent) -> codi_core::CodiResult<()>;

    /// Whether this worker handles a given signal.
    fn can_handle(&self, signal: Signal) -> bool {
        self.subscribes_to().contains(&signal)
    }
}

/// Adapts any [`SignalSubscriber`] into the [`SignalHandler`] the engine
/// dispatches to, so `register_signal_handlers` can hand the engine a
/// single shared handler per worker.
struct SubscriberHandler<W: SignalSubscriber + 'static> {
    worker: Arc<W>,
}

#[async_trait]
impl<W: SignalSubscriber + 'static> SignalHandler for SubscriberHandler<W> {
    async fn handle(&self, event: &SignalEvent) -> codi_core::CodiResult<()> {
        self.worker.handle_signal(event).await
    }
}

/// Registers every signal in `worker.subscribes_to()` on `engine`.
pub async fn register_signal_handlers<W: SignalSubscriber + 'static>(worker: Arc<W>, engine: &SignalEngine) {
    let handler = Arc::new(SubscriberHandler { worker: Arc::clone(&worker) });
    for signal in worker.subscribes_to() {
        engine
            .subscribe(worker.name().to_string(), *signal, worker.signal_priority(), handler.clone())
            .await;
    }
}

/// Removes every subscription `worker` holds on `engine`.
pub async fn unregister_signal_handlers<W: SignalSubscriber>(worker: &W, engine: &SignalEngine) {
    engine.unsubscribe_all(worker.name()).await;
}

/// Emits a signal on behalf of a worker, sourced with the worker's name.
pub async fn emit_signal<W: SignalSubscriber>(
    worker: &W,
    engine: &SignalEngine,
    signal: Signal,
    project_id: &str,
    context: HashMap<String, serde_json::Value>,
    artifact_ids: Vec<String>,
) -> SignalEvent {
    engine
        .emit(
            signal,
            project_id.to_string(),
            context,
            worker.name().to_string(),
            codi_signals::SignalPriority::default(),
            artifact_ids,
        )
        .await
}
