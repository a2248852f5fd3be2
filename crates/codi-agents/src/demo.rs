//! Minimal in-process workers illustrating how the two capability traits
//! compose. Production agent prompts and model choice live outside this
//! crate; these exist only to exercise the contract end to end.

use crate::producer::ArtifactProducer;
use crate::subscriber::SignalSubscriber;
use async_trait::async_trait;
use codi_artifacts::ArtifactStore;
use codi_core::CodiResult;
use codi_signals::{Signal, SignalEvent};
use std::sync::Arc;

/// A worker that only produces artifacts — analogous to `scribe`, which the
/// original system never subscribes to signals (it's invoked explicitly).
pub struct DemoArtifactWorker {
    store: Arc<ArtifactStore>,
}

impl DemoArtifactWorker {
    /// Builds a worker scoped to `store`.
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ArtifactProducer for DemoArtifactWorker {
    fn name(&self) -> &str {
        "demo_artifact_worker"
    }

    fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }
}

/// A worker that both subscribes to signals and produces artifacts —
/// analogous to `sage`, which handles `error_occurred`/`build_failed` and
/// writes fixed files back.
pub struct DemoSignalWorker {
    store: Arc<ArtifactStore>,
}

impl DemoSignalWorker {
    /// Builds a worker scoped to `store`.
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ArtifactProducer for DemoSignalWorker {
    fn name(&self) -> &str {
        "demo_signal_worker"
    }

    fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }
}

#[async_trait]
impl SignalSubscriber for DemoSignalWorker {
    fn name(&self) -> &str {
        "demo_signal_worker"
    }

    fn subscribes_to(&self) -> &[Signal] {
        &[Signal::ErrorOccurred, Signal::BuildFailed]
    }

    async fn handle_signal(&self, event: &SignalEvent) -> CodiResult<()> {
        self.produce_error_artifact(
            &format!("observed {:?} from {}", event.signal, event.source),
            "handled",
            true,
            None,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::register_signal_handlers;
    use codi_signals::SignalEngine;
    use std::collections::HashMap;

    #[tokio::test]
    async fn demo_artifact_worker_only_produces() {
        let store = Arc::new(ArtifactStore::new("proj-1", None));
        let worker = DemoArtifactWorker::new(Arc::clone(&store));
        let artifact = worker.produce_analysis_artifact("looks fine", "static").await.unwrap();
        assert_eq!(artifact.producer, "demo_artifact_worker");
    }

    #[tokio::test]
    async fn demo_signal_worker_writes_an_artifact_when_it_handles_a_signal() {
        let store = Arc::new(ArtifactStore::new("proj-1", None));
        let worker = Arc::new(DemoSignalWorker::new(Arc::clone(&store)));
        let engine = SignalEngine::new();
        register_signal_handlers(Arc::clone(&worker), &engine).await;

        engine
            .emit(
                Signal::BuildFailed,
                "proj-1",
                HashMap::new(),
                "build_deploy",
                codi_signals::SignalPriority::High,
                Vec::new(),
            )
            .await;

        let errors = store.get_by_type(codi_artifacts::ArtifactType::Error, None, 10).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].producer, "demo_signal_worker");
    }
}
