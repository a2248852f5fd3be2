//! Convenience queries built on top of [`ArtifactStore`]'s core contract.
//!
//! Each of these is a thin, read-only projection — same complexity
//! guarantees as `get_by_type`, just named for the question an evaluator or
//! agent is actually asking.

use crate::model::{Artifact, ArtifactStatus, ArtifactType};
use crate::store::ArtifactStore;

/// Whether any active error artifact is present.
pub async fn has_errors(store: &ArtifactStore) -> bool {
    store.exists(ArtifactType::Error, None, ArtifactStatus::Active).await
}

/// All active error artifacts, newest first.
pub async fn get_active_errors(store: &ArtifactStore) -> Vec<Artifact> {
    store.get_by_type(ArtifactType::Error, Some(ArtifactStatus::Active), usize::MAX).await
}

/// Active error artifacts whose `recoverable` metadata is explicitly
/// `false` — a fatal error the convergence loop should stop polling for
/// rather than wait out its budget on.
pub async fn get_unrecoverable_errors(store: &ArtifactStore) -> Vec<Artifact> {
    get_active_errors(store)
        .await
        .into_iter()
        .filter(|a| a.metadata.get("recoverable").and_then(|v| v.as_bool()) == Some(false))
        .collect()
}

/// Whether a preview artifact currently exists.
pub async fn has_preview(store: &ArtifactStore) -> bool {
    store.exists(ArtifactType::Preview, None, ArtifactStatus::Active).await
}

/// The URL of the latest active preview artifact, if any.
pub async fn get_preview_url(store: &ArtifactStore) -> Option<String> {
    let artifact = store.get_latest(ArtifactType::Preview, None).await?;
    match artifact.content {
        crate::model::ArtifactContent::Text(url) => Some(url),
        _ => None,
    }
}

/// Whether the most recent build artifact reports success.
pub async fn build_succeeded(store: &ArtifactStore) -> bool {
    let Some(build) = store.get_latest(ArtifactType::Build, None).await else {
        return false;
    };
    build
        .metadata
        .get("success")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// All file artifacts, newest first.
pub async fn get_file_artifacts(store: &ArtifactStore) -> Vec<Artifact> {
    store.get_by_type(ArtifactType::File, None, usize::MAX).await
}

/// The latest plan artifact still awaiting review, if any.
pub async fn get_pending_plan(store: &ArtifactStore) -> Option<Artifact> {
    let plans = store.get_by_type(ArtifactType::Plan, Some(ArtifactStatus::Active), usize::MAX).await;
    plans.into_iter().find(|p| {
        p.metadata
            .get("status")
            .and_then(|v| v.as_str())
            .map(|s| s == "pending_review")
            .unwrap_or(false)
    })
}

/// Count of artifacts matching a type, irrespective of status.
pub async fn count_artifacts_by_type(store: &ArtifactStore, artifact_type: ArtifactType) -> usize {
    store.get_by_type(artifact_type, None, usize::MAX).await.len()
}
