//! The built-in attractor set.

use crate::attractor::Attractor;
use async_trait::async_trait;
use codi_artifacts::queries;
use codi_artifacts::ArtifactStore;
use codi_core::CodiResult;
use codi_signals::Signal;

/// At least one file artifact exists.
pub struct HasScaffold;

#[async_trait]
impl Attractor for HasScaffold {
    fn name(&self) -> &'static str {
        "has_scaffold"
    }
    fn priority(&self) -> i32 {
        100
    }
    fn fallback_signal(&self) -> Option<Signal> {
        Some(Signal::NeedsScaffold)
    }
    async fn check(&self, store: &ArtifactStore) -> CodiResult<bool> {
        Ok(!queries::get_file_artifacts(store).await.is_empty())
    }
}

/// The latest build succeeded.
pub struct ProjectBuilds;

#[async_trait]
impl Attractor for ProjectBuilds {
    fn name(&self) -> &'static str {
        "project_builds"
    }
    fn priority(&self) -> i32 {
        90
    }
    fn dependencies(&self) -> &[&'static str] {
        &["has_scaffold"]
    }
    fn fallback_signal(&self) -> Option<Signal> {
        Some(Signal::NeedsBuild)
    }
    async fn check(&self, store: &ArtifactStore) -> CodiResult<bool> {
        Ok(queries::build_succeeded(store).await)
    }
}

/// A non-null preview URL artifact exists.
pub struct PreviewAvailable;

#[async_trait]
impl Attractor for PreviewAvailable {
    fn name(&self) -> &'static str {
        "preview_available"
    }
    fn priority(&self) -> i32 {
        70
    }
    fn dependencies(&self) -> &[&'static str] {
        &["project_builds"]
    }
    fn fallback_signal(&self) -> Option<Signal> {
        Some(Signal::NeedsPreview)
    }
    async fn check(&self, store: &ArtifactStore) -> CodiResult<bool> {
        Ok(queries::get_preview_url(store).await.is_some())
    }
}

/// No active error artifact is present.
pub struct NoErrors;

#[async_trait]
impl Attractor for NoErrors {
    fn name(&self) -> &'static str {
        "no_errors"
    }
    fn priority(&self) -> i32 {
        95
    }
    fn fallback_signal(&self) -> Option<Signal> {
        Some(Signal::ErrorOccurred)
    }
    async fn check(&self, store: &ArtifactStore) -> CodiResult<bool> {
        Ok(!queries::has_errors(store).await)
    }
}

/// No pending (un-superseded, awaiting-commit) file artifacts remain.
pub struct GitClean;

#[async_trait]
impl Attractor for GitClean {
    fn name(&self) -> &'static str {
        "git_clean"
    }
    fn priority(&self) -> i32 {
        60
    }
    fn fallback_signal(&self) -> Option<Signal> {
        Some(Signal::NeedsCommit)
    }
    async fn check(&self, store: &ArtifactStore) -> CodiResult<bool> {
        let pending = queries::get_file_artifacts(store)
            .await
            .into_iter()
            .filter(|a| a.status == codi_artifacts::ArtifactStatus::Active)
            .filter(|a| a.metadata.get("committed").and_then(|v| v.as_bool()).unwrap_or(false).eq(&false))
            .count();
        Ok(pending == 0)
    }
}

/// The latest plan has status `approved`, or no plan is pending review.
pub struct PlanApproved;

#[async_trait]
impl Attractor for PlanApproved {
    fn name(&self) -> &'static str {
        "plan_approved"
    }
    fn priority(&self) -> i32 {
        99
    }
    // Deliberately no fallback signal: approval requires a human in the
    // loop, so an unmet plan surfaces as `blocked` rather than driving a
    // signal emission the evaluator can resolve on its own.
    async fn check(&self, store: &ArtifactStore) -> CodiResult<bool> {
        Ok(queries::get_pending_plan(store).await.is_none())
    }
}

/// The latest build's `tests_passed` metadata is true.
pub struct TestsPassing;

#[async_trait]
impl Attractor for TestsPassing {
    fn name(&self) -> &'static str {
        "tests_passing"
    }
    fn priority(&self) -> i32 {
        80
    }
    fn dependencies(&self) -> &[&'static str] {
        &["project_builds"]
    }
    fn fallback_signal(&self) -> Option<Signal> {
        Some(Signal::TestsFailing)
    }
    async fn check(&self, store: &ArtifactStore) -> CodiResult<bool> {
        let Some(build) = store.get_latest(codi_artifacts::ArtifactType::Build, None).await else {
            return Ok(false);
        };
        Ok(build.metadata.get("tests_passed").and_then(|v| v.as_bool()).unwrap_or(false))
    }
}

/// Builds the default attractor set, in no particular order — the
/// evaluator sorts by priority before running a pass.
pub fn default_attractors() -> Vec<Box<dyn Attractor>> {
    vec![
        Box::new(HasScaffold),
        Box::new(ProjectBuilds),
        Box::new(PreviewAvailable),
        Box::new(NoErrors),
        Box::new(GitClean),
        Box::new(PlanApproved),
        Box::new(TestsPassing),
    ]
}
