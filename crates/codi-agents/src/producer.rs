//! The artifact-producer capability.

use async_trait::async_trait;
use codi_artifacts::{factory, Artifact, ArtifactContent, ArtifactStore, ArtifactType};
use codi_core::CodiResult;
use std::collections::HashMap;
use std::sync::Arc;

/// A worker that writes artifacts to its project's store.
///
/// All methods go through the store scoped to the worker's project —
/// implementors supply [`ArtifactProducer::store`] and get the rest for
/// free.
#[async_trait]
pub trait ArtifactProducer: Send + Sync {
    /// The name recorded as `producer` on every artifact this worker writes.
    fn name(&self) -> &str;

    /// The store this worker's artifacts are scoped to.
    fn store(&self) -> &Arc<ArtifactStore>;

    /// Writes an artifact of any type.
    async fn produce_artifact(
        &self,
        artifact_type: ArtifactType,
        content: ArtifactContent,
        metadata: HashMap<String, serde_json::Value>,
    ) -> CodiResult<Artifact> {
        let artifact = Artifact::new(artifact_type, self.name(), self.store().project_id(), content, metadata);
        let persisted = self.store().persist(artifact).await?;
        tracing::info!(artifact_id = %persisted.id, artifact_type = ?persisted.artifact_type, "produced artifact");
        Ok(persisted)
    }

    /// Writes a file artifact.
    async fn produce_file_artifact(&self, file_path: &str, content: &str, operation: &str) -> CodiResult<Artifact> {
        let artifact = factory::file_artifact(
            self.name().to_string(),
            self.store().project_id().to_string(),
            file_path.to_string(),
            content.to_string(),
            operation.to_string(),
        );
        self.store().persist(artifact).await
    }

    /// Writes an error artifact.
    async fn produce_error_artifact(
        &self,
        error_message: &str,
        error_type: &str,
        recoverable: bool,
        stack_trace: Option<String>,
    ) -> CodiResult<Artifact> {
        let artifact = factory::error_artifact(
            self.name().to_string(),
            self.store().project_id().to_string(),
            error_message.to_string(),
            error_type.to_string(),
            recoverable,
            stack_trace,
        );
        self.store().persist(artifact).await
    }

    /// Writes a build-result artifact.
    async fn produce_build_artifact(&self, success: bool, output: &str, command: &str, exit_code: i32) -> CodiResult<Artifact> {
        let artifact = factory::build_artifact(
            self.name().to_string(),
            self.store().project_id().to_string(),
            success,
            output.to_string(),
            command.to_string(),
            exit_code,
        );
        self.store().persist(artifact).await
    }

    /// Writes a preview artifact.
    async fn produce_preview_artifact(&self, url: &str, container_id: Option<String>) -> CodiResult<Artifact> {
        let artifact = factory::preview_artifact(
            self.name().to_string(),
            self.store().project_id().to_string(),
            url.to_string(),
            container_id,
        );
        self.store().persist(artifact).await
    }

    /// Writes an analysis artifact.
    async fn produce_analysis_artifact(&self, analysis: &str, analysis_type: &str) -> CodiResult<Artifact> {
        let artifact = factory::analysis_artifact(
            self.name().to_string(),
            self.store().project_id().to_string(),
            analysis.to_string(),
            analysis_type.to_string(),
        );
        self.store().persist(artifact).await
    }

    /// Writes a plan artifact.
    async fn produce_plan_artifact(&self, plan_content: &str, title: &str, status: &str) -> CodiResult<Artifact> {
        let artifact = factory::plan_artifact(
            self.name().to_string(),
            self.store().project_id().to_string(),
            plan_content.to_string(),
            title.to_string(),
            status.to_string(),
        );
        self.store().persist(artifact).await
    }

    /// Reads artifacts of a type (or every type), newest first, capped at `limit`.
    async fn read_artifacts(&self, artifact_type: Option<ArtifactType>, limit: usize) -> Vec<Artifact> {
        match artifact_type {
            Some(t) => self.store().get_by_type(t, None, limit).await,
            None => {
                let mut all = Vec::new();
                for t in [
                    ArtifactType::File,
                    ArtifactType::Diff,
                    ArtifactType::Build,
                    ArtifactType::Preview,
                    ArtifactType::Error,
                    ArtifactType::Log,
                    ArtifactType::Plan,
                    ArtifactType::Task,
                    ArtifactType::Analysis,
                    ArtifactType::Intent,
                ] {
                    all.extend(self.store().get_by_type(t, None, limit).await);
                }
                all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                all.truncate(limit);
                all
            }
        }
    }

    /// The most recent build artifact, if any.
    async fn get_latest_build(&self) -> Option<Artifact> {
        self.store().get_latest(ArtifactType::Build, None).await
    }

    /// The URL of the most recent preview artifact, if any.
    async fn get_preview_url(&self) -> Option<String> {
        codi_artifacts::queries::get_preview_url(self.store()).await
    }
}
