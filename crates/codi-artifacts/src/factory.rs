//! Typed constructors for the conventional metadata shape of each artifact
//! type, so producers don't hand-assemble the metadata map themselves.

use crate::model::{Artifact, ArtifactContent, ArtifactType};
use std::collections::HashMap;

fn meta(pairs: impl IntoIterator<Item = (&'static str, serde_json::Value)>) -> HashMap<String, serde_json::Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Builds a file artifact with `file_path`/`operation` metadata.
pub fn file_artifact(
    producer: impl Into<String>,
    project_id: impl Into<String>,
    file_path: impl Into<String>,
    content: impl Into<String>,
    operation: impl Into<String>,
) -> Artifact {
    Artifact::new(
        ArtifactType::File,
        producer,
        project_id,
        ArtifactContent::Text(content.into()),
        meta([
            ("file_path", serde_json::json!(file_path.into())),
            ("operation", serde_json::json!(operation.into())),
        ]),
    )
}

/// Builds an error artifact with `error_type`/`stack_trace`/`recoverable` metadata.
pub fn error_artifact(
    producer: impl Into<String>,
    project_id: impl Into<String>,
    error_message: impl Into<String>,
    error_type: impl Into<String>,
    recoverable: bool,
    stack_trace: Option<String>,
) -> Artifact {
    Artifact::new(
        ArtifactType::Error,
        producer,
        project_id,
        ArtifactContent::Text(error_message.into()),
        meta([
            ("error_type", serde_json::json!(error_type.into())),
            ("recoverable", serde_json::json!(recoverable)),
            ("stack_trace", serde_json::json!(stack_trace)),
        ]),
    )
}

/// Builds a build-result artifact with `success`/`command`/`exit_code` metadata.
pub fn build_artifact(
    producer: impl Into<String>,
    project_id: impl Into<String>,
    success: bool,
    output: impl Into<String>,
    command: impl Into<String>,
    exit_code: i32,
) -> Artifact {
    Artifact::new(
        ArtifactType::Build,
        producer,
        project_id,
        ArtifactContent::Text(output.into()),
        meta([
            ("success", serde_json::json!(success)),
            ("command", serde_json::json!(command.into())),
            ("exit_code", serde_json::json!(exit_code)),
        ]),
    )
}

/// Builds a preview artifact whose content is the preview URL.
pub fn preview_artifact(
    producer: impl Into<String>,
    project_id: impl Into<String>,
    url: impl Into<String>,
    container_id: Option<String>,
) -> Artifact {
    Artifact::new(
        ArtifactType::Preview,
        producer,
        project_id,
        ArtifactContent::Text(url.into()),
        meta([("container_id", serde_json::json!(container_id))]),
    )
}

/// Builds an analysis artifact.
pub fn analysis_artifact(
    producer: impl Into<String>,
    project_id: impl Into<String>,
    analysis: impl Into<String>,
    analysis_type: impl Into<String>,
) -> Artifact {
    Artifact::new(
        ArtifactType::Analysis,
        producer,
        project_id,
        ArtifactContent::Text(analysis.into()),
        meta([("analysis_type", serde_json::json!(analysis_type.into()))]),
    )
}

/// Builds a plan artifact, defaulting to `pending_review` status.
pub fn plan_artifact(
    producer: impl Into<String>,
    project_id: impl Into<String>,
    plan_content: impl Into<String>,
    title: impl Into<String>,
    status: impl Into<String>,
) -> Artifact {
    Artifact::new(
        ArtifactType::Plan,
        producer,
        project_id,
        ArtifactContent::Text(plan_content.into()),
        meta([
            ("title", serde_json::json!(title.into())),
            ("status", serde_json::json!(status.into())),
        ]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_artifact_defaults_carry_through_metadata() {
        let artifact = plan_artifact("strategist", "proj-1", "do the thing", "Initial plan", "pending_review");
        assert_eq!(
            artifact.metadata.get("status").and_then(|v| v.as_str()),
            Some("pending_review")
        );
    }

    #[test]
    fn error_artifact_carries_recoverable_flag() {
        let artifact = error_artifact("scout", "proj-1", "boom", "runtime", false, None);
        assert_eq!(
            artifact.metadata.get("recoverable").and_then(|v| v.as_bool()),
            Some(false)
        );
    }
}
