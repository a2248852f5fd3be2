//! The artifact: the primitive unit of shared state agents read and write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

/// What kind of thing an artifact records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// A created or modified file.
    File,
    /// A code diff or patch.
    Diff,
    /// A build result (success or failure).
    Build,
    /// A preview URL.
    Preview,
    /// An error condition.
    Error,
    /// A log entry.
    Log,
    /// An implementation plan awaiting review.
    Plan,
    /// A completed unit of work.
    Task,
    /// A code analysis result.
    Analysis,
    /// A parsed user intent.
    Intent,
}

/// Lifecycle state of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    /// Not yet processed.
    Pending,
    /// Current, valid artifact.
    Active,
    /// Replaced by a newer artifact.
    Superseded,
    /// Failed validation.
    Invalid,
}

/// Payload carried by an artifact.
///
/// Strings and raw bytes hash their bytes directly; structured content
/// hashes a sorted-key JSON encoding so the hash is stable regardless of
/// field insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactContent {
    /// Text payload (file contents, plan text, error message, URL, ...).
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Structured JSON payload.
    Structured(serde_json::Value),
}

impl ArtifactContent {
    fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            ArtifactContent::Text(s) => s.as_bytes().to_vec(),
            ArtifactContent::Bytes(b) => b.clone(),
            ArtifactContent::Structured(v) => {
                let sorted = sort_json_keys(v);
                serde_json::to_vec(&sorted).unwrap_or_default()
            }
        }
    }
}

fn sort_json_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), sort_json_keys(&map[key]));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sort_json_keys).collect())
        }
        other => other.clone(),
    }
}

/// Length of the retained hex prefix of a content hash.
pub const CONTENT_HASH_PREFIX_LEN: usize = 16;

fn compute_content_hash(content: &ArtifactContent) -> String {
    let bytes = content.canonical_bytes();
    let digest = Sha256::digest(&bytes);
    let hex = format!("{digest:x}");
    hex[..CONTENT_HASH_PREFIX_LEN.min(hex.len())].to_string()
}

/// The core artifact abstraction.
///
/// Artifacts are immutable records of agent outputs. Agents never talk to
/// each other directly — they write artifacts, and other agents (or the
/// evaluator) read them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique identifier.
    pub id: Uuid,
    /// The kind of artifact.
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    /// Name of the agent that produced this artifact.
    pub producer: String,
    /// The project this artifact is scoped to.
    pub project_id: String,
    /// The artifact's payload.
    pub content: ArtifactContent,
    /// Short hash of the canonicalized content, for dedup/equivalence checks.
    pub content_hash: String,
    /// Free-form metadata; conventional keys vary per artifact type.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Lifecycle status.
    pub status: ArtifactStatus,
    /// The artifact this one replaced, if any.
    pub parent_id: Option<Uuid>,
    /// Ancestors and siblings, most recent first.
    #[serde(default)]
    pub related_ids: Vec<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Builds a new active artifact, computing its content hash.
    pub fn new(
        artifact_type: ArtifactType,
        producer: impl Into<String>,
        project_id: impl Into<String>,
        content: ArtifactContent,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Self {
        let content_hash = compute_content_hash(&content);
        Self {
            id: Uuid::new_v4(),
            artifact_type,
            producer: producer.into(),
            project_id: project_id.into(),
            content,
            content_hash,
            metadata,
            status: ArtifactStatus::Active,
            parent_id: None,
            related_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Builds a replacement artifact for this one. Does not mutate `self`'s
    /// status — callers persist the old artifact as superseded separately.
    pub fn supersede(
        &self,
        new_content: ArtifactContent,
        extra_metadata: HashMap<String, serde_json::Value>,
    ) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.extend(extra_metadata);

        let mut related_ids = vec![self.id];
        related_ids.extend(self.related_ids.clone());

        let content_hash = compute_content_hash(&new_content);
        Self {
            id: Uuid::new_v4(),
            artifact_type: self.artifact_type,
            producer: self.producer.clone(),
            project_id: self.project_id.clone(),
            content: new_content,
            content_hash,
            metadata,
            status: ArtifactStatus::Active,
            parent_id: Some(self.id),
            related_ids,
            created_at: Utc::now(),
        }
    }
}
