use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codi_core::CodiResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TranscriptEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TranscriptEvent {
    UserMessage {
        content: String,
    },
    AssistantMessage {
        content: String,
    },
    ToolCallRequest {
        call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },
    ToolCallResult {
        call_id: String,
        tool_name: String,
        content: String,
        is_error: bool,
    },
    SystemEvent {
        event_type: String,
        details: serde_json::Value,
    },
}

// ---------------------------------------------------------------------------
// TranscriptEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub turn: u32,
    pub event: TranscriptEvent,
}

// ---------------------------------------------------------------------------
// TranscriptStore trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(&self, entry: TranscriptEntry) -> CodiResult<()>;
    async fn read(&self, session_id: Uuid) -> CodiResult<Vec<TranscriptEntry>>;
}

// ---------------------------------------------------------------------------
// FileTranscriptStore
// ---------------------------------------------------------------------------

pub struct FileTranscriptStore {
    dir: PathBuf,
}

impl FileTranscriptStore {
    pub async fn new(dir: PathBuf) -> CodiResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn transcript_path(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.transcript.jsonl", session_id))
    }
}

#[async_trait]
impl TranscriptStore for FileTranscriptStore {
    async fn append(&self, entry: TranscriptEntry) -> CodiResult<()> {
        let path = self.transcript_path(entry.session_id);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read(&self, session_id: Uuid) -> CodiResult<Vec<TranscriptEntry>> {
        let path = self.transcript_path(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(&path).await?;
        let mut entries: Vec<TranscriptEntry> = data
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by(|a, b| a.turn.cmp(&b.turn).then_with(|| a.timestamp.cmp(&b.timestamp)));
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
