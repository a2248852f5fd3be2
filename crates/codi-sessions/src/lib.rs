//! Session lifecycle, lineage, and persistence.
//!
//! [`manager::SessionManager`] holds conversational state in memory with
//! TTL-based pruning and a message-cap eviction policy. [`store::SessionStore`]
//! and [`transcript::TranscriptStore`] are separate, optional file-backed
//! persistence concerns: whole-session snapshots and an append-only audit
//! trail of individual events, respectively. Neither is required for the
//! manager to function.

pub mod manager;
pub mod model;
pub mod store;
pub mod transcript;

pub use manager::{SessionManager, SessionManagerConfig, DEFAULT_MAX_MESSAGES, DEFAULT_TTL};
pub use model::{CreateSessionInput, Session, SessionFilter, SessionStatus};
pub use store::{FileSessionStore, SessionStore};
pub use transcript::{FileTranscriptStore, TranscriptEntry, TranscriptEvent, TranscriptStore};
