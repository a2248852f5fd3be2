use thiserror::Error;

/// A convenience `Result` alias using [`CodiError`].
pub type CodiResult<T> = Result<T, CodiError>;

/// Top-level error type shared across the workflow subsystems.
///
/// Each variant corresponds to a subsystem or a specific rejection the
/// design calls out explicitly (concurrency-key conflicts, turn overlap,
/// unknown lookups) rather than collapsing everything into a string.
#[derive(Error, Debug)]
pub enum CodiError {
    /// An error raised while persisting or loading an artifact.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// An error raised by the signal engine (unknown signal, bad subscription).
    #[error("signal error: {0}")]
    Signal(String),

    /// A lookup against a session that does not exist.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A generic session-layer error (persistence, eviction).
    #[error("session error: {0}")]
    Session(String),

    /// A background task was launched with a concurrency key already in use.
    #[error("concurrency key busy: {0}")]
    ConcurrencyKeyBusy(String),

    /// A lookup against a background task that does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// A turn was submitted for a project that already has one in flight.
    #[error("turn already in progress for project {0}")]
    TurnInProgress(String),

    /// A signal subscription referenced an agent name with no registered subscriber.
    #[error("unknown signal subscriber: {0}")]
    UnknownSignalSubscriber(String),

    /// An error from the attractor evaluator.
    #[error("evaluator error: {0}")]
    Evaluator(String),

    /// An error from the optional persistence port.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// An error from the broadcast bridge (Redis pub/sub or connection registry).
    #[error("broadcast error: {0}")]
    Broadcast(String),

    /// An error from the WebSocket gateway layer.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// An error in configuration parsing or validation.
    #[error("config error: {0}")]
    Config(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from an outbound HTTP request (e.g. tool port call).
    #[error("HTTP error: {0}")]
    Http(String),
}
