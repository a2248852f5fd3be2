//! The outer loop that drives one user turn: session bookkeeping, the
//! attractor convergence loop, and per-project turn serialization.
//!
//! [`WorkflowExecutor`] is the seam every inbound request (HTTP, WebSocket,
//! CLI) ultimately calls into. It owns no transport concerns itself — it is
//! handed an already-constructed [`codi_sessions::SessionManager`],
//! [`codi_artifacts::ArtifactStoreRegistry`], and
//! [`codi_signals::SignalEngine`], and optionally a
//! [`codi_core::ports::PersistencePort`].

pub mod executor;
pub mod intent;
pub mod model;

pub use executor::{TurnBudgets, WorkflowExecutor};
pub use intent::parse_explicit_intent;
pub use model::{TurnInput, TurnOutcome};
