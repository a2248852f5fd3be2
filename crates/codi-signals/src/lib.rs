//! Signal types and the signal engine.
//!
//! Signals replace explicit task delegation: agents subscribe to the
//! signals they can handle, and the evaluator emits signals derived from
//! artifact state rather than calling agents directly.
//!
//! # Main types
//!
//! - [`Signal`] / [`SignalEvent`] / [`SignalPriority`] — the data model.
//! - [`SignalEngine`] — subscription, emission, and history.
//! - [`SignalHandler`] — the trait a subscriber implements.

pub mod engine;
pub mod types;

pub use engine::{SignalEngine, SignalHandler};
pub use types::{incompatible_counterparts, Signal, SignalEvent, SignalPriority};
