//! Capability traits every worker role implements, plus the static registry
//! that routes signals and artifact-type queries to capable agents.
//!
//! Two orthogonal capabilities, implemented independently — a worker may
//! implement one, both, or neither:
//!
//! - [`producer::ArtifactProducer`] — writes artifacts to its project's store.
//! - [`subscriber::SignalSubscriber`] — reacts to signals the engine emits.
//!
//! [`registry::AgentRegistry`] holds capability *sets*, never a class
//! hierarchy or duck-typed mixin.

pub mod context;
pub mod delegation;
pub mod demo;
pub mod producer;
pub mod registry;
pub mod subscriber;

pub use context::WorkerContext;
pub use demo::{DemoArtifactWorker, DemoSignalWorker};
pub use producer::ArtifactProducer;
pub use registry::{AgentCapabilities, AgentRegistry};
pub use subscriber::{emit_signal, register_signal_handlers, unregister_signal_handlers, SignalSubscriber};
