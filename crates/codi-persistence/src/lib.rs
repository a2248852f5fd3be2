//! Concrete implementations of [`codi_core::ports::PersistencePort`].
//!
//! The port is optional by design — a process can run with none of these
//! wired in and still behave correctly, with no durability across
//! restarts. [`FilePersistence`] gives single-process durability without
//! requiring a relational store; [`InMemoryPersistence`] satisfies the
//! port for tests or early bring-up.

pub mod file;
pub mod memory;

pub use file::FilePersistence;
pub use memory::InMemoryPersistence;
