//! Artifact types and the per-project artifact store.
//!
//! Artifacts are the shared state space agents read from and write to —
//! agents never call each other directly. This crate owns the artifact
//! shape, its content-hash rule, the store's CRUD/versioning contract, and
//! the read-only convenience queries layered on top of it.
//!
//! # Main types
//!
//! - [`Artifact`] / [`ArtifactType`] / [`ArtifactStatus`] — the data model.
//! - [`ArtifactStore`] — per-project cache + fs persistence.
//! - [`ArtifactStoreRegistry`] — explicit, non-singleton per-project store lookup.

pub mod factory;
pub mod model;
pub mod queries;
pub mod store;

pub use model::{Artifact, ArtifactContent, ArtifactStatus, ArtifactType, CONTENT_HASH_PREFIX_LEN};
pub use store::{ArtifactStore, ArtifactStoreRegistry};
