//! Entry store for the Trove catalog
//!
//! This crate provides persistence for entries, versions, source files,
//! images, and aliases behind the [`EntryRepository`] trait, together with
//! an in-memory implementation. The trait is the seam a relational backend
//! plugs into; the invariants it documents (path uniqueness, alias
//! disjointness, per-entry write serialization) bind every implementation.

pub mod error;
pub mod memory;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryEntryStore;
pub use repository::{EntryQuery, EntryRepository};
