//! Core domain model for the Trove catalog
//!
//! This crate defines the entities the rest of the system operates on:
//! entries (tools and workflows), their versions, the files and container
//! images attached to each version, aliases, and content checksums. It has
//! no I/O; persistence and synchronization live in the `trove-store` and
//! `trove-service` crates.

pub mod checksum;
pub mod entry;
pub mod error;
pub mod image;
pub mod source_file;
pub mod types;
pub mod version;

pub use checksum::{sha256, Checksum, ChecksumType};
pub use entry::{Entry, EntryClass, EntryKind};
pub use error::{CatalogError, Result};
pub use image::{dedup_images, Image, ImageReference};
pub use source_file::{FileType, SourceFile};
pub use types::{DescriptorType, EntryId, EntryMode, ReferenceType};
pub use version::Version;
